use std::{error::Error, process::ExitCode, time::Duration};

use clap::{Parser, Subcommand};
use sourcon::{ConnectOptions, Server};

/// Query a Source engine game server or run rcon commands on it.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address, e.g. 127.0.0.1:27015
    addr: String,
    /// Rcon password; required for `exec`
    #[clap(short, long, env = "RCON_PASSWORD", default_value = "")]
    password: String,
    /// Deadline for each read or write, in milliseconds
    #[clap(short, long, default_value = "400")]
    timeout_ms: u64,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measure the round-trip time
    Ping,
    /// Show server information
    Info,
    /// List connected players
    Players,
    /// Run a rcon command
    Exec {
        #[clap(required = true)]
        command: Vec<String>,
    },
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let options = ConnectOptions::default()
        .with_rcon_password(args.password)
        .with_io_timeout(Duration::from_millis(args.timeout_ms));
    let server = Server::connect(&args.addr, options).await?;

    let result = match args.command {
        Command::Ping => server.ping().await.map(|rtt| println!("{:?}", rtt)),
        Command::Info => server.info().await.map(|info| println!("{:#?}", info)),
        Command::Players => server.players_info().await.map(|res| {
            for player in res.players {
                println!(
                    "{:>4} {:<32} {:>6} {:>8.0}s",
                    player.index, player.name, player.score, player.duration
                );
            }
        }),
        Command::Exec { command } => server
            .send(&command.join(" "))
            .await
            .map(|out| print!("{}", out)),
    };

    server.close().await;
    Ok(result?)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
