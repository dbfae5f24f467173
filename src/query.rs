//! Query round trips over the [QuerySocket].
//!
//! Servers that guard against spoofed source addresses answer the first
//! request with a challenge number instead of data. The request is then
//! repeated once with that number. A server that challenges the repeated
//! request too is not supported: its second answer is handed to the decoder
//! as is, which rejects it.

use std::time::{Duration, Instant};

use log::debug;

use crate::{
    a2s::{
        is_challenge_response, ChallengeResponse, InfoRequest, InfoResponse,
        PlayersInfoResponse, PlayersRequest,
    },
    error::Result,
    transport::QuerySocket,
};

/// Time from sending an info request until any datagram comes back. The
/// reply is not looked at.
pub async fn ping(socket: &QuerySocket) -> Result<Duration> {
    let request = InfoRequest::default().pack();
    let start = Instant::now();
    socket
        .send(&request)
        .await
        .inspect_err(|e| debug!("sending ping request: {}", e))?;
    socket
        .receive()
        .await
        .inspect_err(|e| debug!("could not receive ping response: {}", e))?;
    Ok(start.elapsed())
}

pub async fn info(socket: &QuerySocket) -> Result<InfoResponse> {
    let data = exchange(socket, "info", |challenge| InfoRequest { challenge }.pack()).await?;
    Ok(InfoResponse::unpack(&data)?)
}

pub async fn players(socket: &QuerySocket) -> Result<PlayersInfoResponse> {
    let data = exchange(socket, "players", |challenge| {
        PlayersRequest { challenge }.pack()
    })
    .await?;
    Ok(PlayersInfoResponse::unpack(&data)?)
}

/// Sends the request built by `request`, answering at most one challenge.
/// `what` names the request in failure logs.
async fn exchange<F>(socket: &QuerySocket, what: &str, request: F) -> Result<Vec<u8>>
where
    F: Fn(Option<i32>) -> Vec<u8>,
{
    socket
        .send(&request(None))
        .await
        .inspect_err(|e| debug!("sending {} request: {}", what, e))?;
    let data = socket
        .receive()
        .await
        .inspect_err(|e| debug!("could not receive {} response: {}", what, e))?;
    if !is_challenge_response(&data) {
        return Ok(data);
    }

    let ChallengeResponse { challenge } = ChallengeResponse::unpack(&data)?;
    debug!("server sent challenge {:#010x}, asking again", challenge);
    socket
        .send(&request(Some(challenge)))
        .await
        .inspect_err(|e| debug!("sending challenged {} request: {}", what, e))?;
    socket
        .receive()
        .await
        .inspect_err(|e| debug!("could not receive challenged {} response: {}", what, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        a2s::fixtures,
        error::{Error, ParseError},
        testlog,
        transport::{mock::ScriptedDatagram, DEFAULT_IO_TIMEOUT},
    };

    fn socket(replies: Vec<Vec<u8>>) -> (QuerySocket, ScriptedDatagram) {
        let peer = ScriptedDatagram::new(replies);
        let socket = QuerySocket::new(Box::new(peer.clone()), Duration::from_millis(100));
        (socket, peer)
    }

    #[tokio::test]
    async fn info_without_challenge_takes_one_round_trip() {
        let (socket, peer) = socket(vec![fixtures::info("direct", "cp_badlands", 3)]);

        let info = info(&socket).await.unwrap();

        assert_eq!(info.name, "direct");
        assert_eq!(peer.sent(), vec![InfoRequest::default().pack()]);
    }

    #[tokio::test]
    async fn info_answers_one_challenge() {
        let (socket, peer) = socket(vec![
            fixtures::challenge(0x5EED),
            fixtures::info("guarded", "ctf_2fort", 12),
        ]);

        let info = info(&socket).await.unwrap();

        assert_eq!(info.players, 12);
        let sent = peer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[1],
            InfoRequest {
                challenge: Some(0x5EED)
            }
            .pack()
        );
    }

    #[tokio::test]
    async fn players_answers_one_challenge() {
        let (socket, peer) = socket(vec![
            fixtures::challenge(-77),
            fixtures::players(&[("alice", 3, 12.0)]),
        ]);

        let players = players(&socket).await.unwrap();

        assert_eq!(players.players[0].name, "alice");
        assert_eq!(
            peer.sent(),
            vec![
                PlayersRequest::default().pack(),
                PlayersRequest {
                    challenge: Some(-77)
                }
                .pack()
            ]
        );
    }

    #[tokio::test]
    async fn second_challenge_is_not_answered() {
        let (socket, peer) = socket(vec![fixtures::challenge(1), fixtures::challenge(2)]);

        let err = players(&socket).await.unwrap_err();

        assert!(matches!(err, Error::Parse(ParseError::BadData)));
        assert_eq!(peer.sent().len(), 2);
    }

    #[tokio::test]
    async fn garbage_reply_is_a_decode_error() {
        let (socket, _) = socket(vec![b"\xFF\xFF\xFF\xFFnope".to_vec()]);

        let err = info(&socket).await.unwrap_err();
        assert!(err.is_protocol());
    }

    #[tokio::test]
    async fn ping_accepts_any_reply() {
        let (socket, peer) = socket(vec![b"anything".to_vec()]);

        let rtt = ping(&socket).await.unwrap();

        assert!(rtt < DEFAULT_IO_TIMEOUT);
        assert_eq!(peer.sent().len(), 1);
    }

    #[tokio::test]
    async fn ping_times_out_on_silent_server() {
        let (socket, _) = socket(vec![]);

        assert!(ping(&socket).await.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn receive_failures_name_the_request() {
        testlog::install();

        let (silent, _) = socket(vec![]);
        assert!(players(&silent).await.unwrap_err().is_timeout());
        assert!(testlog::logged("could not receive players response"));

        let (challenging, _) = socket(vec![fixtures::challenge(0x77)]);
        assert!(info(&challenging).await.unwrap_err().is_timeout());
        assert!(testlog::logged("could not receive challenged info response"));
    }
}
