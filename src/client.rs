use log::{debug, trace, warn};

use crate::{
    error::{Error, Result},
    packet::{Packet, PacketType},
    transport::RconSocket,
};

/// Body of the packet srcds sends right after mirroring an empty response
/// value. Seeing it means the command's output is complete.
const TRAILER: [u8; 4] = [0x00, 0x01, 0x00, 0x00];

/// Hands out [Packet] ids for one connection.
#[derive(Debug, Clone)]
pub struct RequestIds {
    next: i32,
}

impl RequestIds {
    pub fn starting_at(first: i32) -> Self {
        RequestIds { next: first }
    }

    /// Never returns -1, which the server uses to signal a failed login.
    pub fn next_id(&mut self) -> i32 {
        if self.next == -1 {
            self.next = 0;
        }
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }
}

enum Phase {
    AwaitingMirror,
    AwaitingTrailer,
}

/// An authenticated rcon session. The only way to get one is
/// [RconClient::authenticate], so holding a value means the login went
/// through.
pub struct RconClient {
    socket: RconSocket,
}

impl RconClient {
    /// Logs in with `password`. On any failure the socket is shut down
    /// before the error is returned.
    pub async fn authenticate(
        mut socket: RconSocket,
        password: &str,
        ids: &mut RequestIds,
    ) -> Result<Self> {
        match Self::auth(&mut socket, password, ids).await {
            Ok(()) => {
                trace!("auth complete");
                Ok(RconClient { socket })
            }
            Err(e) => {
                socket.close().await;
                Err(e)
            }
        }
    }

    async fn auth(socket: &mut RconSocket, password: &str, ids: &mut RequestIds) -> Result<()> {
        let auth_packet = Packet::new(ids.next_id(), PacketType::Auth, password);

        trace!("sending auth packet {} to server", auth_packet.id());
        socket
            .send(&auth_packet.pack())
            .await
            .inspect_err(|e| debug!("sending rcon auth request: {}", e))?;

        // srcds first answers with an empty response value...
        let ack = Self::receive(socket).await?;
        if ack.packet_type() != PacketType::Response {
            return Err(Error::InvalidResponseType(ack.packet_type().value()));
        }
        if ack.id() != auth_packet.id() {
            return Err(Error::InvalidResponseId {
                expected: auth_packet.id(),
                actual: ack.id(),
            });
        }

        // ...then with the verdict, carrying id -1 if the password was wrong.
        let verdict = Self::receive(socket).await?;
        if verdict.packet_type() != PacketType::AuthResponse || verdict.id() != auth_packet.id() {
            warn!("rcon authentication rejected (response id {})", verdict.id());
            return Err(Error::AuthenticationError);
        }
        Ok(())
    }

    /// Run a rcon command. In case of a response being split between
    /// multiple packets, they will be joined together in the order received.
    pub async fn command(&mut self, command: &str, ids: &mut RequestIds) -> Result<String> {
        let command_packet = Packet::new(ids.next_id(), PacketType::Exec, command);
        // srcds can split up the response but won't tell us how many packets
        // to expect, so we send an empty response value right after. The
        // server mirrors it once all output for the command has been sent,
        // then follows up with a fixed trailer packet.
        let mirror_packet = Packet::new(ids.next_id(), PacketType::Response, "");

        trace!("sending command packet {} to server", command_packet.id());
        self.socket
            .send(&command_packet.pack())
            .await
            .inspect_err(|e| debug!("sending rcon command request: {}", e))?;
        trace!("sending mirror packet {} to server", mirror_packet.id());
        self.socket
            .send(&mirror_packet.pack())
            .await
            .inspect_err(|e| debug!("sending rcon mirror request: {}", e))?;

        let mut output = Vec::new();
        let mut phase = Phase::AwaitingMirror;

        loop {
            let response = Self::receive(&mut self.socket)
                .await
                .inspect_err(|e| debug!("could not receive rcon command response: {}", e))?;
            if response.packet_type() != PacketType::Response {
                return Err(Error::InvalidResponseType(response.packet_type().value()));
            }

            match phase {
                Phase::AwaitingMirror if response.id() == mirror_packet.id() => {
                    trace!("mirror packet seen, waiting for trailer");
                    phase = Phase::AwaitingTrailer;
                }
                Phase::AwaitingMirror => {
                    if response.id() != command_packet.id() {
                        return Err(Error::InvalidResponseId {
                            expected: command_packet.id(),
                            actual: response.id(),
                        });
                    }
                    output.extend_from_slice(response.body());
                }
                Phase::AwaitingTrailer => {
                    if response.body() != TRAILER {
                        return Err(Error::InvalidResponseTrailer);
                    }
                    trace!("trailer seen, completing response");
                    break;
                }
            }
        }

        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    async fn receive(socket: &mut RconSocket) -> Result<Packet> {
        let data = socket.receive().await?;
        let packet = Packet::unpack(&data)?;
        trace!(
            "receive {:?} packet id {}",
            packet.packet_type(),
            packet.id()
        );
        Ok(packet)
    }

    pub async fn close(self) {
        self.socket.close().await;
    }
}
