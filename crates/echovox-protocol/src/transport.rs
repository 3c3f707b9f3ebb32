//! Transport seam: the network session to the remote model lives behind this
//! trait. EchoVox never parses connection framing itself.

use crate::messages::{MediaBlob, ServerMessage};
use async_trait::async_trait;
use echovox_foundation::SessionError;

#[async_trait]
pub trait SessionTransport: Send {
    /// Send one outbound media payload to the remote model.
    async fn send_media(&mut self, blob: MediaBlob) -> Result<(), SessionError>;

    /// Receive the next message from the remote model.
    ///
    /// Returns `None` when the remote has closed the session.
    async fn recv(&mut self) -> Option<ServerMessage>;
}
