pub mod messages;
pub mod transport;

pub use messages::{MediaBlob, Modality, ServerMessage, TokenDetail, UsageMetadata};
pub use transport::SessionTransport;
