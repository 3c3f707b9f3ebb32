//! Wire-shaped types exchanged with the remote conversational model.
//!
//! The transport layer owns connection framing; these types are what it
//! yields after parsing. Field names follow the remote API's camelCase JSON.

use serde::{Deserialize, Serialize};

/// One outbound media payload: base64-encoded PCM bytes plus their mime type.
///
/// Consumed exactly once by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    pub data: String,
    pub mime_type: String,
}

/// Token modality reported by the remote model's usage accounting.
///
/// Unrecognized modalities deserialize to `Unspecified` so newer server
/// builds don't break older clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    Text,
    Audio,
    #[serde(other)]
    Unspecified,
}

/// Per-modality token count attached to one side of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDetail {
    pub modality: Modality,
    pub token_count: u32,
}

/// Prompt-side and response-side token detail for one server message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_tokens_details: Vec<TokenDetail>,
    #[serde(default)]
    pub response_tokens_details: Vec<TokenDetail>,
}

impl UsageMetadata {
    pub fn total_prompt_tokens(&self) -> u64 {
        self.prompt_tokens_details
            .iter()
            .map(|d| d.token_count as u64)
            .sum()
    }

    pub fn total_response_tokens(&self) -> u64 {
        self.response_tokens_details
            .iter()
            .map(|d| d.token_count as u64)
            .sum()
    }
}

/// One inbound message from the remote model.
///
/// A message may carry any combination of inline audio, transcription text,
/// usage metadata, and control flags; all fields are optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMessage {
    /// Inline audio payloads, in the order they should be heard.
    pub audio: Vec<MediaBlob>,
    /// Transcription of the synthesized speech, when the server provides one.
    pub transcription: Option<String>,
    pub usage: Option<UsageMetadata>,
    /// Barge-in: the remote detected new user speech and cut this turn off.
    pub interrupted: bool,
    pub turn_complete: bool,
}

impl ServerMessage {
    pub fn has_audio(&self) -> bool {
        !self.audio.is_empty()
    }
}
