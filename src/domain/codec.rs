use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::{
    entity::{Envelope, JobOutcome},
    error::CodecError,
};

/// Media type attached to every result image.
pub const RESULT_MEDIA_TYPE: &str = "image/png";

pub fn encode_envelope(envelope: &Envelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(envelope)
}

pub fn decode_envelope(raw: &str) -> Result<Envelope, CodecError> {
    Ok(serde_json::from_str(raw)?)
}

pub fn encode_outcome(outcome: &JobOutcome) -> Result<String, serde_json::Error> {
    serde_json::to_string(outcome)
}

pub fn decode_outcome(raw: &str) -> Result<JobOutcome, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Recovers raw bytes from `data:<media type>;base64,<payload>`.
///
/// Only the part after the first comma is decoded; the media-type marker is
/// not checked.
pub fn decode_image(text: &str) -> Result<Vec<u8>, CodecError> {
    let (_, payload) = text.split_once(',').ok_or(CodecError::MissingSeparator)?;

    Ok(STANDARD.decode(payload.trim())?)
}

pub fn encode_image(bytes: &[u8], media_type: &str) -> String {
    format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
}
