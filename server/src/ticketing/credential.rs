//! Credential codes, the scannable payload that carries them, and the QR
//! symbol the payload is printed as.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Edge length of the rendered symbol, in pixels.
pub const SYMBOL_SIZE: u32 = 200;

const MAX_CODE_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is not well-formed: {0}")]
    Malformed(String),

    #[error("payload cannot be encoded as a symbol: {0}")]
    Symbol(String),
}

/// The identifiers a scanned ticket claims to belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialClaim {
    #[serde(rename = "ticket_code")]
    pub credential_code: String,
    pub user_id: Uuid,
    pub event_id: Uuid,
}

/// Generates a fresh credential code from the OS random source.
pub fn generate_code() -> String {
    Uuid::new_v4().to_string()
}

/// Whether `code` has the shape of an issued credential code. Used to keep
/// untrusted input away from storage keys.
pub fn is_well_formed_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_CODE_LEN
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

pub fn encode(credential_code: &str, user_id: Uuid, event_id: Uuid) -> String {
    serde_json::json!({
        "ticket_code": credential_code,
        "user_id": user_id,
        "event_id": event_id,
    })
    .to_string()
}

pub fn decode(payload: &str) -> Result<CredentialClaim, CodecError> {
    let claim: CredentialClaim =
        serde_json::from_str(payload.trim()).map_err(|err| CodecError::Malformed(err.to_string()))?;
    if !is_well_formed_code(&claim.credential_code) {
        return Err(CodecError::Malformed("ticket_code has an invalid format".to_string()));
    }
    Ok(claim)
}

/// Renders the payload as a QR symbol of `SYMBOL_SIZE` square, quiet zone
/// included.
pub fn render_symbol(payload: &str) -> Result<GrayImage, CodecError> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|err| CodecError::Symbol(err.to_string()))?;
    let symbol = code
        .render::<Luma<u8>>()
        .quiet_zone(true)
        .min_dimensions(SYMBOL_SIZE, SYMBOL_SIZE)
        .build();
    Ok(imageops::resize(&symbol, SYMBOL_SIZE, SYMBOL_SIZE, FilterType::Nearest))
}
