//! Tracking token issuance.
//!
//! Tokens are 128 bits drawn from the operating system CSPRNG and rendered
//! as hyphenated UUIDs (with the v4 version bits set). Anyone holding a
//! token may subscribe to its result, so tokens must not be guessable.

use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::error::CoreError;
use crate::types::TrackingToken;

/// Issues fresh [`TrackingToken`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenIssuer;

impl TokenIssuer {
    pub fn new() -> Self {
        Self
    }

    /// Generate a new token.
    ///
    /// Fails only if the OS entropy source is unavailable. Callers must
    /// refuse the submission in that case rather than fall back to a weaker
    /// source.
    pub fn issue(&self) -> Result<TrackingToken, CoreError> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CoreError::EntropyUnavailable(e.to_string()))?;

        let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
        Ok(TrackingToken::new(uuid.hyphenated().to_string()))
    }
}
