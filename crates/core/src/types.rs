use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Opaque id of a live client connection, unique for the connection's lifetime.
pub type ConnectionId = String;

/// Opaque correlator between a submitted job and the connections entitled to
/// its result.
///
/// Tokens are only ever minted by [`TokenIssuer`](crate::token::TokenIssuer)
/// on the server; values arriving from clients are wrapped with
/// [`TrackingToken::from_client`] and are trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingToken(String);

impl TrackingToken {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    /// Wrap a token value received from a client (bind requests).
    pub fn from_client(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TrackingToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
