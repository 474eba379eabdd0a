//! Revisions and their opaque token form.
//!
//! A [`Revision`] identifies a point in the mutation history of the tuple
//! store. Clients never see the raw value; they exchange opaque tokens
//! ("zookies") produced by a [`RevisionCodec`].
//!
//! # Token Format
//!
//! [`ZookieCodec`] emits version 1 tokens: the JSON document
//! `{"v":1,"revision":N}` encoded with URL-safe base64 without padding.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A totally ordered checkpoint in the tuple mutation history.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(u64);

impl Revision {
    /// The beginning of history.
    pub const ZERO: Revision = Revision(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the revision immediately after this one, or `None` at `u64::MAX`.
    pub fn checked_next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl From<u64> for Revision {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Converts revisions to and from opaque client tokens.
pub trait RevisionCodec: Send + Sync + 'static {
    /// Decodes a client-supplied token.
    fn decode(&self, token: &str) -> DomainResult<Revision>;

    /// Encodes a revision into a token clients can hand back later.
    fn encode(&self, revision: Revision) -> String;
}

const ZOOKIE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct ZookiePayload {
    v: u32,
    revision: u64,
}

/// The default token codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZookieCodec;

impl RevisionCodec for ZookieCodec {
    fn decode(&self, token: &str) -> DomainResult<Revision> {
        let bytes =
            URL_SAFE_NO_PAD
                .decode(token)
                .map_err(|e| DomainError::InvalidRevisionToken {
                    reason: format!("malformed encoding: {e}"),
                })?;

        let payload: ZookiePayload =
            serde_json::from_slice(&bytes).map_err(|e| DomainError::InvalidRevisionToken {
                reason: format!("malformed payload: {e}"),
            })?;

        if payload.v != ZOOKIE_VERSION {
            return Err(DomainError::InvalidRevisionToken {
                reason: format!("unsupported token version {}", payload.v),
            });
        }

        Ok(Revision(payload.revision))
    }

    fn encode(&self, revision: Revision) -> String {
        let payload = ZookiePayload {
            v: ZOOKIE_VERSION,
            revision: revision.0,
        };
        // Serializing two integers cannot fail.
        let json = serde_json::to_vec(&payload).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }
}
