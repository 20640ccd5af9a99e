//! Error types for fhevm-core

use std::time::Duration;

use thiserror::Error;

use crate::types::FheType;

/// Which external collaborator a pass-through error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Rpc,
    Signer,
    Oracle,
    Encryption,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Rpc => write!(f, "rpc provider"),
            Origin::Signer => write!(f, "signer"),
            Origin::Oracle => write!(f, "decryption oracle"),
            Origin::Encryption => write!(f, "encryption capability"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing configuration. Fatal to the client instance.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Operation attempted before `init()` reached the ready state.
    #[error("client not initialized")]
    NotInitialized,

    /// Ciphertext type tag outside the supported closed set.
    #[error("unsupported ciphertext type tag {0:#04x}")]
    UnsupportedType(u8),

    /// Caller-supplied value does not fit the declared type.
    #[error("value {value} does not fit type {ty}")]
    ValueOutOfRange { value: String, ty: FheType },

    /// The user declined the authorization signature request. Expected
    /// outcome, distinguishable from capability-side failures.
    #[error("signature request rejected by signer")]
    SignatureRejected,

    /// The decryption authorization's validity window lapsed before the
    /// request could be submitted. Recoverable by re-authorizing.
    #[error("decryption authorization expired at {expiry} (now {now})")]
    AuthorizationExpired { expiry: u64, now: u64 },

    /// Capability-side rejection: unknown handle, access denied, or an
    /// uninterpretable plaintext.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Caller-applied wait on an oracle decryption elapsed. The underlying
    /// request may still complete later; no automatic retry.
    #[error("oracle decryption wait elapsed after {waited:?}")]
    OracleTimeout { waited: Duration },

    /// The local wait was abandoned via a cancellation signal. The
    /// underlying external operation is not aborted.
    #[error("wait cancelled")]
    Cancelled,

    /// Transport or provider error passed through unwrapped, tagged with
    /// its origin.
    #[error("{origin} error: {source}")]
    Transport {
        origin: Origin,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Wrap an external collaborator error without reinterpreting it.
    pub fn transport(
        origin: Origin,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Transport {
            origin,
            source: Box::new(source),
        }
    }
}
