//! fhevm-core: Foundational types for the FHE contract-platform client
//!
//! This crate defines the data model shared by every orchestration
//! component:
//! - The closed set of encryptable logical types ([`FheType`]) and their
//!   serialization rules ([`registry`])
//! - Clear and encrypted value shapes ([`ClearValue`], [`TypedValue`],
//!   [`EncryptedValue`])
//! - The error taxonomy every operation settles with ([`Error`])
//!
//! The cryptography itself lives behind trait boundaries in the client
//! crate; nothing here performs I/O.

mod error;
pub mod registry;
mod types;

pub use error::{Error, Origin};
pub use registry::TypeInfo;
pub use types::{ClearValue, EncryptedValue, FheType, TypedValue};

pub type Result<T> = std::result::Result<T, Error>;
