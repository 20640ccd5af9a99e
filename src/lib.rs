//! fhevm-sdk: Client orchestration layer for an FHE-enabled smart-contract
//! platform
//!
//! Re-exports the member crates. See `fhevm-client` for the client façade
//! and orchestrators, `fhevm-core` for the shared data model.

pub use fhevm_client::{
    ClientBuilder, ClientConfig, ClientState, ContractRuntime, DecryptionAuthorization,
    DecryptionOracle, Decryptor, EncryptedOutput, EncryptionProvider, Encryptor, FhevmClient,
    Network, WalletSigner,
};
pub use fhevm_core::{
    registry, ClearValue, EncryptedValue, Error, FheType, Origin, Result, TypedValue,
};
