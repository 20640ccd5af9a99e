//! Client configuration

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use fhevm_core::{Error, Result};

/// Target network for the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "network", rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Sepolia,
    Custom { rpc_url: String, chain_id: u64 },
}

impl Network {
    /// Chain id used as the EIP-712 domain separator component.
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Sepolia => 11_155_111,
            Network::Custom { chain_id, .. } => *chain_id,
        }
    }

    /// Caller-supplied RPC endpoint, present only for custom networks.
    pub fn rpc_url(&self) -> Option<&str> {
        match self {
            Network::Custom { rpc_url, .. } => Some(rpc_url),
            _ => None,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Sepolia => write!(f, "sepolia"),
            Network::Custom { rpc_url, chain_id } => {
                write!(f, "custom(chain_id={chain_id}, rpc={rpc_url})")
            }
        }
    }
}

/// Immutable client configuration. Provider, signer, and oracle handles
/// are injected through [`crate::ClientBuilder`], keeping this pure data;
/// re-configuration means constructing a new client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Target network.
    pub network: Network,
    /// Address of the FHE-enabled contract this client talks to.
    pub contract_address: Address,
}

impl ClientConfig {
    pub fn new(network: Network, contract_address: Address) -> Self {
        Self {
            network,
            contract_address,
        }
    }

    /// Validate the configuration. Called by `init()`; a failure here is
    /// fatal to the client instance.
    pub fn validate(&self) -> Result<()> {
        if self.contract_address == Address::ZERO {
            return Err(Error::InvalidConfig("contract address is zero".into()));
        }

        if let Network::Custom { rpc_url, chain_id } = &self.network {
            if *chain_id == 0 {
                return Err(Error::InvalidConfig("custom chain id is zero".into()));
            }
            if !rpc_url.starts_with("http://") && !rpc_url.starts_with("https://") {
                return Err(Error::InvalidConfig(format!(
                    "custom rpc url is not http(s): {rpc_url}"
                )));
            }
        }

        Ok(())
    }
}
