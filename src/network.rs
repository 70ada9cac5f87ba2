use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Chains a wallet account can be switched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Ropsten,
    Kovan,
    Rinkeby,
    Goerli,
}

/// How the refresh policy treats a network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkRole {
    /// The production network, every source is refreshed
    Primary,
    /// The designated test network, only the NFT inventory is refreshed
    SecondaryTest,
    /// Any other test network, nothing is fetched
    OtherTest,
}

impl Network {
    pub const ALL: [Network; 5] = [
        Network::Mainnet,
        Network::Ropsten,
        Network::Kovan,
        Network::Rinkeby,
        Network::Goerli,
    ];

    /// Lowercase network name as used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Ropsten => "ropsten",
            Network::Kovan => "kovan",
            Network::Rinkeby => "rinkeby",
            Network::Goerli => "goerli",
        }
    }

    /// EVM chain id of the network
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Ropsten => 3,
            Network::Rinkeby => 4,
            Network::Goerli => 5,
            Network::Kovan => 42,
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, Network::Mainnet)
    }

    /// Role of this network given which test network is the designated secondary one
    pub fn role(&self, secondary_test_network: Network) -> NetworkRole {
        if self.is_primary() {
            NetworkRole::Primary
        } else if *self == secondary_test_network {
            NetworkRole::SecondaryTest
        } else {
            NetworkRole::OtherTest
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Network::ALL
            .iter()
            .copied()
            .find(|network| network.as_str() == name)
            .ok_or_else(|| Error::Config(format!("Unknown network: {}", s)))
    }
}
