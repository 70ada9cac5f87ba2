use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::network::{Network, NetworkRole};
use crate::sources::SourceKind;

/// Experimental features that change what a refresh covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Profiles feature, enables ENS avatar refreshes
    pub profiles: bool,
}

/// Select the sources a refresh covers on a network.
///
/// The mapping is a pure function of the network, the designated secondary
/// test network and the feature flags:
///
/// - primary network: every source, ENS avatars only with the profiles flag
/// - the secondary test network: the NFT inventory only
/// - any other network: nothing, only the minimum duration applies
pub fn select_sources(
    network: Network,
    secondary_test_network: Network,
    flags: FeatureFlags,
) -> BTreeSet<SourceKind> {
    match network.role(secondary_test_network) {
        NetworkRole::Primary => {
            let mut sources = BTreeSet::from([
                SourceKind::WalletNames,
                SourceKind::RainbowProfiles,
                SourceKind::UniqueTokens,
                SourceKind::OnchainBalances,
                SourceKind::WalletConnect,
                SourceKind::Positions,
            ]);
            if flags.profiles {
                sources.insert(SourceKind::EnsAvatars);
            }
            sources
        }
        NetworkRole::SecondaryTest => BTreeSet::from([SourceKind::UniqueTokens]),
        NetworkRole::OtherTest => BTreeSet::new(),
    }
}
