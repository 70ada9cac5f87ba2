//! Data sources refreshed by a session.
//!
//! Every source is a named capability implementing [`SourceFetcher`]. The
//! [`SourceRegistry`] maps each [`SourceKind`] to the fetcher that owns it so
//! the network policy can select sources by name.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::profiles::Profile;
use crate::session::SessionContext;

/// Name of every source the coordinator knows how to refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    WalletNames,
    RainbowProfiles,
    EnsAvatars,
    UniqueTokens,
    OnchainBalances,
    WalletConnect,
    Positions,
}

impl SourceKind {
    pub const ALL: [SourceKind; 7] = [
        SourceKind::WalletNames,
        SourceKind::RainbowProfiles,
        SourceKind::EnsAvatars,
        SourceKind::UniqueTokens,
        SourceKind::OnchainBalances,
        SourceKind::WalletConnect,
        SourceKind::Positions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::WalletNames => "wallet_names",
            SourceKind::RainbowProfiles => "rainbow_profiles",
            SourceKind::EnsAvatars => "ens_avatars",
            SourceKind::UniqueTokens => "unique_tokens",
            SourceKind::OnchainBalances => "onchain_balances",
            SourceKind::WalletConnect => "wallet_connect",
            SourceKind::Positions => "positions",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase().replace('-', "_");
        SourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| Error::Other(format!("Unknown source: {}", s)))
    }
}

/// A non-fungible token owned by one of the wallet's accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueToken {
    pub id: String,
    pub contract_address: String,
    pub name: String,
    pub collection: Option<String>,
    pub image_url: Option<String>,
}

/// Balance of a single asset, amount kept as a raw integer string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub symbol: String,
    pub address: String,
    pub amount: String,
    pub decimals: u8,
    /// Only present when the fetch requested prices
    pub price_usd: Option<f64>,
}

/// A restored wallet-connect session with a dapp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletConnectSession {
    pub peer_id: String,
    pub dapp_name: String,
    pub dapp_url: String,
    pub chain_id: u64,
    pub accounts: Vec<String>,
}

/// A liquidity position in an AMM pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub pool_address: String,
    pub token0: String,
    pub token1: String,
    pub liquidity: String,
}

/// Refreshed data of one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "data", rename_all = "snake_case")]
pub enum SourcePayload {
    WalletNames(BTreeMap<String, String>),
    RainbowProfiles(BTreeMap<String, Profile>),
    EnsAvatars(BTreeMap<String, String>),
    UniqueTokens(Vec<UniqueToken>),
    OnchainBalances(Vec<AssetBalance>),
    WalletConnect(Vec<WalletConnectSession>),
    Positions(Vec<LiquidityPosition>),
}

impl SourcePayload {
    /// The source this payload belongs to
    pub fn kind(&self) -> SourceKind {
        match self {
            SourcePayload::WalletNames(_) => SourceKind::WalletNames,
            SourcePayload::RainbowProfiles(_) => SourceKind::RainbowProfiles,
            SourcePayload::EnsAvatars(_) => SourceKind::EnsAvatars,
            SourcePayload::UniqueTokens(_) => SourceKind::UniqueTokens,
            SourcePayload::OnchainBalances(_) => SourceKind::OnchainBalances,
            SourcePayload::WalletConnect(_) => SourceKind::WalletConnect,
            SourcePayload::Positions(_) => SourceKind::Positions,
        }
    }

    /// Number of entries carried by the payload, used for logging
    pub fn len(&self) -> usize {
        match self {
            SourcePayload::WalletNames(m) => m.len(),
            SourcePayload::RainbowProfiles(m) => m.len(),
            SourcePayload::EnsAvatars(m) => m.len(),
            SourcePayload::UniqueTokens(v) => v.len(),
            SourcePayload::OnchainBalances(v) => v.len(),
            SourcePayload::WalletConnect(v) => v.len(),
            SourcePayload::Positions(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// State of one source within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    Pending,
    Success { entries: usize },
    Failure { message: String },
}

impl SourceOutcome {
    pub fn is_settled(&self) -> bool {
        !matches!(self, SourceOutcome::Pending)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SourceOutcome::Failure { .. })
    }
}

/// Asynchronous unit of work producing the payload of one source
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// The source this fetcher owns
    fn kind(&self) -> SourceKind;

    /// Fetch fresh data for the session
    async fn fetch(&self, ctx: &SessionContext) -> Result<SourcePayload, Error>;
}

/// Adapter turning an async closure into a [`SourceFetcher`]
pub struct FnSource<F> {
    kind: SourceKind,
    func: F,
}

impl<F, Fut> FnSource<F>
where
    F: Fn(SessionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<SourcePayload, Error>> + Send + 'static,
{
    pub fn new(kind: SourceKind, func: F) -> Self {
        Self { kind, func }
    }
}

#[async_trait]
impl<F, Fut> SourceFetcher for FnSource<F>
where
    F: Fn(SessionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<SourcePayload, Error>> + Send + 'static,
{
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, ctx: &SessionContext) -> Result<SourcePayload, Error> {
        (self.func)(ctx.clone()).await
    }
}

/// Fetchers available to the coordinator, one per source
#[derive(Clone, Default)]
pub struct SourceRegistry {
    fetchers: HashMap<SourceKind, Arc<dyn SourceFetcher>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fetcher, replacing any fetcher previously registered for its source
    pub fn register(&mut self, fetcher: Arc<dyn SourceFetcher>) -> &mut Self {
        let kind = fetcher.kind();
        if self.fetchers.insert(kind, fetcher).is_some() {
            tracing::debug!(source = %kind, "Replaced registered fetcher");
        }
        self
    }

    /// Builder-style registration
    pub fn with(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.register(fetcher);
        self
    }

    pub fn get(&self, kind: SourceKind) -> Option<Arc<dyn SourceFetcher>> {
        self.fetchers.get(&kind).cloned()
    }

    pub fn contains(&self, kind: SourceKind) -> bool {
        self.fetchers.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.fetchers.keys().collect();
        kinds.sort();
        f.debug_struct("SourceRegistry")
            .field("sources", &kinds)
            .finish()
    }
}
