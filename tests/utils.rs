use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use wallet_refresh_sdk::sources::{
    AssetBalance, LiquidityPosition, UniqueToken, WalletConnectSession,
};
use wallet_refresh_sdk::{
    profiles::address_hashed_profile, AccountStore, BalanceOptions, Error, RefreshConfig,
    RefreshCoordinator, SessionContext, SourceFetcher, SourceKind, SourcePayload, SourceRegistry,
};

#[cfg(test)]
#[allow(dead_code)]
pub mod test_utils {
    use super::*;

    pub const TEST_ADDRESSES: [&str; 2] = [
        "0x7a3d05c70581bd345fe117c06e45f9669205384f",
        "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984",
    ];

    /// Install a test subscriber once per test binary
    pub fn init_test_env() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("wallet_refresh_sdk=debug")
            .with_test_writer()
            .try_init();
    }

    pub fn test_config() -> RefreshConfig {
        RefreshConfig::default()
            .with_wallet_addresses(TEST_ADDRESSES.iter().map(|a| a.to_string()).collect())
    }

    /// Payload a healthy source returns
    pub fn sample_payload(kind: SourceKind, ctx: &SessionContext) -> SourcePayload {
        match kind {
            SourceKind::WalletNames => SourcePayload::WalletNames(
                ctx.wallet_addresses
                    .iter()
                    .map(|a| (a.clone(), "vitalik.eth".to_string()))
                    .collect(),
            ),
            SourceKind::RainbowProfiles => SourcePayload::RainbowProfiles(
                ctx.wallet_addresses
                    .iter()
                    .map(|a| (a.clone(), address_hashed_profile(a)))
                    .collect(),
            ),
            SourceKind::EnsAvatars => SourcePayload::EnsAvatars(BTreeMap::from([(
                TEST_ADDRESSES[0].to_string(),
                "https://example.com/avatar.png".to_string(),
            )])),
            SourceKind::UniqueTokens => SourcePayload::UniqueTokens(vec![UniqueToken {
                id: "42".to_string(),
                contract_address: "0x57f1887a8bf19b14fc0df6fd9b2acc9af147ea85".to_string(),
                name: "test.eth".to_string(),
                collection: None,
                image_url: None,
            }]),
            SourceKind::OnchainBalances => SourcePayload::OnchainBalances(vec![AssetBalance {
                symbol: "ETH".to_string(),
                address: "eth".to_string(),
                amount: "1000000000000000000".to_string(),
                decimals: 18,
                price_usd: None,
            }]),
            SourceKind::WalletConnect => SourcePayload::WalletConnect(vec![WalletConnectSession {
                peer_id: "peer".to_string(),
                dapp_name: "dapp".to_string(),
                dapp_url: "https://dapp.example".to_string(),
                chain_id: ctx.network.chain_id(),
                accounts: ctx.wallet_addresses.to_vec(),
            }]),
            SourceKind::Positions => SourcePayload::Positions(vec![LiquidityPosition {
                pool_address: "0xb4e16d0168e52d35cacd2c6185b44281ec28c9dc".to_string(),
                token0: "USDC".to_string(),
                token1: "WETH".to_string(),
                liquidity: "10".to_string(),
            }]),
        }
    }

    /// Source that counts its calls and can be slowed down or made to fail
    pub struct RecordingSource {
        kind: SourceKind,
        delay: Duration,
        fail: bool,
        calls: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
        balance_options: Mutex<Vec<BalanceOptions>>,
    }

    impl RecordingSource {
        pub fn new(kind: SourceKind, delay: Duration, fail: bool) -> Self {
            Self {
                kind,
                delay,
                fail,
                calls: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                balance_options: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Highest number of overlapping fetches observed
        pub fn max_active(&self) -> usize {
            self.max_active.load(Ordering::SeqCst)
        }

        pub fn balance_options(&self) -> Vec<BalanceOptions> {
            self.balance_options.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SourceFetcher for RecordingSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn fetch(&self, ctx: &SessionContext) -> Result<SourcePayload, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            self.balance_options
                .lock()
                .unwrap()
                .push(ctx.balance_options);

            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                Err(Error::Network(format!("{} unreachable", self.kind)))
            } else {
                Ok(sample_payload(self.kind, ctx))
            }
        }
    }

    pub type Sources = BTreeMap<SourceKind, Arc<RecordingSource>>;

    /// Registry with a recording source for every kind
    pub fn recording_sources(delay: Duration, failing: &[SourceKind]) -> (SourceRegistry, Sources) {
        let mut registry = SourceRegistry::new();
        let mut sources = Sources::new();
        for kind in SourceKind::ALL {
            let source = Arc::new(RecordingSource::new(kind, delay, failing.contains(&kind)));
            registry.register(source.clone());
            sources.insert(kind, source);
        }
        (registry, sources)
    }

    pub fn create_test_coordinator(
        config: RefreshConfig,
        delay: Duration,
        failing: &[SourceKind],
    ) -> (Arc<RefreshCoordinator>, Sources) {
        init_test_env();
        let (registry, sources) = recording_sources(delay, failing);
        let coordinator = RefreshCoordinator::new(config, registry, AccountStore::new())
            .expect("Failed to create coordinator");
        (Arc::new(coordinator), sources)
    }

    pub fn called_sources(sources: &Sources) -> Vec<SourceKind> {
        sources
            .iter()
            .filter(|(_, source)| source.calls() > 0)
            .map(|(kind, _)| *kind)
            .collect()
    }
}
