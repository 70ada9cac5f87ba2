pub mod aggregator;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gate;
pub mod logging;
pub mod network;
pub mod policy;
pub mod profiles;
pub mod reachability;
pub mod session;
pub mod sources;
pub mod store;

pub use aggregator::run_session;
pub use crate::config::RefreshConfig;
pub use coordinator::{RefreshCoordinator, RefreshOutcome};
pub use error::Error;
pub use gate::{MinimumDurationGate, DEFAULT_MINIMUM_DURATION};
pub use network::{Network, NetworkRole};
pub use policy::{select_sources, FeatureFlags};
pub use profiles::{NameResolver, Profile, ProfileResolver, RainbowProfilesSource, WalletNamesSource};
pub use reachability::{Reachability, ReachabilityMonitor, Subscription};
pub use session::{BalanceOptions, RefreshSession, RefreshTrigger, SessionContext, SessionReport};
pub use sources::{FnSource, SourceFetcher, SourceKind, SourceOutcome, SourcePayload, SourceRegistry};
pub use store::AccountStore;
