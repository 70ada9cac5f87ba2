//! Shared account state written by refresh sessions.
//!
//! Each source owns one slice of the store, keyed by its [`SourceKind`], so
//! sources settling concurrently never touch each other's data.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, RwLock};

use crate::profiles::Profile;
use crate::sources::{
    AssetBalance, LiquidityPosition, SourceKind, SourcePayload, UniqueToken, WalletConnectSession,
};

/// One slice of the store
#[derive(Debug, Clone, Serialize)]
pub struct StoreEntry {
    pub payload: SourcePayload,
    pub updated_at: DateTime<Utc>,
    /// Session that wrote the entry
    pub session_id: u64,
}

/// Process-wide account state, cheap to clone
#[derive(Debug, Clone)]
pub struct AccountStore {
    slices: Arc<RwLock<BTreeMap<SourceKind, StoreEntry>>>,
    version: Arc<watch::Sender<u64>>,
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            slices: Arc::new(RwLock::new(BTreeMap::new())),
            version: Arc::new(version),
        }
    }

    /// Replace the slice owned by the payload's source
    pub async fn apply(&self, session_id: u64, payload: SourcePayload) {
        let kind = payload.kind();
        let entry = StoreEntry {
            payload,
            updated_at: Utc::now(),
            session_id,
        };
        self.slices.write().await.insert(kind, entry);
        self.version.send_modify(|version| *version += 1);
        tracing::trace!(source = %kind, session_id, "Store slice updated");
    }

    /// Subscribe to store mutations; the value counts writes so far
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Number of writes applied so far
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub async fn entry(&self, kind: SourceKind) -> Option<StoreEntry> {
        self.slices.read().await.get(&kind).cloned()
    }

    pub async fn snapshot(&self) -> BTreeMap<SourceKind, StoreEntry> {
        self.slices.read().await.clone()
    }

    pub async fn wallet_names(&self) -> BTreeMap<String, String> {
        match self.entry(SourceKind::WalletNames).await.map(|e| e.payload) {
            Some(SourcePayload::WalletNames(names)) => names,
            _ => BTreeMap::new(),
        }
    }

    pub async fn profiles(&self) -> BTreeMap<String, Profile> {
        match self.entry(SourceKind::RainbowProfiles).await.map(|e| e.payload) {
            Some(SourcePayload::RainbowProfiles(profiles)) => profiles,
            _ => BTreeMap::new(),
        }
    }

    pub async fn ens_avatars(&self) -> BTreeMap<String, String> {
        match self.entry(SourceKind::EnsAvatars).await.map(|e| e.payload) {
            Some(SourcePayload::EnsAvatars(avatars)) => avatars,
            _ => BTreeMap::new(),
        }
    }

    pub async fn unique_tokens(&self) -> Vec<UniqueToken> {
        match self.entry(SourceKind::UniqueTokens).await.map(|e| e.payload) {
            Some(SourcePayload::UniqueTokens(tokens)) => tokens,
            _ => Vec::new(),
        }
    }

    pub async fn balances(&self) -> Vec<AssetBalance> {
        match self.entry(SourceKind::OnchainBalances).await.map(|e| e.payload) {
            Some(SourcePayload::OnchainBalances(balances)) => balances,
            _ => Vec::new(),
        }
    }

    pub async fn wallet_connect_sessions(&self) -> Vec<WalletConnectSession> {
        match self.entry(SourceKind::WalletConnect).await.map(|e| e.payload) {
            Some(SourcePayload::WalletConnect(sessions)) => sessions,
            _ => Vec::new(),
        }
    }

    pub async fn positions(&self) -> Vec<LiquidityPosition> {
        match self.entry(SourceKind::Positions).await.map(|e| e.payload) {
            Some(SourcePayload::Positions(positions)) => positions,
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_apply_replaces_only_its_slice() {
        let store = AccountStore::new();
        let mut version = store.subscribe();

        store
            .apply(1, SourcePayload::UniqueTokens(Vec::new()))
            .await;
        store
            .apply(1, SourcePayload::Positions(Vec::new()))
            .await;
        store
            .apply(2, SourcePayload::UniqueTokens(Vec::new()))
            .await;

        assert!(version.has_changed().unwrap());
        assert_eq!(*version.borrow_and_update(), 3);

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[&SourceKind::UniqueTokens].session_id, 2);
        assert_eq!(snapshot[&SourceKind::Positions].session_id, 1);
        assert!(store.wallet_names().await.is_empty());
    }
}
