//! Wallet names and rainbow profiles.
//!
//! Both sources resolve one record per wallet address through a collaborator
//! resolver. Rainbow profiles fall back to an address-hashed color and emoji
//! when the resolver has nothing stored for an address.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures::future::try_join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::session::SessionContext;
use crate::sources::{SourceFetcher, SourceKind, SourcePayload};

/// Avatar background colors an address can hash to
pub const AVATAR_BACKGROUNDS: [&str; 12] = [
    "#FF494A", "#01D3FF", "#FB60C4", "#3F6AFF", "#FFD963", "#B140FF",
    "#41EBC1", "#F46E38", "#6D7E8F", "#FF8A00", "#5F5AFA", "#50C878",
];

/// Emojis an address can hash to
pub const AVATAR_EMOJIS: [&str; 12] = [
    "🌶", "🤑", "🐙", "🫐", "🐳", "🤶", "🌲", "🌞", "🐒", "🐵", "🦊", "🐼",
];

/// Color and emoji shown for an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub color: String,
    pub emoji: String,
}

fn address_regex() -> &'static Regex {
    static ADDRESS: OnceLock<Regex> = OnceLock::new();
    ADDRESS.get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("valid address regex"))
}

/// Whether the string is a 20-byte hex account address
pub fn is_valid_address(address: &str) -> bool {
    address_regex().is_match(address)
}

fn address_hash(address: &str) -> Option<u32> {
    if !is_valid_address(address) {
        return None;
    }
    let bytes = hex::decode(&address[2..].to_ascii_lowercase()).ok()?;
    Some(
        bytes
            .iter()
            .fold(0u32, |acc, byte| acc.wrapping_mul(31).wrapping_add(u32::from(*byte))),
    )
}

/// Palette index derived from an address, `None` for invalid addresses
pub fn address_hashed_color_index(address: &str) -> Option<usize> {
    address_hash(address).map(|hash| hash as usize % AVATAR_BACKGROUNDS.len())
}

/// Emoji derived from an address, `None` for invalid addresses
pub fn address_hashed_emoji(address: &str) -> Option<&'static str> {
    address_hash(address).map(|hash| AVATAR_EMOJIS[(hash >> 8) as usize % AVATAR_EMOJIS.len()])
}

/// Deterministic profile used when nothing is stored for an address
pub fn address_hashed_profile(address: &str) -> Profile {
    let color = AVATAR_BACKGROUNDS[address_hashed_color_index(address).unwrap_or(0)];
    let emoji = address_hashed_emoji(address).unwrap_or(AVATAR_EMOJIS[0]);
    Profile {
        color: color.to_string(),
        emoji: emoji.to_string(),
    }
}

/// Resolves a display name (ENS or similar) for an address
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve_name(&self, address: &str) -> Result<Option<String>, Error>;
}

/// Looks up the stored profile of an address
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    async fn fetch_profile(&self, address: &str) -> Result<Option<Profile>, Error>;
}

/// Wallet names source backed by a [`NameResolver`]
pub struct WalletNamesSource {
    resolver: Arc<dyn NameResolver>,
}

impl WalletNamesSource {
    pub fn new(resolver: Arc<dyn NameResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl SourceFetcher for WalletNamesSource {
    fn kind(&self) -> SourceKind {
        SourceKind::WalletNames
    }

    async fn fetch(&self, ctx: &SessionContext) -> Result<SourcePayload, Error> {
        let lookups = ctx.wallet_addresses.iter().map(|address| async move {
            let name = self.resolver.resolve_name(address).await?;
            Ok::<_, Error>(name.map(|name| (address.clone(), name)))
        });

        let names: BTreeMap<String, String> =
            try_join_all(lookups).await?.into_iter().flatten().collect();

        Ok(SourcePayload::WalletNames(names))
    }
}

/// Rainbow profiles source backed by a [`ProfileResolver`]
pub struct RainbowProfilesSource {
    resolver: Arc<dyn ProfileResolver>,
}

impl RainbowProfilesSource {
    pub fn new(resolver: Arc<dyn ProfileResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl SourceFetcher for RainbowProfilesSource {
    fn kind(&self) -> SourceKind {
        SourceKind::RainbowProfiles
    }

    async fn fetch(&self, ctx: &SessionContext) -> Result<SourcePayload, Error> {
        let lookups = ctx
            .wallet_addresses
            .iter()
            .filter(|address| is_valid_address(address))
            .map(|address| async move {
                let profile = self
                    .resolver
                    .fetch_profile(address)
                    .await?
                    .unwrap_or_else(|| address_hashed_profile(address));
                Ok::<_, Error>((address.clone(), profile))
            });

        let profiles: BTreeMap<String, Profile> = try_join_all(lookups).await?.into_iter().collect();

        Ok(SourcePayload::RainbowProfiles(profiles))
    }
}
