// # Hickory TXT Resolver
//
// This crate provides a `TxtResolver` backed by hickory-resolver.
//
// ## Behavior
//
// - One TXT query per `lookup_txt()` call
// - Uses the system resolver configuration (`/etc/resolv.conf` on Unix),
//   falling back to hickory's default upstreams when it cannot be read
// - Timeouts and attempts come from `ResolverOpts`; nothing is layered on top
// - Every hickory error (including "no records") maps to `Error::Resolution`
//
// ## Usage
//
// ```rust,ignore
// use cloudcdn_ranges_core::{RangeRefresher, RefresherConfig};
// use cloudcdn_ranges_hickory::HickoryTxtResolver;
// use std::sync::Arc;
//
// let resolver = Arc::new(HickoryTxtResolver::from_system_conf());
// let refresher = RangeRefresher::new(resolver, RefresherConfig::new())?;
// refresher.start().await?;
// ```

use async_trait::async_trait;
use cloudcdn_ranges_core::{Error, Result, TxtResolver};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::rdata::TXT;
use tracing::{debug, warn};

/// TXT resolver over hickory-resolver's tokio resolver
pub struct HickoryTxtResolver {
    resolver: TokioAsyncResolver,
}

impl HickoryTxtResolver {
    /// Build from the system resolver configuration
    ///
    /// Falls back to [`ResolverConfig::default()`] if the system
    /// configuration is missing or unreadable.
    pub fn from_system_conf() -> Self {
        match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(resolver) => Self { resolver },
            Err(e) => {
                warn!("Failed to read system DNS config, using defaults: {}", e);
                Self::with_config(ResolverConfig::default(), ResolverOpts::default())
            }
        }
    }

    /// Build from an explicit configuration
    pub fn with_config(config: ResolverConfig, opts: ResolverOpts) -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

impl Default for HickoryTxtResolver {
    fn default() -> Self {
        Self::from_system_conf()
    }
}

impl std::fmt::Debug for HickoryTxtResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryTxtResolver").finish_non_exhaustive()
    }
}

/// Join a record's character-strings into one string
///
/// Long TXT records are split into 255-byte chunks on the wire; the chunks
/// concatenate without separators.
fn record_text(txt: &TXT) -> String {
    txt.txt_data()
        .iter()
        .map(|chunk| String::from_utf8_lossy(chunk))
        .collect()
}

#[async_trait]
impl TxtResolver for HickoryTxtResolver {
    async fn lookup_txt(&self, hostname: &str) -> Result<Vec<String>> {
        let lookup = self
            .resolver
            .txt_lookup(hostname)
            .await
            .map_err(|e| Error::resolution(hostname, e.to_string()))?;

        let records: Vec<String> = lookup.iter().map(record_text).collect();
        debug!("Resolved {} TXT record(s) for {}", records.len(), hostname);
        Ok(records)
    }

    fn resolver_name(&self) -> &'static str {
        "hickory"
    }
}
