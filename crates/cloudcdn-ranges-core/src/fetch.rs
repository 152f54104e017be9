//! Fetching prefixes from the published TXT record
//!
//! The record uses SPF syntax, e.g.
//! `"v=spf1 ip4:34.96.0.0/20 ip4:34.127.192.0/18 ip6:2600:1900:4000::/40 ~all"`.
//! Only tokens starting with `ip` are considered; every other SPF directive
//! is ignored.

use tracing::debug;

use crate::error::Result;
use crate::prefix::{Prefix, PrefixSet};
use crate::traits::TxtResolver;

/// TXT record listing the Cloud CDN edge ranges
pub const DEFAULT_HOSTNAME: &str = "_cloud-eoips.googleusercontent.com";

/// Extract prefixes from raw TXT records
///
/// All-or-nothing: the first malformed candidate aborts the whole call.
pub fn extract_prefixes<S: AsRef<str>>(records: &[S]) -> Result<PrefixSet> {
    let mut prefixes = Vec::new();

    for record in records {
        for token in record.as_ref().split_whitespace() {
            if !token.starts_with("ip") {
                continue;
            }

            let expr = token.split_once(':').map_or(token, |(_, rest)| rest);
            let prefix = Prefix::parse(expr)?;
            debug!("Parsed {} from token {}", prefix, token);
            prefixes.push(prefix);
        }
    }

    Ok(PrefixSet::from(prefixes))
}

/// Resolve `hostname` and extract its prefixes
pub async fn fetch_prefixes(resolver: &dyn TxtResolver, hostname: &str) -> Result<PrefixSet> {
    let records = resolver.lookup_txt(hostname).await?;
    debug!(
        "{} returned {} TXT record(s) for {}",
        resolver.resolver_name(),
        records.len(),
        hostname
    );
    extract_prefixes(&records)
}
