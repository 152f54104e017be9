// # cloudcdn-ranges-core
//
// Core library that keeps the Google Cloud CDN edge IP ranges fresh.
//
// ## Architecture Overview
//
// Google publishes the Cloud CDN edge ranges as an SPF-style TXT record on
// `_cloud-eoips.googleusercontent.com`. This library:
// - **TxtResolver**: Trait for looking up TXT records
// - **fetch**: Turns TXT records into an ordered `PrefixSet`
// - **RangeRefresher**: Fetches on start and on a fixed interval, keeping
//   the last good set readable without locks
// - **IpRangeSource**: The synchronous accessor hosts consume
//
// ## Design Principles
//
// 1. **Explicit Construction**: The host owns the refresher; there is no global registry
// 2. **Last Known Good**: A failed fetch never replaces or clears the cached set
// 3. **All-or-Nothing**: A fetch returns every prefix of the response or an error
// 4. **Non-Blocking Reads**: Readers never wait on a refresh

pub mod config;
pub mod error;
pub mod fetch;
pub mod prefix;
pub mod refresher;
pub mod traits;

// Re-export core types for convenience
pub use config::{DEFAULT_INTERVAL, MAX_INTERVAL, RefresherConfig, parse_duration};
pub use error::{Error, Result};
pub use fetch::{DEFAULT_HOSTNAME, extract_prefixes, fetch_prefixes};
pub use prefix::{Prefix, PrefixSet};
pub use refresher::{Lifecycle, RangeRefresher};
pub use traits::{IpRangeSource, SOURCE_ID, TxtResolver};
