// # IP Range Source Trait
//
// The contract a host (reverse proxy, HTTP server) relies on when it asks
// "which client ranges do I currently trust as forwarding proxies?". The
// answer must be synchronous and cheap: hosts call it on every request.

use std::net::IpAddr;
use std::sync::Arc;

use crate::prefix::PrefixSet;

/// Identifier under which hosts register this source
pub const SOURCE_ID: &str = "http.ip_sources.gcp_cloudcdn";

/// A provider of trusted IP ranges
pub trait IpRangeSource: Send + Sync {
    /// Current ranges snapshot
    ///
    /// Must return immediately without waiting on any in-flight refresh.
    fn ranges(&self) -> Arc<PrefixSet>;

    /// Whether `addr` belongs to one of the current ranges
    fn is_trusted(&self, addr: IpAddr) -> bool {
        self.ranges().contains(addr)
    }
}
