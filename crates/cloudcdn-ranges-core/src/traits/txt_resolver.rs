// # TXT Resolver Trait
//
// Defines the interface for looking up DNS TXT records.
//
// ## Implementations
//
// - hickory-resolver backed: `cloudcdn-ranges-hickory` crate
// - Test doubles: `tests/common/mod.rs`
//
// ## Usage
//
// ```rust,ignore
// use cloudcdn_ranges_core::TxtResolver;
//
// #[tokio::main]
// async fn main() -> cloudcdn_ranges_core::Result<()> {
//     let resolver = /* TxtResolver implementation */;
//
//     for record in resolver.lookup_txt("_cloud-eoips.googleusercontent.com").await? {
//         println!("{}", record);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for TXT record resolvers
///
/// A resolver performs exactly one lookup per call and reports the records
/// in the order the DNS response carried them. Each returned `String` is one
/// TXT record with its character-strings concatenated.
///
/// # Responsibilities
///
/// - Map transport failures (timeouts, NXDOMAIN, broken config) to
///   [`crate::Error::Resolution`]
/// - Rely on the underlying resolver's own timeout
///
/// Resolvers must not retry, cache, or spawn tasks. Scheduling and retry
/// belong to [`crate::RangeRefresher`], whose next tick is the only retry.
#[async_trait]
pub trait TxtResolver: Send + Sync {
    /// Look up all TXT records for `hostname`
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<String>)`: One entry per TXT record (possibly empty)
    /// - `Err(Error::Resolution)`: The lookup itself failed
    async fn lookup_txt(&self, hostname: &str) -> Result<Vec<String>, crate::Error>;

    /// Short name for logs (e.g. "hickory")
    fn resolver_name(&self) -> &'static str;
}
