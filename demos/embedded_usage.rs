//! Minimal embedding example for cloudcdn-ranges-core
//!
//! This example drives the refresher as a library with an in-process TXT
//! source that rotates its answer, so refreshes are visible within seconds.
//! The refresher lifecycle is fully managed by the application.

use cloudcdn_ranges_core::{
    IpRangeSource, RangeRefresher, RefresherConfig, Result, TxtResolver,
};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Custom TXT source for embedded usage
///
/// Alternates between two published shapes and fails every third lookup.
struct RotatingTxt {
    lookups: AtomicUsize,
}

#[async_trait::async_trait]
impl TxtResolver for RotatingTxt {
    async fn lookup_txt(&self, hostname: &str) -> Result<Vec<String>> {
        let n = self.lookups.fetch_add(1, Ordering::SeqCst);
        match n % 3 {
            0 => Ok(vec![
                "v=spf1 ip4:34.96.0.0/20 ip4:34.127.192.0/18 ~all".to_string(),
            ]),
            1 => Ok(vec![
                "v=spf1 ip4:34.96.0.0/20 ip6:2600:1900:4000::/40 ~all".to_string(),
            ]),
            _ => Err(cloudcdn_ranges_core::Error::resolution(
                hostname,
                "simulated SERVFAIL",
            )),
        }
    }

    fn resolver_name(&self) -> &'static str {
        "rotating"
    }
}

/// A host-side check that only sees the `IpRangeSource` seam
fn describe(source: &dyn IpRangeSource, client: IpAddr) -> String {
    let ranges = source.ranges();
    format!(
        "{} range(s), {} trusted: {}",
        ranges.len(),
        client,
        source.is_trusted(client)
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    println!("=== Embedded cloudcdn-ranges-core Example ===\n");

    let app_shutdown = CancellationToken::new();
    let resolver = Arc::new(RotatingTxt {
        lookups: AtomicUsize::new(0),
    });
    let config = RefresherConfig::new().with_interval(Duration::from_millis(500));

    println!("1. Creating refresher...");
    let refresher = RangeRefresher::new(resolver, config)?.with_cancellation(&app_shutdown);

    println!("2. Starting (initial fetch happens now)...");
    refresher.start().await?;

    let client: IpAddr = "2600:1900:4000::1".parse().map_err(|e| {
        cloudcdn_ranges_core::Error::Other(format!("bad demo address: {}", e))
    })?;

    println!("3. Reading while refreshes run:\n");
    for _ in 0..8 {
        println!("   {}", describe(&refresher, client));
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    println!("\n4. Cancelling the application token...");
    app_shutdown.cancel();
    refresher.wait().await;

    println!("5. Refresher state: {}", refresher.state());
    println!("   Last ranges still readable: {}", describe(&refresher, client));

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Refresher lifecycle is fully controlled by application");
    println!("- No global state");
    println!("- Failed lookups keep the previous ranges");

    Ok(())
}
