//! Test doubles and common utilities for refresher contract tests
//!
//! These resolvers stand in for DNS so the tests control exactly what each
//! lookup returns and can count how many lookups happened.

#![allow(dead_code)]

use cloudcdn_ranges_core::{
    Error, Prefix, PrefixSet, RangeRefresher, RefresherConfig, Result, TxtResolver,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// The record as published, trimmed to three ranges
pub const PUBLISHED_RECORD: &str =
    "v=spf1 ip4:34.96.0.0/20 ip4:34.127.192.0/18 ip6:2600:1900:4000::/40 ~all";

/// One scripted lookup outcome
#[derive(Debug, Clone)]
pub enum Step {
    Records(Vec<String>),
    Fail(&'static str),
}

impl Step {
    pub fn records(records: &[&str]) -> Self {
        Step::Records(records.iter().map(|r| r.to_string()).collect())
    }
}

/// A resolver that replays a script, one step per lookup
///
/// Once the script runs out every lookup fails.
pub struct ScriptedResolver {
    script: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedResolver {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into_iter().collect()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Get the number of times lookup_txt() was called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Append steps to the end of the script
    pub fn push(&self, step: Step) {
        self.script.lock().unwrap().push_back(step);
    }
}

#[async_trait::async_trait]
impl TxtResolver for ScriptedResolver {
    async fn lookup_txt(&self, hostname: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().unwrap().pop_front();

        match step {
            Some(Step::Records(records)) => Ok(records),
            Some(Step::Fail(message)) => Err(Error::resolution(hostname, message)),
            None => Err(Error::resolution(hostname, "script exhausted")),
        }
    }

    fn resolver_name(&self) -> &'static str {
        "scripted"
    }
}

/// A resolver that always answers with the same records
pub struct StaticResolver {
    records: Vec<String>,
    calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new(records: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            records: records.iter().map(|r| r.to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    /// Get the number of times lookup_txt() was called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TxtResolver for StaticResolver {
    async fn lookup_txt(&self, _hostname: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }

    fn resolver_name(&self) -> &'static str {
        "static"
    }
}

/// A resolver whose every lookup takes `delay` before answering
pub struct SlowResolver {
    delay: Duration,
    records: Vec<String>,
    started: AtomicUsize,
    finished: AtomicUsize,
}

impl SlowResolver {
    pub fn new(delay: Duration, records: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            delay,
            records: records.iter().map(|r| r.to_string()).collect(),
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
        })
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TxtResolver for SlowResolver {
    async fn lookup_txt(&self, _hostname: &str) -> Result<Vec<String>> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }

    fn resolver_name(&self) -> &'static str {
        "slow"
    }
}

/// Build a refresher over `resolver` with the given interval
pub fn refresher_with(resolver: Arc<dyn TxtResolver>, interval: Duration) -> RangeRefresher {
    RangeRefresher::new(resolver, RefresherConfig::new().with_interval(interval))
        .expect("refresher construction succeeds")
}

/// Parse a list of CIDR strings into a set
pub fn set_of(cidrs: &[&str]) -> PrefixSet {
    cidrs
        .iter()
        .map(|c| Prefix::parse(c).expect("valid CIDR in test"))
        .collect()
}

/// Render a set as CIDR strings
pub fn cidrs(set: &PrefixSet) -> Vec<String> {
    set.iter().map(ToString::to_string).collect()
}
