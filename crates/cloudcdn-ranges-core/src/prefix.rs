// # Prefix Data Model
//
// `Prefix` is one parsed CIDR network; `PrefixSet` is the ordered result of
// exactly one successful fetch. Neither is mutated after construction: a
// refresh builds a new set and swaps it in wholesale.

use ipnetwork::IpNetwork;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::Error;

/// An IPv4 or IPv6 network in CIDR form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prefix(IpNetwork);

impl Prefix {
    /// Parse a CIDR expression
    ///
    /// A bare address without `/len` becomes a host prefix (`/32` or `/128`).
    pub fn parse(expr: &str) -> Result<Self, Error> {
        expr.parse::<IpNetwork>()
            .map(Self)
            .map_err(|e| Error::parse(expr, e.to_string()))
    }

    /// Network address as written (host bits are not masked off)
    pub fn addr(&self) -> IpAddr {
        self.0.ip()
    }

    /// Prefix length in bits
    pub fn prefix_len(&self) -> u8 {
        self.0.prefix()
    }

    /// Whether `addr` falls inside this network
    pub fn contains(&self, addr: IpAddr) -> bool {
        self.0.contains(addr)
    }

    pub fn is_ipv4(&self) -> bool {
        self.0.is_ipv4()
    }

    pub fn is_ipv6(&self) -> bool {
        self.0.is_ipv6()
    }

    /// The underlying `ipnetwork` value
    pub fn network(&self) -> IpNetwork {
        self.0
    }
}

impl From<IpNetwork> for Prefix {
    fn from(network: IpNetwork) -> Self {
        Self(network)
    }
}

impl FromStr for Prefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for Prefix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Prefix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Prefix::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Ordered prefixes from a single fetch
///
/// Order follows the DNS response: records in response order, tokens left to
/// right within a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefixSet {
    prefixes: Vec<Prefix>,
}

impl PrefixSet {
    /// Create an empty set (the state before any successful fetch)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Prefix> {
        self.prefixes.iter()
    }

    pub fn as_slice(&self) -> &[Prefix] {
        &self.prefixes
    }

    /// Whether any prefix in the set contains `addr`
    pub fn contains(&self, addr: IpAddr) -> bool {
        self.prefixes.iter().any(|prefix| prefix.contains(addr))
    }
}

impl From<Vec<Prefix>> for PrefixSet {
    fn from(prefixes: Vec<Prefix>) -> Self {
        Self { prefixes }
    }
}

impl FromIterator<Prefix> for PrefixSet {
    fn from_iter<I: IntoIterator<Item = Prefix>>(iter: I) -> Self {
        Self {
            prefixes: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PrefixSet {
    type Item = &'a Prefix;
    type IntoIter = std::slice::Iter<'a, Prefix>;

    fn into_iter(self) -> Self::IntoIter {
        self.prefixes.iter()
    }
}
