//! Core traits for the range refresher
//!
//! This module defines the seams between the refresher and its surroundings.
//!
//! - [`TxtResolver`]: Look up DNS TXT records
//! - [`IpRangeSource`]: Hand current ranges to a host

pub mod range_source;
pub mod txt_resolver;

pub use range_source::{IpRangeSource, SOURCE_ID};
pub use txt_resolver::TxtResolver;
