//! Best-effort location enrichment.
//!
//! Two external services are consulted: an IP geolocation API (ip-api.com
//! compatible) and a reverse geocoder (Nominatim compatible). Both are
//! optional niceties. Every failure is logged and degrades to a sentinel so
//! the caller always has a log line to write.

pub mod client;
pub mod types;

pub use client::GeoLookup;
pub use types::{is_lookupable, IpLocation, NOT_AVAILABLE};
