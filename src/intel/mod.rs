//! IP Intelligence Module
//!
//! Outbound lookup against the configured IP-reputation service:
//! geolocation (country/city) plus anonymization signals (vpn/proxy/tor).
//! Pure request/response; the only failure surface is `LookupError`.

pub mod client;

pub use client::{
    IntelClient, IntelConfig, IntelLookup, IntelReport, LocationInfo, LookupError,
    SecuritySignals, PLACEHOLDER_API_KEY,
};
