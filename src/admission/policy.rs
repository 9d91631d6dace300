//! Admission Policy
//!
//! Pure decision logic over an intelligence report: no I/O, no shared
//! state, same report in, same decision out.
//!
//! Rule: a confirmed vpn, proxy or tor signal rejects the ballot.
//! Unconfirmed signals are not blocking: ambiguity favors the voter
//! (recorded product decision, see DESIGN.md; do not tighten here).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::intel::IntelReport;

/// Substituted for location fields the intelligence service omitted.
pub const UNKNOWN_FIELD: &str = "Unknown";

/// Three-valued anonymization flag. `Unknown` means the intelligence
/// service did not report the signal either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriState {
    True,
    False,
    #[default]
    Unknown,
}

impl TriState {
    pub fn from_signal(signal: Option<bool>) -> Self {
        match signal {
            Some(true) => TriState::True,
            Some(false) => TriState::False,
            None => TriState::Unknown,
        }
    }

    /// Confirmed positive. `Unknown` is not confirmed.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, TriState::True)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriState::True => "true",
            TriState::False => "false",
            TriState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" => Ok(TriState::True),
            "false" => Ok(TriState::False),
            "unknown" => Ok(TriState::Unknown),
            other => Err(format!("not a tri-state flag: {}", other)),
        }
    }
}

/// Fields carried into an accepted record, with absent values resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub country: String,
    pub city: String,
    pub vpn: TriState,
    pub proxy: TriState,
    pub tor: TriState,
}

/// Which anonymization signals were confirmed on a rejected ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnonymizationDetected {
    pub vpn: bool,
    pub proxy: bool,
    pub tor: bool,
}

/// Outcome of evaluating one intelligence report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept(Enrichment),
    Reject(AnonymizationDetected),
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept(_))
    }
}

/// Evaluate one intelligence report against the admission rule.
pub fn evaluate(report: &IntelReport) -> Decision {
    let vpn = TriState::from_signal(report.security.vpn);
    let proxy = TriState::from_signal(report.security.proxy);
    let tor = TriState::from_signal(report.security.tor);

    if vpn.is_confirmed() || proxy.is_confirmed() || tor.is_confirmed() {
        return Decision::Reject(AnonymizationDetected {
            vpn: vpn.is_confirmed(),
            proxy: proxy.is_confirmed(),
            tor: tor.is_confirmed(),
        });
    }

    Decision::Accept(Enrichment {
        country: report
            .location
            .country
            .clone()
            .unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
        city: report
            .location
            .city
            .clone()
            .unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
        vpn,
        proxy,
        tor,
    })
}
