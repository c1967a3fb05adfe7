//! Symbol normalization and the trading universe.
//!
//! Tickers arrive decorated in vendor- and exchange-specific ways
//! (`NSE:RELIANCE`, `reliance.ns`, `TCS-EQ`, padded whitespace). The
//! breadth computation keys everything by one canonical form, so all
//! decorations are stripped at the edge and never seen again.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Exchange prefixes stripped during normalization (`NSE:RELIANCE`).
const EXCHANGE_PREFIXES: [&str; 2] = ["NSE:", "BSE:"];

/// Market suffixes stripped during normalization (`RELIANCE.NS`, `TCS-EQ`).
const MARKET_SUFFIXES: [&str; 4] = [".NSE", ".NS", ".BO", "-EQ"];

/// A normalized ticker symbol.
///
/// Always trimmed, upper-cased, and free of exchange decorations.
/// Construct via [`Symbol::normalize`]; the inner string is never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Normalize a raw ticker into canonical form.
    ///
    /// Returns `None` for inputs that are empty after trimming and
    /// stripping, so blank CSV cells vanish instead of producing a
    /// phantom symbol.
    pub fn normalize(raw: &str) -> Option<Self> {
        let mut s = raw.trim().to_uppercase();

        for prefix in EXCHANGE_PREFIXES {
            if let Some(rest) = s.strip_prefix(prefix) {
                s = rest.to_string();
                break;
            }
        }
        for suffix in MARKET_SUFFIXES {
            if let Some(rest) = s.strip_suffix(suffix) {
                s = rest.to_string();
                break;
            }
        }

        let s = s.trim().to_string();
        if s.is_empty() { None } else { Some(Self(s)) }
    }

    /// The canonical ticker string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deduplicate a sequence of symbols preserving first-seen order.
pub fn dedup_ordered(symbols: impl IntoIterator<Item = Symbol>) -> Vec<Symbol> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for sym in symbols {
        if seen.insert(sym.clone()) {
            out.push(sym);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(Symbol::normalize("  reliance ").unwrap().as_str(), "RELIANCE");
    }

    #[test]
    fn strips_exchange_prefix_and_market_suffix() {
        assert_eq!(Symbol::normalize("NSE:TCS").unwrap().as_str(), "TCS");
        assert_eq!(Symbol::normalize("infy.ns").unwrap().as_str(), "INFY");
        assert_eq!(Symbol::normalize("HDFCBANK-EQ").unwrap().as_str(), "HDFCBANK");
        assert_eq!(Symbol::normalize("nse:sbin.ns").unwrap().as_str(), "SBIN");
    }

    #[test]
    fn blank_inputs_vanish() {
        assert!(Symbol::normalize("").is_none());
        assert!(Symbol::normalize("   ").is_none());
        assert!(Symbol::normalize("NSE:").is_none());
    }

    #[test]
    fn dedup_preserves_first_seen_order() {
        let raw = ["TCS", "infy", "TCS ", "WIPRO", "INFY.NS"];
        let symbols = raw.iter().filter_map(|r| Symbol::normalize(r));
        let unique = dedup_ordered(symbols);
        let names: Vec<_> = unique.iter().map(Symbol::as_str).collect();
        assert_eq!(names, vec!["TCS", "INFY", "WIPRO"]);
    }
}
