//! Append-only, hash-chained record of settled trades.
//!
//! Each entry's tag is the hex SHA-256 of the previous tag, the entry's
//! sequence number and a fixed little-endian encoding of its trade fields.
//! The ledger also remembers the head tag, so dropping entries from either
//! end is caught by [`Ledger::verify`] just like editing or reordering them.

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::market::Match;

/// Previous tag of the first entry.
pub const GENESIS_TAG: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One settled trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    /// Zero-based position in the chain.
    pub sequence: u64,
    pub round: u32,
    pub seller_id: u32,
    pub buyer_id: u32,
    pub quantity_kwh: f64,
    /// Clearing price, $/kWh.
    pub price_per_kwh: f64,
    pub total_cost: f64,
    pub latency_ms: f64,
    pub distance_m: f64,
    pub alignment: f64,
    pub prev_tag: String,
    pub tag: String,
}

impl LedgerEntry {
    /// Recomputes this entry's tag from its own fields.
    pub fn compute_tag(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.prev_tag.as_bytes());
        hasher.update(self.sequence.to_le_bytes());
        hasher.update(self.round.to_le_bytes());
        hasher.update(self.seller_id.to_le_bytes());
        hasher.update(self.buyer_id.to_le_bytes());
        for field in [
            self.quantity_kwh,
            self.price_per_kwh,
            self.total_cost,
            self.latency_ms,
            self.distance_m,
            self.alignment,
        ] {
            hasher.update(field.to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// Ways a chain can fail verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("expected sequence {expected}, found {found}")]
    SequenceGap { expected: u64, found: u64 },

    #[error("entry {sequence} does not link to its predecessor")]
    BrokenLink { sequence: u64 },

    #[error("entry {sequence} tag does not match its contents")]
    TagMismatch { sequence: u64 },

    #[error("chain does not end at the recorded head")]
    HeadMismatch,
}

/// The trade ledger for one run.
#[derive(Debug, Clone)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
    head: String,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            head: GENESIS_TAG.to_string(),
        }
    }

    /// Records a settled match and returns the new entry.
    pub fn append(&mut self, settled: &Match) -> &LedgerEntry {
        let mut entry = LedgerEntry {
            sequence: self.entries.len() as u64,
            round: settled.round,
            seller_id: settled.seller_id,
            buyer_id: settled.buyer_id,
            quantity_kwh: settled.quantity_kwh,
            price_per_kwh: settled.clearing_price,
            total_cost: settled.total_cost(),
            latency_ms: settled.latency_ms,
            distance_m: settled.distance_m,
            alignment: settled.alignment,
            prev_tag: self.head.clone(),
            tag: String::new(),
        };
        entry.tag = entry.compute_tag();
        self.head = entry.tag.clone();
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Tag of the newest entry, or [`GENESIS_TAG`] when empty.
    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recomputes the whole chain.
    pub fn verify(&self) -> Result<(), LedgerError> {
        verify_chain(&self.entries, &self.head)
    }
}

/// Checks that `entries` form an unbroken chain from genesis to `head`.
pub fn verify_chain(entries: &[LedgerEntry], head: &str) -> Result<(), LedgerError> {
    let mut prev = GENESIS_TAG;
    for (i, entry) in entries.iter().enumerate() {
        let expected = i as u64;
        if entry.sequence != expected {
            return Err(LedgerError::SequenceGap {
                expected,
                found: entry.sequence,
            });
        }
        if entry.prev_tag != prev {
            return Err(LedgerError::BrokenLink {
                sequence: entry.sequence,
            });
        }
        if entry.compute_tag() != entry.tag {
            return Err(LedgerError::TagMismatch {
                sequence: entry.sequence,
            });
        }
        prev = &entry.tag;
    }
    if prev != head {
        return Err(LedgerError::HeadMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(round: u32, seller_id: u32, buyer_id: u32) -> Match {
        Match {
            round,
            seller_id,
            buyer_id,
            quantity_kwh: 1.5,
            ask_price: 0.14,
            bid_price: 0.22,
            clearing_price: 0.18,
            latency_ms: 31.2,
            distance_m: 6.0,
            alignment: 0.9,
        }
    }

    fn ledger_of(n: u32) -> Ledger {
        let mut ledger = Ledger::new();
        for i in 0..n {
            ledger.append(&trade(i + 1, i, i + 1));
        }
        ledger
    }

    #[test]
    fn empty_ledger_verifies() {
        let ledger = Ledger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.head(), GENESIS_TAG);
        assert_eq!(ledger.verify(), Ok(()));
    }

    #[test]
    fn entries_chain_to_their_predecessor() {
        let ledger = ledger_of(3);
        let e = ledger.entries();
        assert_eq!(e[0].prev_tag, GENESIS_TAG);
        assert_eq!(e[1].prev_tag, e[0].tag);
        assert_eq!(e[2].prev_tag, e[1].tag);
        assert_eq!(ledger.head(), e[2].tag);
        assert_eq!(e[2].sequence, 2);
        assert_eq!(e[0].tag.len(), 64);
        assert!((e[0].total_cost - 0.27).abs() < 1e-12);
        assert_eq!(ledger.verify(), Ok(()));
    }

    #[test]
    fn same_trades_give_same_tags() {
        assert_eq!(ledger_of(4).head(), ledger_of(4).head());
    }

    #[test]
    fn edited_field_is_detected() {
        let ledger = ledger_of(3);
        let mut entries = ledger.entries().to_vec();
        entries[1].quantity_kwh += 0.001;
        assert_eq!(
            verify_chain(&entries, ledger.head()),
            Err(LedgerError::TagMismatch { sequence: 1 })
        );
    }

    #[test]
    fn rehashed_edit_breaks_the_next_link() {
        let ledger = ledger_of(3);
        let mut entries = ledger.entries().to_vec();
        entries[1].price_per_kwh = 0.5;
        entries[1].tag = entries[1].compute_tag();
        assert_eq!(
            verify_chain(&entries, ledger.head()),
            Err(LedgerError::BrokenLink { sequence: 2 })
        );
    }

    #[test]
    fn tail_truncation_is_detected() {
        let ledger = ledger_of(3);
        let entries = &ledger.entries()[..2];
        assert_eq!(
            verify_chain(entries, ledger.head()),
            Err(LedgerError::HeadMismatch)
        );
        assert_eq!(verify_chain(&[], ledger.head()), Err(LedgerError::HeadMismatch));
    }

    #[test]
    fn front_truncation_is_detected() {
        let ledger = ledger_of(3);
        assert_eq!(
            verify_chain(&ledger.entries()[1..], ledger.head()),
            Err(LedgerError::SequenceGap {
                expected: 0,
                found: 1
            })
        );
    }

    #[test]
    fn reordering_is_detected() {
        let ledger = ledger_of(3);
        let mut entries = ledger.entries().to_vec();
        entries.swap(0, 1);
        assert!(matches!(
            verify_chain(&entries, ledger.head()),
            Err(LedgerError::SequenceGap { .. })
        ));
    }
}
