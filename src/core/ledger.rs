/// Bounded, insertion-ordered stores for alerted pairs and emitted calls
///
/// Both evict strictly oldest-first once full.

use std::collections::{HashSet, VecDeque};

use crate::core::types::CallRecord;

/// Membership cache of pair addresses that already produced a call.
#[derive(Debug, Clone)]
pub struct AlertLedger {
    capacity: usize,
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl AlertLedger {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
        }
    }

    pub fn contains(&self, pair_address: &str) -> bool {
        self.members.contains(pair_address)
    }

    /// Record a pair address. Returns the evicted address when the ledger was full.
    /// Re-inserting a known address is a no-op and keeps its original position.
    pub fn insert(&mut self, pair_address: &str) -> Option<String> {
        if self.members.contains(pair_address) {
            return None;
        }

        self.order.push_back(pair_address.to_string());
        self.members.insert(pair_address.to_string());

        if self.order.len() > self.capacity {
            let evicted = self.order.pop_front()?;
            self.members.remove(&evicted);
            return Some(evicted);
        }
        None
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}

/// Ordered ledger of promoted calls kept for performance tracking.
#[derive(Debug, Clone)]
pub struct CallHistory {
    capacity: usize,
    records: VecDeque<CallRecord>,
}

impl CallHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a call. Returns the evicted record when the history was full.
    pub fn push(&mut self, record: CallRecord) -> Option<CallRecord> {
        self.records.push_back(record);
        if self.records.len() > self.capacity {
            return self.records.pop_front();
        }
        None
    }

    pub fn latest(&self) -> Option<&CallRecord> {
        self.records.back()
    }

    /// Copy of every record, oldest first.
    pub fn snapshot(&self) -> Vec<CallRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CallRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Tier;
    use chrono::Utc;

    fn record(n: usize) -> CallRecord {
        CallRecord {
            token_address: format!("token-{}", n),
            pair_address: format!("pair-{}", n),
            symbol: format!("T{}", n),
            name: format!("Token {}", n),
            initial_price: 1.0 + n as f64,
            called_at: Utc::now(),
            tier: Tier::FirstCall,
        }
    }

    #[test]
    fn test_ledger_evicts_oldest_first() {
        let mut ledger = AlertLedger::new(100);

        for i in 0..100 {
            assert_eq!(ledger.insert(&format!("pair-{}", i)), None);
        }
        assert_eq!(ledger.len(), 100);

        assert_eq!(ledger.insert("pair-100"), Some("pair-0".to_string()));
        assert_eq!(ledger.insert("pair-101"), Some("pair-1".to_string()));
        assert_eq!(ledger.len(), 100);
        assert!(!ledger.contains("pair-0"));
        assert!(!ledger.contains("pair-1"));
        assert!(ledger.contains("pair-2"));
        assert!(ledger.contains("pair-101"));
        assert_eq!(ledger.iter().next(), Some("pair-2"));
    }

    #[test]
    fn test_ledger_duplicate_insert_is_noop() {
        let mut ledger = AlertLedger::new(2);
        ledger.insert("a");
        ledger.insert("b");
        assert_eq!(ledger.insert("a"), None);
        assert_eq!(ledger.len(), 2);

        // "a" kept its original slot, so it is still the oldest
        assert_eq!(ledger.insert("c"), Some("a".to_string()));
    }

    #[test]
    fn test_history_bounded_and_ordered() {
        let mut history = CallHistory::new(50);

        for i in 0..75 {
            history.push(record(i));
            assert!(history.len() <= 50);
        }

        assert_eq!(history.len(), 50);
        assert_eq!(history.iter().next().unwrap().pair_address, "pair-25");
        assert_eq!(history.latest().unwrap().pair_address, "pair-74");

        let snapshot = history.snapshot();
        let addresses: Vec<&str> = snapshot.iter().map(|r| r.pair_address.as_str()).collect();
        let expected: Vec<String> = (25..75).map(|i| format!("pair-{}", i)).collect();
        assert_eq!(addresses, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_history_push_returns_evicted() {
        let mut history = CallHistory::new(1);
        assert!(history.push(record(1)).is_none());
        assert_eq!(history.push(record(2)).unwrap().pair_address, "pair-1");
    }

    #[test]
    fn test_clear() {
        let mut ledger = AlertLedger::new(3);
        ledger.insert("a");
        ledger.clear();
        assert!(ledger.is_empty());
        assert!(!ledger.contains("a"));

        let mut history = CallHistory::new(3);
        history.push(record(1));
        history.clear();
        assert!(history.is_empty());
    }
}
