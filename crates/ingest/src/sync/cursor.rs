use std::collections::HashSet;

use chrono::{DateTime, Utc};

/// Paging state of one pass over one account's match feed.
///
/// Lives for a single pass and is never shared between accounts.
#[derive(Debug, Clone)]
pub struct SyncCursor {
    since: Option<DateTime<Utc>>,
    known: HashSet<String>,
    offset: usize,
}

impl SyncCursor {
    /// Cursor for the incremental pass: starts at the last successful sync, or
    /// `lookback` before `now` when the account was never synced.
    pub fn incremental(
        last_synced_at: Option<DateTime<Utc>>,
        known: HashSet<String>,
        lookback: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            since: Some(last_synced_at.unwrap_or(now - lookback)),
            known,
            offset: 0,
        }
    }

    /// Cursor for the older-history pass, unbounded in time.
    pub fn backfill(known: HashSet<String>) -> Self {
        Self {
            since: None,
            known,
            offset: 0,
        }
    }

    pub fn since(&self) -> Option<DateTime<Utc>> {
        self.since
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_known(&self, match_id: &str) -> bool {
        self.known.contains(match_id)
    }

    pub fn mark_known(&mut self, match_id: &str) {
        self.known.insert(match_id.to_string());
    }

    /// Move past a page that was fetched and processed.
    pub fn advance(&mut self, page_len: usize) {
        self.offset += page_len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incremental_since() {
        let now = Utc::now();
        let lookback = chrono::Duration::days(30);

        let fresh = SyncCursor::incremental(None, HashSet::new(), lookback, now);
        assert_eq!(fresh.since(), Some(now - lookback));

        let last = now - chrono::Duration::hours(2);
        let synced = SyncCursor::incremental(Some(last), HashSet::new(), lookback, now);
        assert_eq!(synced.since(), Some(last));
    }

    #[test]
    fn test_known_and_advance() {
        let mut cursor = SyncCursor::backfill(HashSet::from(["a".to_string()]));
        assert!(cursor.since().is_none());
        assert!(cursor.is_known("a"));
        assert!(!cursor.is_known("b"));

        cursor.mark_known("b");
        cursor.advance(20);
        assert!(cursor.is_known("b"));
        assert_eq!(cursor.offset(), 20);
    }
}
