/// Counts records fetched since the query window was last rebased.
///
/// The source refuses to page past a fixed number of results for one query, so once `limit`
/// records have been observed the next fetch must start a fresh window.
#[derive(Debug, Clone)]
pub struct QueryWindow {
    limit: u64,
    observed: u64,
}

impl QueryWindow {
    pub fn new(limit: u64) -> Self {
        Self { limit, observed: 0 }
    }

    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// Record a fetched batch. Returns `true` when the window is exhausted; the counter is
    /// zeroed and the caller must rebase its query cursor.
    pub fn observe(&mut self, records: u64) -> bool {
        self.observed += records;
        if self.observed >= self.limit {
            self.observed = 0;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resets_when_limit_is_reached() {
        let mut window = QueryWindow::new(5);
        assert!(!window.observe(2));
        assert!(!window.observe(2));
        assert_eq!(window.observed(), 4);
        assert!(window.observe(2));
        assert_eq!(window.observed(), 0);
        assert!(!window.observe(2));
    }

    #[test]
    fn exact_limit_triggers_reset() {
        let mut window = QueryWindow::new(4);
        assert!(window.observe(4));
    }
}
