use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::types::WorkspaceHealthReport;

/// Short-lived per-workspace report cache.
///
/// Entries expire `ttl` after insertion. Capacity is bounded: inserting a
/// new key into a full cache evicts the oldest entry first.
pub struct ReportCache {
    ttl: Duration,
    capacity: usize,
    /// workspace id → (inserted at, report)
    entries: Mutex<HashMap<String, (Instant, WorkspaceHealthReport)>>,
}

impl ReportCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fresh report for `workspace_id`, if any. Expired entries are dropped
    /// on read.
    pub fn get(&self, workspace_id: &str) -> Option<WorkspaceHealthReport> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(workspace_id) {
            Some((at, report)) if at.elapsed() < self.ttl => Some(report.clone()),
            Some(_) => {
                entries.remove(workspace_id);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, workspace_id: &str, report: WorkspaceHealthReport) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if !entries.contains_key(workspace_id) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, (at, _))| *at)
                .map(|(k, _)| k.clone());
            if let Some(key) = oldest {
                entries.remove(&key);
            }
        }
        entries.insert(workspace_id.to_string(), (Instant::now(), report));
    }

    pub fn invalidate(&self, workspace_id: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(workspace_id);
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, (at, _)| at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn report(id: &str) -> WorkspaceHealthReport {
        WorkspaceHealthReport {
            workspace_id: id.into(),
            is_healthy: true,
            overall_score: 100.0,
            issues: Vec::new(),
            recommended_actions: Vec::new(),
            can_auto_recover: false,
            recovery_strategies: Vec::new(),
            last_check_time: "2026-01-01T00:00:00.000Z".into(),
            next_check_recommended: "2026-01-01T00:05:00.000Z".into(),
        }
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = ReportCache::new(Duration::from_secs(60), 8);
        cache.set("ws", report("ws"));
        assert_eq!(cache.get("ws"), Some(report("ws")));
        assert!(cache.get("other").is_none());
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = ReportCache::new(Duration::from_millis(30), 8);
        cache.set("ws", report("ws"));
        thread::sleep(Duration::from_millis(40));
        assert!(cache.get("ws").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = ReportCache::new(Duration::from_secs(60), 2);
        cache.set("a", report("a"));
        thread::sleep(Duration::from_millis(2));
        cache.set("b", report("b"));
        thread::sleep(Duration::from_millis(2));
        cache.set("c", report("c"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = ReportCache::new(Duration::from_secs(60), 2);
        cache.set("a", report("a"));
        cache.set("b", report("b"));
        cache.set("a", report("a"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn test_invalidate_and_prune() {
        let cache = ReportCache::new(Duration::from_millis(30), 8);
        cache.set("a", report("a"));
        cache.set("b", report("b"));
        cache.invalidate("a");
        assert_eq!(cache.len(), 1);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.prune_expired(), 1);
        assert!(cache.is_empty());
    }
}
