//! Bounded process-name cache
//!
//! Resolving a pid to a display name opens a process handle, which is too
//! expensive to repeat for every connection row on every poll. Names are
//! cached per pid; when the cache fills it is cleared outright rather than
//! evicted entry-by-entry, since pids are reused quickly enough that a
//! short-lived full cache is an acceptable approximation.

use std::collections::HashMap;

/// Entries held before the cache is wiped.
const MAX_ENTRIES: usize = 500;

#[derive(Debug, Default)]
pub struct ProcessNameCache {
    names: HashMap<u32, String>,
}

impl ProcessNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `pid` to a display name, consulting the cache first.
    ///
    /// A failed lookup is cached as an empty string so the handle open is
    /// not retried on every poll. Pids 0 and 4 are fixed by the OS and
    /// never need a lookup.
    pub fn resolve<F>(&mut self, pid: u32, lookup: F) -> String
    where
        F: FnOnce(u32) -> Option<String>,
    {
        match pid {
            0 => return "System Idle Process".to_string(),
            4 => return "System".to_string(),
            _ => {}
        }

        if let Some(name) = self.names.get(&pid) {
            return name.clone();
        }

        if self.names.len() >= MAX_ENTRIES {
            self.names.clear();
        }

        let name = lookup(pid).unwrap_or_default();
        self.names.insert(pid, name.clone());
        name
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_lookups_per_pid() {
        let mut cache = ProcessNameCache::new();
        let mut calls = 0;
        for _ in 0..3 {
            let name = cache.resolve(100, |_| {
                calls += 1;
                Some("svchost.exe".to_string())
            });
            assert_eq!(name, "svchost.exe");
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn well_known_pids_skip_the_cache() {
        let mut cache = ProcessNameCache::new();
        assert_eq!(cache.resolve(0, |_| panic!("no lookup")), "System Idle Process");
        assert_eq!(cache.resolve(4, |_| panic!("no lookup")), "System");
        assert!(cache.is_empty());
    }

    #[test]
    fn failed_lookup_is_cached_as_empty() {
        let mut cache = ProcessNameCache::new();
        assert_eq!(cache.resolve(999, |_| None), "");
        // Second resolve must not call the lookup again.
        assert_eq!(cache.resolve(999, |_| panic!("no lookup")), "");
    }

    #[test]
    fn cache_clears_fully_at_the_bound() {
        let mut cache = ProcessNameCache::new();
        for pid in 1000..1500 {
            cache.resolve(pid, |p| Some(format!("proc{p}.exe")));
        }
        assert_eq!(cache.len(), 500);

        // The 501st distinct pid wipes everything, then inserts itself.
        cache.resolve(2000, |p| Some(format!("proc{p}.exe")));
        assert_eq!(cache.len(), 1);

        // An entry from before the clear is looked up fresh.
        let mut called = false;
        cache.resolve(1000, |p| {
            called = true;
            Some(format!("proc{p}.exe"))
        });
        assert!(called);
    }

    #[test]
    fn cache_never_exceeds_the_bound() {
        let mut cache = ProcessNameCache::new();
        for pid in 1..3000 {
            cache.resolve(pid, |p| Some(format!("proc{p}.exe")));
            assert!(cache.len() <= 500);
        }
    }
}
