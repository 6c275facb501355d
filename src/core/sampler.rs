//! Cumulative-counter rate sampling
//!
//! Network throughput and per-process CPU are derived values: the OS only
//! reports counters that grow over the life of an entity, so a per-second
//! rate needs the previous observation and the elapsed time since it.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;
use tracing::debug;

/// Shortest interval accepted for rate computation, in seconds.
const MIN_INTERVAL_SECS: f64 = 0.1;

/// Interval substituted on the first poll or when polls arrive back-to-back.
const SUBSTITUTE_INTERVAL_SECS: f64 = 1.0;

/// One second of process CPU time in 100-nanosecond ticks.
const TICKS_PER_SEC: f64 = 10_000_000.0;

/// Converts successive cumulative-counter snapshots into per-second rates.
///
/// Keys identify the monitored entity (interface index, pid); each entity
/// carries `N` counters that never decrease while it lives. The sampler
/// keeps exactly one previous sample per key and replaces the whole store
/// on every poll, so entities that disappear are forgotten immediately.
#[derive(Debug)]
pub struct RateSampler<K, const N: usize> {
    store: HashMap<K, [u64; N]>,
    last_poll: Option<Instant>,
}

impl<K: Eq + Hash + Clone, const N: usize> RateSampler<K, N> {
    pub fn new() -> Self {
        Self {
            store: HashMap::new(),
            last_poll: None,
        }
    }

    /// Compute per-second rates for every entity in `snapshot`.
    ///
    /// Entities seen for the first time report zero. A counter that moved
    /// backwards (wrap, or a recreated entity reusing the key) also reports
    /// zero rather than a negative rate.
    ///
    /// When less than 100 ms elapsed since the previous poll, the rate is
    /// computed as if one full second had passed. The result then equals
    /// the raw delta and is an approximation, not a precise rate; dividing
    /// by a near-zero interval would be worse.
    pub fn poll(
        &mut self,
        snapshot: HashMap<K, [u64; N]>,
        now: Instant,
    ) -> HashMap<K, [f64; N]> {
        let dt = match self.last_poll {
            Some(prev) => {
                let secs = now.saturating_duration_since(prev).as_secs_f64();
                if secs < MIN_INTERVAL_SECS {
                    SUBSTITUTE_INTERVAL_SECS
                } else {
                    secs
                }
            }
            None => SUBSTITUTE_INTERVAL_SECS,
        };

        let mut rates = HashMap::with_capacity(snapshot.len());
        for (key, current) in &snapshot {
            let mut rate = [0.0f64; N];
            if let Some(prev) = self.store.get(key) {
                for i in 0..N {
                    if current[i] >= prev[i] {
                        rate[i] = (current[i] - prev[i]) as f64 / dt;
                    } else {
                        // Counter wrap or entity recreated under the same key.
                        debug!("cumulative counter decreased, clamping rate to 0");
                    }
                }
            }
            rates.insert(key.clone(), rate);
        }

        self.store = snapshot;
        self.last_poll = Some(now);
        rates
    }

    /// Whether a previous sample is held for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.store.contains_key(key)
    }

    /// Number of entities currently tracked.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl<K: Eq + Hash + Clone, const N: usize> Default for RateSampler<K, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn kernel/user tick rates into a 0-100 CPU percentage.
///
/// Process times are reported in 100-nanosecond units and accumulate on
/// every logical core, so the combined tick rate is normalized by core
/// count before scaling. Only the process-CPU family uses this; byte rates
/// are reported as-is.
pub fn cpu_percent(tick_rates: [f64; 2], logical_cores: usize) -> f64 {
    if logical_cores == 0 {
        return 0.0;
    }
    let combined = tick_rates[0] + tick_rates[1];
    let percent = combined / (TICKS_PER_SEC * logical_cores as f64) * 100.0;
    percent.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn snap(entries: &[(u32, [u64; 2])]) -> HashMap<u32, [u64; 2]> {
        entries.iter().copied().collect()
    }

    #[test]
    fn first_poll_reports_zero() {
        let mut sampler: RateSampler<u32, 2> = RateSampler::new();
        let rates = sampler.poll(snap(&[(1, [1_000_000, 42])]), Instant::now());
        assert_eq!(rates[&1], [0.0, 0.0]);
    }

    #[test]
    fn rate_matches_delta_over_elapsed() {
        let mut sampler: RateSampler<u32, 2> = RateSampler::new();
        let t0 = Instant::now();
        sampler.poll(snap(&[(1, [1000, 500])]), t0);
        let rates = sampler.poll(snap(&[(1, [3000, 1500])]), t0 + Duration::from_secs(2));
        assert!((rates[&1][0] - 1000.0).abs() < 1e-9);
        assert!((rates[&1][1] - 500.0).abs() < 1e-9);
    }

    #[test]
    fn negative_delta_clamps_to_zero() {
        let mut sampler: RateSampler<u32, 2> = RateSampler::new();
        let t0 = Instant::now();
        sampler.poll(snap(&[(1, [5000, 5000])]), t0);
        let rates = sampler.poll(snap(&[(1, [100, 6000])]), t0 + Duration::from_secs(1));
        assert_eq!(rates[&1][0], 0.0);
        assert!((rates[&1][1] - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn sub_threshold_interval_substitutes_one_second() {
        let mut sampler: RateSampler<u32, 2> = RateSampler::new();
        let t0 = Instant::now();
        sampler.poll(snap(&[(1, [2000, 0])]), t0);
        // 50 ms elapsed: rate equals the raw delta, as if dt were 1 s.
        let rates = sampler.poll(snap(&[(1, [2100, 0])]), t0 + Duration::from_millis(50));
        assert!((rates[&1][0] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn store_is_replaced_wholesale() {
        let mut sampler: RateSampler<u32, 2> = RateSampler::new();
        let t0 = Instant::now();
        sampler.poll(snap(&[(1, [100, 0]), (2, [200, 0])]), t0);
        assert!(sampler.contains(&2));

        // Key 2 gone: dropped from the store, not retained.
        sampler.poll(snap(&[(1, [150, 0])]), t0 + Duration::from_secs(1));
        assert!(!sampler.contains(&2));
        assert_eq!(sampler.len(), 1);

        // Key 2 back: treated as first observation.
        let rates = sampler.poll(
            snap(&[(1, [200, 0]), (2, [9999, 0])]),
            t0 + Duration::from_secs(2),
        );
        assert_eq!(rates[&2], [0.0, 0.0]);
        assert!((rates[&1][0] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn worked_example_interface_rates() {
        // eth0: 1000 B at t=0, 2000 B at t=1.0 -> 1000 B/s;
        // 2100 B at t=1.05 (dt 0.05 < 0.1) -> raw delta 100 B/s.
        let mut sampler: RateSampler<u32, 2> = RateSampler::new();
        let t0 = Instant::now();
        sampler.poll(snap(&[(7, [1000, 0])]), t0);
        let rates = sampler.poll(snap(&[(7, [2000, 0])]), t0 + Duration::from_secs(1));
        assert!((rates[&7][0] - 1000.0).abs() < 1e-9);
        let rates = sampler.poll(snap(&[(7, [2100, 0])]), t0 + Duration::from_millis(1050));
        assert!((rates[&7][0] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn cpu_percent_normalizes_and_clamps() {
        // One full second of ticks on one core of four: 25%.
        let pct = cpu_percent([TICKS_PER_SEC, 0.0], 4);
        assert!((pct - 25.0).abs() < 1e-9);

        // Kernel and user combine.
        let pct = cpu_percent([TICKS_PER_SEC / 2.0, TICKS_PER_SEC / 2.0], 4);
        assert!((pct - 25.0).abs() < 1e-9);

        // Multi-core tick accounting can exceed the window: clamp to 100.
        let pct = cpu_percent([TICKS_PER_SEC * 64.0, TICKS_PER_SEC * 64.0], 4);
        assert_eq!(pct, 100.0);

        assert_eq!(cpu_percent([0.0, 0.0], 4), 0.0);
        assert_eq!(cpu_percent([TICKS_PER_SEC, 0.0], 0), 0.0);
    }
}
