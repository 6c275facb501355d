//! Lazy lifecycle for performance-counter handles
//!
//! A PDH-style counter subsystem needs one collection before it can format
//! a meaningful value, so the first read of any counter primes it and
//! reports a fallback instead of garbage. The lifecycle is explicit rather
//! than a boolean-plus-raw-handle so the priming read is visible to tests.

/// Lifecycle of a lazily opened counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterState {
    /// Never sampled; no OS handles exist yet.
    Uninitialized,
    /// Handles requested; the priming collection has not succeeded yet.
    Initializing,
    /// At least one collection succeeded; live values are available.
    Ready,
}

/// A counter backend that needs a throwaway collection before it yields
/// usable values.
pub trait CounterSource {
    type Value: Clone + Default;

    /// Open handles and issue the priming collection. Returns `true` once
    /// the subsystem is ready for formatted reads.
    fn prime(&mut self) -> bool;

    /// Collect one live value, or `None` on a transient failure.
    fn collect(&mut self) -> Option<Self::Value>;
}

/// Owns a [`CounterSource`] and its lifecycle.
///
/// The first sample primes the source and returns the default value; once
/// `Ready`, samples return the live value, or the last good one when a
/// collection fails; a monitoring read prefers stale data over an error.
pub struct CounterCell<S: CounterSource> {
    source: S,
    state: CounterState,
    last_good: S::Value,
}

impl<S: CounterSource> CounterCell<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: CounterState::Uninitialized,
            last_good: S::Value::default(),
        }
    }

    pub fn state(&self) -> CounterState {
        self.state
    }

    /// Read the counter, advancing the lifecycle as needed.
    pub fn sample(&mut self) -> S::Value {
        match self.state {
            CounterState::Uninitialized | CounterState::Initializing => {
                self.state = CounterState::Initializing;
                if self.source.prime() {
                    self.state = CounterState::Ready;
                }
                self.last_good.clone()
            }
            CounterState::Ready => {
                if let Some(value) = self.source.collect() {
                    self.last_good = value;
                }
                self.last_good.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted {
        prime_results: Vec<bool>,
        collect_results: Vec<Option<f64>>,
        primes: usize,
        collects: usize,
    }

    impl Scripted {
        fn new(prime_results: Vec<bool>, collect_results: Vec<Option<f64>>) -> Self {
            Self {
                prime_results,
                collect_results,
                primes: 0,
                collects: 0,
            }
        }
    }

    impl CounterSource for Scripted {
        type Value = f64;

        fn prime(&mut self) -> bool {
            let result = self.prime_results[self.primes];
            self.primes += 1;
            result
        }

        fn collect(&mut self) -> Option<f64> {
            let result = self.collect_results[self.collects];
            self.collects += 1;
            result
        }
    }

    #[test]
    fn first_sample_primes_and_returns_fallback() {
        let mut cell = CounterCell::new(Scripted::new(vec![true], vec![Some(42.0)]));
        assert_eq!(cell.state(), CounterState::Uninitialized);
        assert_eq!(cell.sample(), 0.0);
        assert_eq!(cell.state(), CounterState::Ready);
        assert_eq!(cell.sample(), 42.0);
    }

    #[test]
    fn failed_prime_retries_until_it_succeeds() {
        let mut cell = CounterCell::new(Scripted::new(
            vec![false, false, true],
            vec![Some(7.5)],
        ));
        assert_eq!(cell.sample(), 0.0);
        assert_eq!(cell.state(), CounterState::Initializing);
        assert_eq!(cell.sample(), 0.0);
        assert_eq!(cell.state(), CounterState::Initializing);
        assert_eq!(cell.sample(), 0.0);
        assert_eq!(cell.state(), CounterState::Ready);
        assert_eq!(cell.sample(), 7.5);
    }

    #[test]
    fn transient_failure_returns_last_good_value() {
        let mut cell = CounterCell::new(Scripted::new(
            vec![true],
            vec![Some(10.0), None, Some(20.0)],
        ));
        cell.sample(); // prime
        assert_eq!(cell.sample(), 10.0);
        assert_eq!(cell.sample(), 10.0); // failed collection, stale value
        assert_eq!(cell.sample(), 20.0);
        assert_eq!(cell.state(), CounterState::Ready);
    }
}
