//! Thin RAII wrapper over PDH query handles
//!
//! Counters are added by English path so the probe works on localized
//! Windows installs. A freshly opened query needs one collection before
//! formatted values mean anything; callers drive that through
//! [`CounterCell`](crate::core::counter::CounterCell).

use windows::core::PCWSTR;
use windows::Win32::System::Performance::{
    PdhAddEnglishCounterW, PdhCloseQuery, PdhCollectQueryData, PdhGetFormattedCounterValue,
    PdhOpenQueryW, PDH_FMT_COUNTERVALUE, PDH_FMT_DOUBLE, PDH_FMT_LONG,
};

use super::util::wide;

/// An open PDH query and the counters added to it.
#[derive(Debug)]
pub struct PdhQuery {
    query: isize,
    counters: Vec<isize>,
}

impl PdhQuery {
    pub fn open() -> Option<Self> {
        let mut query = 0isize;
        let status = unsafe { PdhOpenQueryW(PCWSTR::null(), 0, &mut query) };
        if status != 0 {
            return None;
        }
        Some(Self {
            query,
            counters: Vec::new(),
        })
    }

    /// Add a counter by English path; returns its slot index.
    pub fn add_counter(&mut self, path: &str) -> Option<usize> {
        let path = wide(path);
        let mut counter = 0isize;
        let status = unsafe {
            PdhAddEnglishCounterW(self.query, PCWSTR::from_raw(path.as_ptr()), 0, &mut counter)
        };
        if status != 0 {
            return None;
        }
        self.counters.push(counter);
        Some(self.counters.len() - 1)
    }

    /// Collect raw data for every counter on the query.
    pub fn collect(&self) -> bool {
        unsafe { PdhCollectQueryData(self.query) == 0 }
    }

    /// Format the last collection of a counter as a double.
    pub fn value(&self, slot: usize) -> Option<f64> {
        let counter = *self.counters.get(slot)?;
        let mut value = PDH_FMT_COUNTERVALUE::default();
        let status =
            unsafe { PdhGetFormattedCounterValue(counter, PDH_FMT_DOUBLE, None, &mut value) };
        if status != 0 {
            return None;
        }
        Some(unsafe { value.Anonymous.doubleValue })
    }

    /// Format the last collection of a counter as an integer.
    pub fn value_long(&self, slot: usize) -> Option<i32> {
        let counter = *self.counters.get(slot)?;
        let mut value = PDH_FMT_COUNTERVALUE::default();
        let status =
            unsafe { PdhGetFormattedCounterValue(counter, PDH_FMT_LONG, None, &mut value) };
        if status != 0 {
            return None;
        }
        Some(unsafe { value.Anonymous.longValue })
    }
}

impl Drop for PdhQuery {
    fn drop(&mut self) {
        unsafe {
            PdhCloseQuery(self.query);
        }
    }
}
