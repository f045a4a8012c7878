use std::sync::atomic::{AtomicU64, Ordering};

/// Sparks spent and reserved by one run.
///
/// A dispatched node reserves its table price; on completion the
/// reservation is released and the actual spend charged.
#[derive(Debug)]
pub struct SparkMeter {
    budget: u64,
    spent: AtomicU64,
    reserved: AtomicU64,
}

impl SparkMeter {
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            spent: AtomicU64::new(0),
            reserved: AtomicU64::new(0),
        }
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }

    pub fn spent(&self) -> u64 {
        self.spent.load(Ordering::Acquire)
    }

    /// Budget minus spent and reserved sparks, floored at zero.
    pub fn remaining(&self) -> u64 {
        self.budget.saturating_sub(self.spent()).saturating_sub(self.reserved.load(Ordering::Acquire))
    }

    /// Reserve `sparks` if the remaining balance covers them.
    pub fn try_reserve(
        &self,
        sparks: u64,
    ) -> bool {
        let spent = self.spent();
        self.reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |reserved| {
                let remaining = self.budget.saturating_sub(spent).saturating_sub(reserved);
                (remaining >= sparks).then_some(reserved.saturating_add(sparks))
            })
            .is_ok()
    }

    /// Drop a reservation made by [`SparkMeter::try_reserve`].
    pub fn release(
        &self,
        sparks: u64,
    ) {
        let _ = self.reserved.fetch_update(Ordering::AcqRel, Ordering::Acquire, |reserved| Some(reserved.saturating_sub(sparks)));
    }

    /// Add `sparks` to the spend, saturating at `u64::MAX`; returns the new
    /// total.
    pub fn charge(
        &self,
        sparks: u64,
    ) -> u64 {
        let previous = self.spent.fetch_update(Ordering::AcqRel, Ordering::Acquire, |spent| Some(spent.saturating_add(sparks))).unwrap_or_else(|spent| spent);
        previous.saturating_add(sparks)
    }
}
