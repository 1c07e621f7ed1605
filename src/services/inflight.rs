//! Guard against issuing the same loan action twice concurrently

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
};

/// Set of loan IDs with a mutating action in progress
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    loans: Arc<Mutex<HashSet<i64>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `loan_id`, or `None` if an action on it is already running.
    /// The reservation is released when the guard is dropped.
    pub fn try_acquire(&self, loan_id: i64) -> Option<InFlightGuard> {
        if self.lock().insert(loan_id) {
            Some(InFlightGuard {
                loans: Arc::clone(&self.loans),
                loan_id,
            })
        } else {
            None
        }
    }

    pub fn is_busy(&self, loan_id: i64) -> bool {
        self.lock().contains(&loan_id)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<i64>> {
        // The set stays consistent even if a holder panicked
        self.loans.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    loans: Arc<Mutex<HashSet<i64>>>,
    loan_id: i64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.loans
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.loan_id);
    }
}
