//! Run-wide error accumulation

use crate::error::{BenchError, ErrorKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, warn};

/// Shared, append-only error list. Cloning shares the same list.
#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
    errors: Arc<Mutex<Vec<BenchError>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub total: usize,
    pub by_kind: BTreeMap<ErrorKind, usize>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, err: BenchError) {
        if err.is_critical() {
            error!("{}", err);
        } else {
            warn!("{}", err);
        }
        self.errors.lock().push(err);
    }

    pub fn extend(&self, errors: impl IntoIterator<Item = BenchError>) {
        for err in errors {
            self.record(err);
        }
    }

    pub fn snapshot(&self) -> Vec<BenchError> {
        self.errors.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().is_empty()
    }

    pub fn count(&self, kind: ErrorKind) -> usize {
        self.errors.lock().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn has_critical(&self) -> bool {
        self.errors.lock().iter().any(BenchError::is_critical)
    }

    pub fn summary(&self) -> ErrorSummary {
        let errors = self.errors.lock();
        let mut by_kind = BTreeMap::new();
        for err in errors.iter() {
            *by_kind.entry(err.kind()).or_insert(0) += 1;
        }
        ErrorSummary {
            total: errors.len(),
            by_kind,
        }
    }
}
