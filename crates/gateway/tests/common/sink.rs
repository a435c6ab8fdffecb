//! A failure sink recording every notification.

use std::sync::Arc;

use parking_lot::Mutex;

use helios_gateway::meta::{FailureEvent, FailureKind, FailureRecord, FailureSink};

/// Records every failure event it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<FailureRecord>>,
}

impl RecordingSink {
    /// Creates an empty shared sink.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns every record received so far.
    pub fn records(&self) -> Vec<FailureRecord> {
        self.records.lock().clone()
    }

    /// Returns the number of records received.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if nothing was received.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Returns the failing backend ids, in notification order.
    pub fn backend_ids(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|r| r.backend_id.clone())
            .collect()
    }

    /// Returns the number of records of a kind.
    pub fn count(&self, kind: FailureKind) -> usize {
        self.records.lock().iter().filter(|r| r.kind == kind).count()
    }
}

impl FailureSink for RecordingSink {
    fn notify(&self, event: &FailureEvent<'_>) {
        self.records.lock().push(event.to_record());
    }
}
