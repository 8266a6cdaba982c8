//! Recording request sink

use murmur_messages::{DelayId, DependencyRequest, RequestSink};
use parking_lot::Mutex;

/// Keeps every dependency request instead of sending it.
#[derive(Default)]
pub struct RecordingSink {
    requests: Mutex<Vec<(DelayId, DependencyRequest)>>,
}

impl RecordingSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All requests so far, in order.
    pub fn requests(&self) -> Vec<(DelayId, DependencyRequest)> {
        self.requests.lock().clone()
    }

    /// Most recent request.
    pub fn last(&self) -> Option<(DelayId, DependencyRequest)> {
        self.requests.lock().last().cloned()
    }
}

impl RequestSink for RecordingSink {
    fn send_request(&self, id: DelayId, request: DependencyRequest) {
        self.requests.lock().push((id, request));
    }
}
