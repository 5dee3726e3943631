//! Event emission: the engine's single dispatch point for sinks

use stateshift_types::{EventKind, EventRecord, EventSink, TransitionId};
use std::sync::Arc;

/// Stamps event kinds into records and hands them to the sink.
///
/// Cloned freely; all clones share the same sink.
#[derive(Clone)]
pub struct EventEmitter {
    sink: Arc<dyn EventSink>,
}

impl EventEmitter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Emit one event for a transition
    pub fn emit(&self, transition_id: &TransitionId, kind: EventKind) {
        let record = EventRecord::new(transition_id, kind);
        tracing::trace!(
            transition_id = %record.transition_id,
            event = record.kind.label(),
            "Event dispatched"
        );
        self.sink.dispatch(&record);
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stateshift_types::MemorySink;

    #[test]
    fn test_emit_stamps_id_and_time() {
        let sink = Arc::new(MemorySink::new());
        let emitter = EventEmitter::new(sink.clone());
        let id = TransitionId::new("t-1");

        emitter.emit(&id, EventKind::TransitionStarting);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].transition_id, id);
        assert_eq!(records[0].kind, EventKind::TransitionStarting);
    }

    #[test]
    fn test_clones_share_the_sink() {
        let sink = Arc::new(MemorySink::new());
        let emitter = EventEmitter::new(sink.clone());
        let clone = emitter.clone();
        let id = TransitionId::new("t-1");

        emitter.emit(&id, EventKind::TransitionStarting);
        clone.emit(&id, EventKind::TransitionCompleted);

        assert_eq!(
            sink.labels(),
            vec!["transition_starting", "transition_completed"]
        );
    }
}
