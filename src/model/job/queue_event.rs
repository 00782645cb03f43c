use uuid::Uuid;

/// Signals broadcast to queue observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    JobAdded(Uuid),
    JobRemoved(Uuid),
}
