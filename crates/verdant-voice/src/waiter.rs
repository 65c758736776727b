//! Bounded acquisition of the first participant.

use crate::room::{ParticipantHandle, Room};
use std::time::Duration;
use tracing::{info, warn};

/// Default bound on how long the agent waits for someone to join.
pub const DEFAULT_PARTICIPANT_WAIT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct ParticipantWaiter {
    timeout: Duration,
}

impl Default for ParticipantWaiter {
    fn default() -> Self {
        Self::new(DEFAULT_PARTICIPANT_WAIT)
    }
}

impl ParticipantWaiter {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Waits for the first participant, returning as soon as one is admitted.
    ///
    /// Returns `None` when the bound elapses or the room fails; neither is an
    /// error for the caller and neither is retried.
    pub async fn wait(&self, room: &dyn Room) -> Option<ParticipantHandle> {
        match tokio::time::timeout(self.timeout, room.next_participant()).await {
            Ok(Ok(participant)) => Some(participant),
            Ok(Err(e)) => {
                warn!(room = room.name(), "participant wait failed: {}", e);
                None
            }
            Err(_) => {
                info!(
                    room = room.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "no participant joined before timeout, continuing without one"
                );
                None
            }
        }
    }
}
