// src/core/liveness/stability.rs
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_HOLD: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Searching,
    Holding { started_at: Instant },
    Triggered,
}

/// What the caller should do after feeding one frame to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    /// No aligned face, or the hold was just broken.
    Searching,
    /// Aligned, hold still running.
    Holding { seconds_left: u64 },
    /// Hold complete: capture now. Emitted once per cycle.
    Trigger,
    /// Already triggered; frames are ignored until [`StabilityGate::reset`].
    Triggered,
}

/// Turns a stream of per-frame alignment flags into a single capture
/// trigger once a face has stayed aligned for the whole hold duration.
///
/// Any misaligned frame during the hold discards the timer entirely.
#[derive(Debug, Clone)]
pub struct StabilityGate {
    hold: Duration,
    state: GateState,
}

impl Default for StabilityGate {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD)
    }
}

impl StabilityGate {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            state: GateState::Searching,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }

    pub fn is_triggered(&self) -> bool {
        self.state == GateState::Triggered
    }

    pub fn observe(&mut self, aligned: bool, now: Instant) -> GateEvent {
        match (self.state, aligned) {
            (GateState::Triggered, _) => GateEvent::Triggered,
            (_, false) => {
                self.state = GateState::Searching;
                GateEvent::Searching
            }
            (GateState::Searching, true) => {
                self.state = GateState::Holding { started_at: now };
                self.check_hold(now, now)
            }
            (GateState::Holding { started_at }, true) => self.check_hold(started_at, now),
        }
    }

    fn check_hold(&mut self, started_at: Instant, now: Instant) -> GateEvent {
        if now.saturating_duration_since(started_at) >= self.hold {
            self.state = GateState::Triggered;
            GateEvent::Trigger
        } else {
            GateEvent::Holding {
                seconds_left: self.seconds_left(now).unwrap_or(1),
            }
        }
    }

    /// Whole seconds left in the hold, rounded up and never below 1.
    /// `None` unless holding.
    pub fn seconds_left(&self, now: Instant) -> Option<u64> {
        match self.state {
            GateState::Holding { started_at } => {
                let elapsed = now.saturating_duration_since(started_at);
                let remaining = self.hold.saturating_sub(elapsed).as_millis() as u64;
                Some(((remaining + 999) / 1000).max(1))
            }
            _ => None,
        }
    }

    /// Starts a new capture cycle.
    pub fn reset(&mut self) {
        self.state = GateState::Searching;
    }
}
