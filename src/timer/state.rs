use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    /// No duration could be extracted from the current step.
    Idle,
    /// A duration is loaded and waiting for a start command.
    Armed,
    Running,
    Paused,
    Completed,
}

impl Default for TimerStatus {
    fn default() -> Self {
        TimerStatus::Idle
    }
}

/// Outcome of one clock tick, decided under the same lock that guards the
/// state itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One second elapsed; countdown continues.
    Ticked,
    /// Timer is paused; nothing was decremented.
    Skipped,
    /// The countdown just reached zero.
    Completed,
    /// The timer left the running/paused states; the ticker should exit.
    Detached,
}

/// Countdown state for the current step. A timer belongs to a step, not to
/// the session: a cursor move rebuilds this wholesale, while start/pause/
/// resume mutate it in place without touching the remaining time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub status: TimerStatus,
    pub total_secs: u32,
    pub remaining_secs: u32,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a fresh duration for a new step.
    pub fn arm(&mut self, total_secs: u32) {
        *self = Self {
            status: TimerStatus::Armed,
            total_secs,
            remaining_secs: total_secs,
        };
    }

    /// Drop back to Idle (step without a duration).
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Armed -> Running. Starting an already-running timer is a no-op.
    pub fn start(&mut self) -> bool {
        if self.status == TimerStatus::Armed {
            self.status = TimerStatus::Running;
            true
        } else {
            false
        }
    }

    /// Running -> Paused; no-op from any other state.
    pub fn pause(&mut self) -> bool {
        if self.status == TimerStatus::Running {
            self.status = TimerStatus::Paused;
            true
        } else {
            false
        }
    }

    /// Paused -> Running; no-op from any other state.
    pub fn resume(&mut self) -> bool {
        if self.status == TimerStatus::Paused {
            self.status = TimerStatus::Running;
            true
        } else {
            false
        }
    }

    /// Explicit stop: remaining time resets to the full duration and the
    /// timer re-arms (or clears, when there was no duration).
    pub fn reset(&mut self) {
        if self.total_secs > 0 {
            let total = self.total_secs;
            self.arm(total);
        } else {
            self.clear();
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        match self.status {
            TimerStatus::Running => {
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                if self.remaining_secs == 0 {
                    self.status = TimerStatus::Completed;
                    TickOutcome::Completed
                } else {
                    TickOutcome::Ticked
                }
            }
            TimerStatus::Paused => TickOutcome::Skipped,
            _ => TickOutcome::Detached,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(total: u32) -> TimerState {
        let mut state = TimerState::new();
        state.arm(total);
        assert!(state.start());
        state
    }

    #[test]
    fn start_requires_armed() {
        let mut state = TimerState::new();
        assert!(!state.start());

        state.arm(120);
        assert!(state.start());
        // Starting an already-running timer is a no-op.
        assert!(!state.start());
        assert_eq!(state.status, TimerStatus::Running);
    }

    #[test]
    fn tick_while_paused_never_decrements() {
        let mut state = running(120);
        assert!(state.pause());

        for _ in 0..10 {
            assert_eq!(state.tick(), TickOutcome::Skipped);
        }
        assert_eq!(state.remaining_secs, 120);

        assert!(state.resume());
        assert_eq!(state.tick(), TickOutcome::Ticked);
        assert_eq!(state.remaining_secs, 119);
    }

    #[test]
    fn countdown_completes_exactly_once() {
        let mut state = running(2);
        assert_eq!(state.tick(), TickOutcome::Ticked);
        assert_eq!(state.tick(), TickOutcome::Completed);
        // A stray late tick sees a detached timer, not a second completion.
        assert_eq!(state.tick(), TickOutcome::Detached);
    }

    #[test]
    fn pause_and_resume_are_noops_outside_their_states() {
        let mut state = TimerState::new();
        assert!(!state.pause());
        assert!(!state.resume());

        state.arm(60);
        assert!(!state.pause());
        assert!(!state.resume());
        assert_eq!(state.status, TimerStatus::Armed);
    }

    #[test]
    fn reset_restores_full_duration() {
        let mut state = running(60);
        state.tick();
        state.tick();
        assert_eq!(state.remaining_secs, 58);

        state.reset();
        assert_eq!(state.status, TimerStatus::Armed);
        assert_eq!(state.remaining_secs, 60);
    }

    #[test]
    fn arm_replaces_any_prior_state_mid_countdown() {
        let mut state = running(60);
        state.tick();

        state.arm(300);
        assert_eq!(state.status, TimerStatus::Armed);
        assert_eq!(state.remaining_secs, 300);

        state.clear();
        assert_eq!(state.status, TimerStatus::Idle);
        assert_eq!(state.total_secs, 0);
    }
}
