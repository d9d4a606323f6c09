use std::{sync::Arc, time::Duration};

use log::info;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time,
};

use crate::voice::duration::extract_duration_secs;

use super::state::{TickOutcome, TimerState, TimerStatus};

#[derive(Debug, Clone)]
pub enum TimerEvent {
    StateChanged(TimerState),
    /// Emitted exactly once per countdown run, when remaining time hits zero.
    Completed,
}

/// The single mutation entry point for timer state.
///
/// Three independently-clocked triggers feed this coordinator: the 1 Hz tick,
/// recognized-speech intents, and direct UI calls. Every transition — and the
/// ticker's decision whether to keep ticking — happens under one mutex, so a
/// tick can never apply to a state that a concurrent pause or step change
/// already superseded.
#[derive(Clone)]
pub struct TimerCoordinator {
    state: Arc<Mutex<TimerState>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    events: broadcast::Sender<TimerEvent>,
}

impl TimerCoordinator {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            state: Arc::new(Mutex::new(TimerState::new())),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub async fn get_state(&self) -> TimerState {
        self.state.lock().await.clone()
    }

    /// The cursor moved: cancel any in-flight countdown unconditionally and
    /// re-derive Armed/Idle from the new step's instruction.
    pub async fn on_step_changed(&self, instruction: &str) -> TimerState {
        self.cancel_ticker().await;

        let snapshot = {
            let mut state = self.state.lock().await;
            match extract_duration_secs(instruction) {
                Some(secs) => state.arm(secs),
                None => state.clear(),
            }
            state.clone()
        };

        self.emit_state(&snapshot);
        snapshot
    }

    /// Start the armed countdown. Returns (state, started); starting a timer
    /// that is already running (or has nothing armed) leaves it untouched.
    pub async fn start(&self) -> (TimerState, bool) {
        let (snapshot, started) = {
            let mut state = self.state.lock().await;
            let started = state.start();
            (state.clone(), started)
        };

        if started {
            info!(
                "Timer started: {} seconds on the clock",
                snapshot.total_secs
            );
            self.spawn_ticker().await;
            self.emit_state(&snapshot);
        }

        (snapshot, started)
    }

    pub async fn pause(&self) -> (TimerState, bool) {
        let (snapshot, paused) = {
            let mut state = self.state.lock().await;
            let paused = state.pause();
            (state.clone(), paused)
        };

        if paused {
            self.emit_state(&snapshot);
        }
        (snapshot, paused)
    }

    pub async fn resume(&self) -> (TimerState, bool) {
        let (snapshot, resumed) = {
            let mut state = self.state.lock().await;
            let resumed = state.resume();
            (state.clone(), resumed)
        };

        if resumed {
            self.emit_state(&snapshot);
        }
        (snapshot, resumed)
    }

    /// Explicit stop: remaining time resets to the full duration, state
    /// returns to Armed.
    pub async fn stop(&self) -> TimerState {
        self.cancel_ticker().await;

        let snapshot = {
            let mut state = self.state.lock().await;
            state.reset();
            state.clone()
        };

        self.emit_state(&snapshot);
        snapshot
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            // The first tick of a tokio interval fires immediately; skip it so
            // the countdown loses its first second a full second after start.
            interval.tick().await;

            loop {
                interval.tick().await;

                let (outcome, snapshot) = {
                    let mut guard = state.lock().await;
                    let outcome = guard.tick();
                    (outcome, guard.clone())
                };

                match outcome {
                    TickOutcome::Ticked => {
                        let _ = events.send(TimerEvent::StateChanged(snapshot));
                    }
                    TickOutcome::Skipped => {}
                    TickOutcome::Completed => {
                        info!("Timer completed");
                        let _ = events.send(TimerEvent::StateChanged(snapshot));
                        let _ = events.send(TimerEvent::Completed);
                        break;
                    }
                    TickOutcome::Detached => break,
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    fn emit_state(&self, snapshot: &TimerState) {
        let _ = self.events.send(TimerEvent::StateChanged(snapshot.clone()));
    }
}

impl Default for TimerCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn countdown_decrements_once_per_second() {
        let timer = TimerCoordinator::new();
        timer.on_step_changed("bake for 20 minutes").await;

        let (state, started) = timer.start().await;
        assert!(started);
        assert_eq!(state.total_secs, 1200);
        assert_eq!(state.status, TimerStatus::Running);
        tokio::task::yield_now().await;

        time::advance(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;

        let state = timer.get_state().await;
        assert_eq!(state.remaining_secs, 1197);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_timer_holds_remaining_time() {
        let timer = TimerCoordinator::new();
        timer.on_step_changed("simmer for 2 minutes").await;
        timer.start().await;

        time::advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        let (state, paused) = timer.pause().await;
        assert!(paused);
        let held = state.remaining_secs;

        time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        assert_eq!(timer.get_state().await.remaining_secs, held);

        let (_, resumed) = timer.resume().await;
        assert!(resumed);
        time::advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(timer.get_state().await.remaining_secs, held - 2);
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_does_not_double_schedule() {
        let timer = TimerCoordinator::new();
        timer.on_step_changed("boil for 10 minutes").await;

        let (_, first) = timer.start().await;
        let (_, second) = timer.start().await;
        assert!(first);
        assert!(!second);
        tokio::task::yield_now().await;

        time::advance(Duration::from_secs(4)).await;
        tokio::task::yield_now().await;

        // One decrement per second even after the redundant start.
        assert_eq!(timer.get_state().await.remaining_secs, 600 - 4);
    }

    #[tokio::test(start_paused = true)]
    async fn step_change_cancels_countdown_mid_run() {
        let timer = TimerCoordinator::new();
        timer.on_step_changed("cook for 5 minutes").await;
        timer.start().await;

        time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;

        let state = timer.on_step_changed("bake for 20 minutes").await;
        assert_eq!(state.status, TimerStatus::Armed);
        assert_eq!(state.remaining_secs, 1200);

        // The old ticker is gone: time passing no longer decrements.
        time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(timer.get_state().await.remaining_secs, 1200);
    }

    #[tokio::test(start_paused = true)]
    async fn step_without_duration_goes_idle() {
        let timer = TimerCoordinator::new();
        timer.on_step_changed("simmer for 3 minutes").await;
        timer.start().await;

        let state = timer.on_step_changed("Season to taste").await;
        assert_eq!(state.status, TimerStatus::Idle);

        let (_, started) = timer.start().await;
        assert!(!started);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_emits_exactly_one_signal() {
        let timer = TimerCoordinator::new();
        let mut events = timer.subscribe();
        timer.on_step_changed("boil for 1 minute").await;
        timer.start().await;
        tokio::task::yield_now().await;

        time::advance(Duration::from_secs(90)).await;
        tokio::task::yield_now().await;

        let state = timer.get_state().await;
        assert_eq!(state.status, TimerStatus::Completed);
        assert_eq!(state.remaining_secs, 0);

        // The receiver lags behind the per-second StateChanged stream; skip
        // past the lag marker, the Completed event is among the retained tail.
        let mut completions = 0;
        loop {
            match events.try_recv() {
                Ok(TimerEvent::Completed) => completions += 1,
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => break,
            }
        }
        assert_eq!(completions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_rearms_with_full_duration() {
        let timer = TimerCoordinator::new();
        timer.on_step_changed("bake for 10 minutes").await;
        timer.start().await;

        time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;

        let state = timer.stop().await;
        assert_eq!(state.status, TimerStatus::Armed);
        assert_eq!(state.remaining_secs, 600);
    }
}
