//! Action/timer controller
//!
//! Turns the actions declared by a frame into periodic or toggled
//! transmissions. Each timed action is a small state machine (Idle or
//! Running with a due instant) driven by an explicit scheduler the run loop
//! polls; there are no per-action callbacks. The whole set is torn down and
//! rebuilt on every reconfiguration and on connection transitions, so live
//! timers exist only while the transport is connected.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::warn;
use teledash_types::{Action, TimerMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Idle,
    Running,
}

#[derive(Debug)]
struct ActionTimer {
    interval: Duration,
    state: TimerState,
    /// Next fire time; `None` until the first poll after (re)starting.
    due: Option<Instant>,
}

/// Owns the live action set and its timers.
#[derive(Default)]
pub struct ActionController {
    actions: Vec<Action>,
    timers: HashMap<usize, ActionTimer>,
}

impl ActionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tear down the current set and rebuild it from the frame's declared
    /// actions. Without an active connection no timers are created.
    pub fn configure(&mut self, actions: &[Action], connected: bool) {
        self.clear();
        self.actions = actions.to_vec();

        if !connected {
            return;
        }

        for (index, action) in self.actions.iter().enumerate() {
            if action.timer_mode == TimerMode::Off {
                continue;
            }

            if action.timer_interval_ms == 0 {
                warn!(
                    "interval for action '{}' must be greater than 0, timer disabled",
                    action.title
                );
                continue;
            }

            let autostart = action.timer_mode == TimerMode::AutoStart
                || action.auto_execute_on_connect;
            self.timers.insert(
                index,
                ActionTimer {
                    interval: Duration::from_millis(action.timer_interval_ms),
                    state: if autostart {
                        TimerState::Running
                    } else {
                        TimerState::Idle
                    },
                    due: None,
                },
            );
        }
    }

    /// Drop all actions and stop all timers.
    pub fn clear(&mut self) {
        self.actions.clear();
        self.timers.clear();
    }

    pub fn count(&self) -> usize {
        self.actions.len()
    }

    pub fn get(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Whether the action has a live timer (regardless of state).
    pub fn has_timer(&self, index: usize) -> bool {
        self.timers.contains_key(&index)
    }

    /// Whether the action's timer is currently running.
    pub fn is_running(&self, index: usize) -> bool {
        self.timers
            .get(&index)
            .map(|t| t.state == TimerState::Running)
            .unwrap_or(false)
    }

    /// Toggle-checked state shown next to the action in the UI: true only
    /// for a ToggleOnTrigger action whose timer is running.
    pub fn is_checked(&self, index: usize) -> bool {
        self.actions
            .get(index)
            .map(|a| a.timer_mode == TimerMode::ToggleOnTrigger && self.is_running(index))
            .unwrap_or(false)
    }

    /// Apply the timer state transition for a trigger.
    ///
    /// StartOnTrigger starts an idle timer and ignores further triggers
    /// while running. ToggleOnTrigger flips the timer, but only for
    /// user-originated triggers; a trigger coming from the timer's own tick
    /// leaves the state alone. Payload transmission is the caller's job and
    /// happens for every trigger.
    pub fn apply_trigger(&mut self, index: usize, user_triggered: bool) {
        let Some(action) = self.actions.get(index) else {
            return;
        };
        let mode = action.timer_mode;
        let Some(timer) = self.timers.get_mut(&index) else {
            return;
        };

        match mode {
            TimerMode::StartOnTrigger => {
                if timer.state == TimerState::Idle {
                    timer.state = TimerState::Running;
                    timer.due = None;
                }
            }
            TimerMode::ToggleOnTrigger if user_triggered => {
                timer.state = match timer.state {
                    TimerState::Idle => TimerState::Running,
                    TimerState::Running => TimerState::Idle,
                };
                timer.due = None;
            }
            _ => {}
        }
    }

    /// Advance the scheduler and return the actions due to fire.
    ///
    /// A freshly started timer schedules its first fire one interval after
    /// the poll that observes it. Fired timers reschedule relative to `now`,
    /// so a stalled loop does not produce a burst of catch-up fires.
    pub fn poll(&mut self, now: Instant) -> Vec<usize> {
        let mut due = Vec::new();
        for (&index, timer) in self.timers.iter_mut() {
            if timer.state != TimerState::Running {
                continue;
            }
            match timer.due {
                None => timer.due = Some(now + timer.interval),
                Some(at) if at <= now => {
                    due.push(index);
                    timer.due = Some(now + timer.interval);
                }
                Some(_) => {}
            }
        }
        due.sort_unstable();
        due
    }
}
