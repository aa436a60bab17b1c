//! Single-slot deferred task holder.
//!
//! `Debounced` holds at most one pending task. Scheduling a new task cancels
//! the previous one and restarts the quiet window; the task becomes due only
//! once the window has elapsed with no newer schedule. Timestamps are passed in
//! by the caller (milliseconds from `Date.now()` in the app, plain numbers in
//! tests), so the holder itself never touches a clock or a timer.

use std::time::Duration;

/// Milliseconds since an arbitrary epoch.
pub type Millis = u64;

#[derive(Debug)]
struct Pending<T> {
    task: T,
    due_at: Millis,
}

#[derive(Debug)]
pub struct Debounced<T> {
    delay: Duration,
    slot: Option<Pending<T>>,
}

impl<T> Debounced<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, slot: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancels any pending task and schedules `task` one window after `now`.
    /// Returns the task that was superseded, if any.
    pub fn schedule(&mut self, task: T, now: Millis) -> Option<T> {
        let due_at = now.saturating_add(self.delay.as_millis() as Millis);
        self.slot
            .replace(Pending { task, due_at })
            .map(|pending| pending.task)
    }

    /// Takes the pending task if its quiet window has elapsed by `now`.
    pub fn take_due(&mut self, now: Millis) -> Option<T> {
        match &self.slot {
            Some(pending) if pending.due_at <= now => self.slot.take().map(|p| p.task),
            _ => None,
        }
    }

    /// Takes the pending task regardless of its deadline.
    pub fn flush(&mut self) -> Option<T> {
        self.slot.take().map(|pending| pending.task)
    }

    /// Time left until the pending task is due, `None` when idle.
    pub fn remaining(&self, now: Millis) -> Option<Duration> {
        self.slot
            .as_ref()
            .map(|pending| Duration::from_millis(pending.due_at.saturating_sub(now)))
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    pub fn pending(&self) -> Option<&T> {
        self.slot.as_ref().map(|pending| &pending.task)
    }

    /// Edits the pending task in place without touching its deadline.
    pub fn update_pending(&mut self, f: impl FnOnce(&mut T)) {
        if let Some(pending) = &mut self.slot {
            f(&mut pending.task);
        }
    }

    /// Drops the pending task when `predicate` holds for it.
    pub fn cancel_if(&mut self, predicate: impl FnOnce(&T) -> bool) -> bool {
        if self.slot.as_ref().is_some_and(|pending| predicate(&pending.task)) {
            self.slot = None;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer() -> Debounced<&'static str> {
        Debounced::new(Duration::from_millis(500))
    }

    #[test]
    fn new_debouncer_is_idle() {
        let mut d = debouncer();
        assert!(!d.is_pending());
        assert_eq!(d.take_due(10_000), None);
    }

    #[test]
    fn task_is_not_due_inside_the_window() {
        let mut d = debouncer();
        d.schedule("a", 1_000);
        assert_eq!(d.take_due(1_499), None);
        assert!(d.is_pending());
        assert_eq!(d.take_due(1_500), Some("a"));
        assert!(!d.is_pending());
    }

    #[test]
    fn rescheduling_restarts_the_window() {
        let mut d = debouncer();
        d.schedule("a", 1_000);
        assert_eq!(d.schedule("b", 1_400), Some("a"));
        // The first deadline passes without anything becoming due.
        assert_eq!(d.take_due(1_500), None);
        assert_eq!(d.take_due(1_900), Some("b"));
    }

    #[test]
    fn remaining_counts_down_to_zero() {
        let mut d = debouncer();
        assert_eq!(d.remaining(0), None);
        d.schedule("a", 1_000);
        assert_eq!(d.remaining(1_200), Some(Duration::from_millis(300)));
        assert_eq!(d.remaining(2_000), Some(Duration::ZERO));
    }

    #[test]
    fn flush_ignores_deadline() {
        let mut d = debouncer();
        d.schedule("a", 0);
        assert_eq!(d.flush(), Some("a"));
        assert_eq!(d.flush(), None);
    }

    #[test]
    fn cancel_if_only_drops_matching_task() {
        let mut d = debouncer();
        d.schedule("keep", 0);
        assert!(!d.cancel_if(|t| *t == "other"));
        assert!(d.cancel_if(|t| *t == "keep"));
        assert!(!d.is_pending());
    }
}
