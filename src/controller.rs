//! Keeps the editor buffer, the file on disk and the two pane scroll offsets in
//! step.
//!
//! The buffer changes synchronously on every edit. Persistence goes through a
//! single-slot [`Debounced`] holding the latest [`PendingWrite`]; the app arms a
//! timer for the returned delay and calls [`DualPaneController::take_due_write`]
//! when it fires. Scroll mirroring is delegated to [`ScrollLink`].

use std::time::Duration;

use log::{debug, error};

use crate::bridge::FileAccess;
use crate::debounce::{Debounced, Millis};
use crate::editor_core::{insert_at_cursor, Selection};
use crate::scroll_sync::{Mirror, Pane, ScrollLink, ScrollPos};
use crate::store::StateStore;

pub const SAVE_DELAY: Duration = Duration::from_millis(500);

/// Full content destined for one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingWrite {
    pub path: String,
    pub content: String,
}

/// What the caller has to do after a content change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveSchedule {
    /// Arm (or re-arm) the save timer for this long.
    pub arm: Option<Duration>,
    /// A write for another file that was still pending; persist it now.
    pub flush_now: Option<PendingWrite>,
}

#[derive(Debug)]
pub struct DualPaneController {
    saves: Debounced<PendingWrite>,
    scroll: ScrollLink,
}

impl Default for DualPaneController {
    fn default() -> Self {
        Self::new(SAVE_DELAY)
    }
}

impl DualPaneController {
    pub fn new(save_delay: Duration) -> Self {
        Self {
            saves: Debounced::new(save_delay),
            scroll: ScrollLink::new(),
        }
    }

    /// Replaces the buffer and schedules its persistence to the active file.
    pub fn on_content_changed(&mut self, state: &impl StateStore, text: String, now: Millis) -> SaveSchedule {
        let active = state.read_state(|s| s.active_file().map(str::to_string));
        let Some(path) = active else {
            state.update_state(|s| s.set_content(text));
            return SaveSchedule::default();
        };

        let write = PendingWrite {
            path,
            content: text.clone(),
        };
        state.update_state(|s| s.set_content(text));

        let superseded = self.saves.schedule(write, now);
        let target = self.saves.pending().map(|w| w.path.as_str());
        SaveSchedule {
            arm: Some(self.saves.delay()),
            flush_now: superseded.filter(|old| Some(old.path.as_str()) != target),
        }
    }

    /// Wraps the selection in `before`/`after` and treats the result as an
    /// edit. Returns the selection to restore along with the save schedule.
    pub fn insert_at_cursor(
        &mut self,
        state: &impl StateStore,
        selection: Selection,
        before: &str,
        after: &str,
        now: Millis,
    ) -> (Selection, SaveSchedule) {
        let edit = state.read_state(|s| insert_at_cursor(s.content(), selection, before, after));
        let schedule = self.on_content_changed(state, edit.text, now);
        (edit.selection, schedule)
    }

    /// The pending write, once its quiet window has elapsed.
    pub fn take_due_write(&mut self, now: Millis) -> Option<PendingWrite> {
        self.saves.take_due(now)
    }

    /// The pending write, immediately. Used before the active document changes.
    pub fn flush(&mut self) -> Option<PendingWrite> {
        self.saves.flush()
    }

    /// Time until the pending write is due, for re-arming an early timer.
    pub fn save_remaining(&self, now: Millis) -> Option<Duration> {
        self.saves.remaining(now)
    }

    /// Points a pending write for `old_path` at `new_path`.
    pub fn retarget(&mut self, old_path: &str, new_path: &str) {
        self.saves.update_pending(|write| {
            if write.path == old_path {
                write.path = new_path.to_string();
            }
        });
    }

    /// Drops a pending write for a file about to disappear. True if one was
    /// dropped.
    pub fn discard_for(&mut self, path: &str) -> bool {
        let dropped = self.saves.cancel_if(|write| write.path == path);
        if dropped {
            debug!("dropped pending save for {path}");
        }
        dropped
    }

    pub fn on_scroll(&mut self, source: Pane, offset: i32, counterpart: ScrollPos) -> Option<Mirror> {
        self.scroll.on_scroll(source, offset, counterpart)
    }
}

/// Sends `write` to the shell. A failure is logged and otherwise ignored: the
/// buffer stays authoritative and the next edit schedules a fresh write.
pub async fn persist<F: FileAccess>(service: &F, write: PendingWrite) -> bool {
    match service.write_file(&write.path, &write.content).await {
        Ok(()) => true,
        Err(e) => {
            error!("save {}: {e}", write.path);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_list::tests::FakeFiles;
    use crate::store::AppState;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn session(path: Option<&str>) -> Rc<RefCell<AppState>> {
        let state = Rc::new(RefCell::new(AppState::default()));
        state.update_state(|s| s.set_active_file(path.map(str::to_string)));
        state
    }

    /// Drives the controller the way the app does: every timer armed is
    /// fired at its deadline, and every due write is persisted.
    async fn fire_timers(
        controller: &mut DualPaneController,
        service: &FakeFiles,
        deadlines: &[Millis],
    ) -> usize {
        let mut written = 0;
        for &at in deadlines {
            if let Some(write) = controller.take_due_write(at) {
                persist(service, write).await;
                written += 1;
            }
        }
        written
    }

    #[tokio::test]
    async fn rapid_edits_produce_one_write_with_the_final_text() {
        let state = session(Some("/notes/a.md"));
        let service = FakeFiles::default();
        let mut controller = DualPaneController::default();

        let mut deadlines = Vec::new();
        for (i, text) in ["h", "he", "hel", "hell", "hello"].iter().enumerate() {
            let now = 1_000 + i as Millis * 100;
            let schedule = controller.on_content_changed(&state, text.to_string(), now);
            assert_eq!(schedule.flush_now, None);
            let arm = schedule.arm.unwrap();
            deadlines.push(now + arm.as_millis() as Millis);
        }
        assert_eq!(state.read_state(|s| s.content().to_string()), "hello");

        let written = fire_timers(&mut controller, &service, &deadlines).await;
        assert_eq!(written, 1);
        assert_eq!(service.content("/notes/a.md").as_deref(), Some("hello"));
        assert_eq!(
            service.calls().iter().filter(|c| *c == "write_file").count(),
            1
        );
    }

    #[tokio::test]
    async fn separated_edits_are_each_written() {
        let state = session(Some("/notes/a.md"));
        let service = FakeFiles::default();
        let mut controller = DualPaneController::default();

        controller.on_content_changed(&state, "one".into(), 0);
        assert_eq!(fire_timers(&mut controller, &service, &[500]).await, 1);
        controller.on_content_changed(&state, "two".into(), 2_000);
        assert_eq!(fire_timers(&mut controller, &service, &[2_500]).await, 1);
        assert_eq!(service.content("/notes/a.md").as_deref(), Some("two"));
    }

    #[test]
    fn edits_without_an_active_file_are_not_persisted() {
        let state = session(None);
        let mut controller = DualPaneController::default();
        let schedule = controller.on_content_changed(&state, "scratch".into(), 0);
        assert_eq!(schedule, SaveSchedule::default());
        assert!(!controller.saves.is_pending());
        assert_eq!(state.read_state(|s| s.content().to_string()), "scratch");
    }

    #[test]
    fn switching_files_inside_the_window_flushes_the_old_write() {
        let state = session(Some("/notes/a.md"));
        let mut controller = DualPaneController::default();
        controller.on_content_changed(&state, "for a".into(), 0);

        state.update_state(|s| s.set_active_file(Some("/notes/b.md".into())));
        let schedule = controller.on_content_changed(&state, "for b".into(), 100);
        assert_eq!(
            schedule.flush_now,
            Some(PendingWrite {
                path: "/notes/a.md".into(),
                content: "for a".into()
            })
        );
        assert_eq!(controller.take_due_write(600).unwrap().path, "/notes/b.md");
    }

    #[tokio::test]
    async fn failed_write_keeps_buffer_and_active_document() {
        let state = session(Some("/notes/a.md"));
        let service = FakeFiles::default();
        service.fail("write_file");
        let mut controller = DualPaneController::default();

        controller.on_content_changed(&state, "draft".into(), 0);
        let write = controller.take_due_write(500).unwrap();
        assert!(!persist(&service, write).await);

        state.read_state(|s| {
            assert_eq!(s.content(), "draft");
            assert_eq!(s.active_file(), Some("/notes/a.md"));
        });
    }

    #[test]
    fn insert_at_cursor_updates_buffer_and_schedules_save() {
        let state = session(Some("/notes/a.md"));
        state.update_state(|s| s.set_content("hello world".into()));
        let mut controller = DualPaneController::default();

        let (selection, schedule) =
            controller.insert_at_cursor(&state, Selection::new(0, 5), "**", "**", 0);
        assert_eq!(state.read_state(|s| s.content().to_string()), "**hello** world");
        assert_eq!(selection, Selection::new(2, 7));
        assert!(schedule.arm.is_some());
    }

    #[test]
    fn rename_retargets_and_delete_discards_pending_write() {
        let state = session(Some("/notes/a.md"));
        let mut controller = DualPaneController::default();
        controller.on_content_changed(&state, "x".into(), 0);

        controller.retarget("/notes/a.md", "/notes/b.md");
        controller.discard_for("/notes/a.md");
        assert!(controller.saves.is_pending());

        controller.discard_for("/notes/b.md");
        assert!(!controller.saves.is_pending());
    }
}
