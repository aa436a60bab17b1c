//! Sidebar file list: keeps the [`FileSet`](crate::store::FileSet) and the
//! active document consistent with the directory on disk.
//!
//! Every shell call is wrapped: a failure is logged and the state is left as it
//! was before the operation started. Callers get a [`ReconcileError`] back so
//! they can tell precondition errors (shown to the user) from service failures
//! (already logged).

use std::collections::BTreeSet;
use std::sync::OnceLock;

use log::{debug, error, info};
use regex::Regex;
use thiserror::Error;

use crate::bridge::{BridgeError, FileAccess};
use crate::controller::{persist, PendingWrite};
use crate::store::{display_name, RenameEdit, StateStore};

pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Please open a folder first")]
    NoDirectory,
    #[error("only the open file can be renamed: {path}")]
    NotActive { path: String },
    #[error(transparent)]
    Service(#[from] BridgeError),
}

impl ReconcileError {
    /// Message to show the user, if this error is theirs to act on.
    pub fn user_message(&self) -> Option<String> {
        match self {
            ReconcileError::NoDirectory => Some(self.to_string()),
            _ => None,
        }
    }
}

/// What a click on an entry's label should do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LabelClick {
    /// The entry is the active document: its label became a rename editor.
    Renaming,
    /// The entry is not active: open it instead.
    Open(String),
}

/// A rename that went through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Renamed {
    pub old_path: String,
    pub new_path: String,
}

/// Smallest free `Untitled` name among `names`.
///
/// A bare `Untitled` counts as index 0 and `Untitled_<N>` as index N; the
/// first index not taken wins, so gaps left by deletions are reused.
pub fn next_untitled_name<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    static RE_UNTITLED: OnceLock<Regex> = OnceLock::new();
    let re = RE_UNTITLED.get_or_init(|| Regex::new(r"^Untitled_(\d+)$").unwrap());

    let used: BTreeSet<u64> = names
        .into_iter()
        .filter_map(|name| {
            if name == UNTITLED {
                return Some(0);
            }
            re.captures(name)?.get(1)?.as_str().parse().ok()
        })
        .collect();

    let free = (0..).find(|idx| !used.contains(idx)).unwrap_or_default();
    if free == 0 {
        UNTITLED.to_string()
    } else {
        format!("{UNTITLED}_{free}")
    }
}

#[derive(Clone, Debug)]
pub struct FileListReconciler<S, F> {
    state: S,
    service: F,
}

impl<S: StateStore, F: FileAccess> FileListReconciler<S, F> {
    pub fn new(state: S, service: F) -> Self {
        Self { state, service }
    }

    /// Asks the shell for a directory and opens it. `Ok(false)` on cancel.
    pub async fn choose_directory(&self) -> Result<bool, ReconcileError> {
        let chosen = self
            .service
            .choose_directory()
            .await
            .map_err(|e| failed("choose directory", e))?;
        match chosen {
            Some(path) => {
                self.open_directory(&path).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Scans `path` and makes it the current directory with nothing open.
    pub async fn open_directory(&self, path: &str) -> Result<(), ReconcileError> {
        let files = self
            .service
            .list_markdown_files(path)
            .await
            .map_err(|e| failed("list directory", e))?;
        info!("opened {path} ({} markdown files)", files.len());
        self.state.update_state(|s| {
            s.set_current_directory(Some(path.to_string()));
            s.clear_session();
            s.set_files(files);
        });
        Ok(())
    }

    /// Loads `path` into the editor and makes it the active document.
    pub async fn open_file(&self, path: &str) -> Result<(), ReconcileError> {
        let content = self
            .service
            .read_file(path)
            .await
            .map_err(|e| failed("read file", e))?;
        self.state.update_state(|s| {
            s.set_rename(RenameEdit::Idle);
            s.set_active_file(Some(path.to_string()));
            s.set_content(content);
        });
        Ok(())
    }

    /// Creates the next free `Untitled` file and opens it empty.
    pub async fn create_file(&self) -> Result<String, ReconcileError> {
        let Some((directory, name)) = self.state.read_state(|s| {
            s.current_directory()
                .map(|dir| (dir.to_string(), next_untitled_name(s.files().display_names())))
        }) else {
            return Err(ReconcileError::NoDirectory);
        };

        let path = self
            .service
            .create_file(&directory, &name)
            .await
            .map_err(|e| failed("create file", e))?;
        // The file exists now: it becomes active even if the rescan fails.
        let files = self.rescan(Some(directory)).await;

        debug!("created {path}");
        self.state.update_state(|s| {
            if let Some(files) = files {
                s.set_files(files);
            }
            s.set_rename(RenameEdit::Idle);
            s.set_active_file(Some(path.clone()));
            s.set_content(String::new());
        });
        Ok(path)
    }

    /// Routes a click on an entry's label: the active entry starts renaming,
    /// any other entry should be opened.
    pub fn click_label(&self, path: &str) -> LabelClick {
        if !self.state.read_state(|s| s.is_active(path)) {
            return LabelClick::Open(path.to_string());
        }
        self.state.update_state(|s| {
            s.set_rename(RenameEdit::Editing {
                path: path.to_string(),
                draft: display_name(path).to_string(),
            })
        });
        LabelClick::Renaming
    }

    pub fn edit_rename(&self, text: String) {
        self.state.update_state(|s| s.set_rename_draft(text));
    }

    /// Leaves the rename editor without touching the file.
    pub fn cancel_rename(&self) {
        self.state.update_state(|s| s.set_rename(RenameEdit::Idle));
    }

    /// Commits the rename editor. A blank or unchanged draft just closes it.
    ///
    /// `flush` hands over the pending save, which is written to the old path
    /// before the file moves.
    pub async fn confirm_rename(
        &self,
        flush: impl FnOnce() -> Option<PendingWrite>,
    ) -> Result<Option<Renamed>, ReconcileError> {
        let mut edit = RenameEdit::Idle;
        self.state.update_state(|s| edit = s.take_rename());
        let RenameEdit::Editing { path, draft } = edit else {
            return Ok(None);
        };
        let name = draft.trim();
        if name.is_empty() || name == display_name(&path) {
            return Ok(None);
        }
        if let Some(write) = flush() {
            persist(&self.service, write).await;
        }
        self.rename(&path, name).await.map(Some)
    }

    /// Renames the active document to `new_name` (without extension).
    pub async fn rename(&self, old_path: &str, new_name: &str) -> Result<Renamed, ReconcileError> {
        let (active, directory) = self.state.read_state(|s| {
            (
                s.is_active(old_path),
                s.current_directory().map(str::to_string),
            )
        });
        if !active {
            return Err(ReconcileError::NotActive {
                path: old_path.to_string(),
            });
        }

        let new_path = self
            .service
            .rename_file(old_path, new_name)
            .await
            .map_err(|e| failed("rename file", e))?;

        // The file has moved: the active pointer follows it even if the
        // rescan below fails, so edits never land on the old path.
        let files = self.rescan(directory).await;
        self.state.update_state(|s| {
            if let Some(files) = files {
                s.set_files(files);
            }
            if s.is_active(old_path) {
                s.set_active_file(Some(new_path.clone()));
            }
        });
        info!("renamed {old_path} -> {new_path}");
        Ok(Renamed {
            old_path: old_path.to_string(),
            new_path,
        })
    }

    /// Deletes `path` after `confirm` agrees. `Ok(false)` when declined.
    ///
    /// `discard` runs once confirmed and before the shell call, so a pending
    /// save cannot recreate the file.
    pub async fn delete(
        &self,
        path: &str,
        confirm: impl FnOnce(&str) -> bool,
        discard: impl FnOnce(&str),
    ) -> Result<bool, ReconcileError> {
        if !confirm(display_name(path)) {
            return Ok(false);
        }
        discard(path);
        self.service
            .delete_file(path)
            .await
            .map_err(|e| failed("delete file", e))?;
        self.state.update_state(|s| {
            s.remove_file(path);
            if s.is_active(path) {
                s.clear_session();
            }
        });
        info!("deleted {path}");
        Ok(true)
    }

    /// Fresh listing of `directory`. A failure is logged and yields `None`.
    async fn rescan(&self, directory: Option<String>) -> Option<Vec<String>> {
        let dir = directory?;
        match self.service.list_markdown_files(&dir).await {
            Ok(files) => Some(files),
            Err(e) => {
                failed("list directory", e);
                None
            }
        }
    }
}

fn failed(op: &str, err: BridgeError) -> ReconcileError {
    error!("{op}: {err}");
    ReconcileError::Service(err)
}
