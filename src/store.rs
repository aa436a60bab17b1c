//! The document state store.
//!
//! One [`AppState`] value is the single source of truth for the UI. It owns no
//! I/O and only changes through its setters; components reach it through the
//! [`StateStore`] seam so the same logic runs against a reactive signal in the
//! app and a plain `RefCell` in tests.

use std::cell::RefCell;
use std::rc::Rc;

pub const MARKDOWN_EXTENSION: &str = ".md";

pub const MIN_SPLIT_RATIO: f64 = 20.0;
pub const MAX_SPLIT_RATIO: f64 = 80.0;
pub const DEFAULT_SPLIT_RATIO: f64 = 50.0;

/// Final segment of `path`. Both separators are accepted since paths come
/// from whichever OS the shell runs on.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Display name of a document: its file name without `.md`.
pub fn display_name(path: &str) -> &str {
    let name = file_name(path);
    let split = name.len().saturating_sub(MARKDOWN_EXTENSION.len());
    if name.is_char_boundary(split) && name[split..].eq_ignore_ascii_case(MARKDOWN_EXTENSION) {
        &name[..split]
    } else {
        name
    }
}

/// Directory part of `path`, or `None` when it has no separator.
pub fn parent_dir(path: &str) -> Option<&str> {
    path.rfind(['/', '\\']).map(|idx| &path[..idx])
}

/// Ordered document paths in scan order. Never holds duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileSet {
    paths: Vec<String>,
}

impl FileSet {
    /// Replaces the whole set, keeping the first occurrence of any repeated path.
    pub fn replace(&mut self, paths: Vec<String>) {
        self.paths.clear();
        for path in paths {
            if !self.paths.contains(&path) {
                self.paths.push(path);
            }
        }
    }

    pub fn remove(&mut self, path: &str) -> bool {
        let before = self.paths.len();
        self.paths.retain(|p| p != path);
        self.paths.len() != before
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn display_names(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(|p| display_name(p))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutState {
    split_ratio: f64,
    sidebar_open: bool,
    dark_mode: bool,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self {
            split_ratio: DEFAULT_SPLIT_RATIO,
            sidebar_open: true,
            dark_mode: true,
        }
    }
}

impl LayoutState {
    pub fn split_ratio(&self) -> f64 {
        self.split_ratio
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }
}

/// Editor width as a percentage of the split container for a pointer at
/// `pointer_x`, or `None` when the container has no width yet.
pub fn split_ratio_from_pointer(pointer_x: f64, container_left: f64, container_width: f64) -> Option<f64> {
    if container_width <= 0.0 {
        return None;
    }
    let ratio = (pointer_x - container_left) / container_width * 100.0;
    Some(ratio.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO))
}

/// In-place rename editor of the sidebar.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RenameEdit {
    #[default]
    Idle,
    Editing { path: String, draft: String },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppState {
    current_directory: Option<String>,
    files: FileSet,
    active_file: Option<String>,
    content: String,
    layout: LayoutState,
    rename: RenameEdit,
}

impl AppState {
    pub fn current_directory(&self) -> Option<&str> {
        self.current_directory.as_deref()
    }

    pub fn files(&self) -> &FileSet {
        &self.files
    }

    pub fn active_file(&self) -> Option<&str> {
        self.active_file.as_deref()
    }

    pub fn is_active(&self, path: &str) -> bool {
        self.active_file.as_deref() == Some(path)
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn layout(&self) -> &LayoutState {
        &self.layout
    }

    pub fn rename(&self) -> &RenameEdit {
        &self.rename
    }

    /// Directory images and relative links resolve against.
    pub fn base_dir(&self) -> Option<&str> {
        self.current_directory()
            .or_else(|| self.active_file().and_then(parent_dir))
    }

    pub fn set_current_directory(&mut self, directory: Option<String>) {
        self.current_directory = directory;
    }

    pub fn set_files(&mut self, paths: Vec<String>) {
        self.files.replace(paths);
    }

    pub fn remove_file(&mut self, path: &str) -> bool {
        self.files.remove(path)
    }

    pub fn set_active_file(&mut self, path: Option<String>) {
        self.active_file = path;
    }

    pub fn set_content(&mut self, content: String) {
        self.content = content;
    }

    /// Drops the active document and empties the buffer.
    pub fn clear_session(&mut self) {
        self.active_file = None;
        self.content.clear();
        self.rename = RenameEdit::Idle;
    }

    /// Clamps into `[MIN_SPLIT_RATIO, MAX_SPLIT_RATIO]`; NaN is ignored.
    pub fn set_split_ratio(&mut self, ratio: f64) {
        if ratio.is_nan() {
            return;
        }
        self.layout.split_ratio = ratio.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO);
    }

    pub fn set_sidebar_open(&mut self, open: bool) {
        self.layout.sidebar_open = open;
    }

    pub fn set_dark_mode(&mut self, dark: bool) {
        self.layout.dark_mode = dark;
    }

    pub fn set_rename(&mut self, rename: RenameEdit) {
        self.rename = rename;
    }

    pub fn set_rename_draft(&mut self, text: String) {
        if let RenameEdit::Editing { draft, .. } = &mut self.rename {
            *draft = text;
        }
    }

    pub fn take_rename(&mut self) -> RenameEdit {
        std::mem::take(&mut self.rename)
    }
}

/// Access to the shared [`AppState`].
///
/// Implementations must not hold a borrow across calls; async callers read
/// what they need, await, then write.
pub trait StateStore {
    fn read_state<R>(&self, f: impl FnOnce(&AppState) -> R) -> R;
    fn update_state(&self, f: impl FnOnce(&mut AppState));
}

impl StateStore for Rc<RefCell<AppState>> {
    fn read_state<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.borrow())
    }

    fn update_state(&self, f: impl FnOnce(&mut AppState)) {
        f(&mut self.borrow_mut())
    }
}
