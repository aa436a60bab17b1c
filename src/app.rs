use std::collections::HashMap;
use std::time::Duration;

use leptos::ev;
use leptos::html;
use leptos::leptos_dom::helpers::{set_timeout_with_handle, window_event_listener, TimeoutHandle};
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{info, warn};
use wasm_bindgen::JsCast;

use crate::bridge::{BridgeError, FileAccess, Preferences, Request, TauriBridge};
use crate::controller::{persist, DualPaneController, PendingWrite, SaveSchedule};
use crate::debounce::{Debounced, Millis};
use crate::editor_core::{byte_to_utf16, utf16_to_byte, Selection};
use crate::file_list::{FileListReconciler, LabelClick, ReconcileError};
use crate::preview::{is_external_link, local_images, relative_part, render_html, RenderGate, RENDER_DELAY};
use crate::scroll_sync::{Pane, ScrollPos};
use crate::shortcuts::{command_for, LAYOUT_PRESETS, TOOLBAR};
use crate::store::{display_name, file_name, split_ratio_from_pointer, AppState, RenameEdit, StateStore};

impl StateStore for RwSignal<AppState> {
    fn read_state<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        self.with_untracked(f)
    }

    fn update_state(&self, f: impl FnOnce(&mut AppState)) {
        self.update(f)
    }
}

type Files = FileListReconciler<RwSignal<AppState>, TauriBridge>;

#[derive(Default)]
struct Timers {
    save: Option<TimeoutHandle>,
    render: Option<TimeoutHandle>,
}

struct PreviewState {
    debounce: Debounced<()>,
    gate: RenderGate,
}

fn now() -> Millis {
    js_sys::Date::now() as Millis
}

/// Clears whatever timer `slot` holds and arms a new one.
fn rearm(slot: &mut Option<TimeoutHandle>, delay: Duration, callback: impl FnOnce() + 'static) {
    if let Some(old) = slot.take() {
        old.clear();
    }
    match set_timeout_with_handle(callback, delay) {
        Ok(handle) => *slot = Some(handle),
        Err(e) => warn!("could not arm timer: {e:?}"),
    }
}

/// Shows a user-facing message for `result` and drops the error.
fn report<T>(result: Result<T, ReconcileError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            if let Some(message) = e.user_message() {
                let _ = window().alert_with_message(&message);
            }
            None
        }
    }
}

fn window_command(request: Request<'static>) {
    spawn_local(async move {
        if let Err(e) = TauriBridge.window(request).await {
            warn!("{e}");
        }
    });
}

async fn load_local_image(base: &str, src: &str) -> Result<String, BridgeError> {
    let path = TauriBridge.resolve_relative_path(base, relative_part(src)).await?;
    TauriBridge.load_image(&path).await
}

/// Data URIs for every local image `markdown` references. Images that fail to
/// load are left out and keep the source written in the markdown.
async fn resolve_images(markdown: &str, base: Option<&str>) -> HashMap<String, String> {
    let mut resolved = HashMap::new();
    let Some(base) = base else {
        return resolved;
    };
    for src in local_images(markdown) {
        match load_local_image(base, &src).await {
            Ok(uri) => {
                resolved.insert(src, uri);
            }
            Err(e) => warn!("image {src}: {e}"),
        }
    }
    resolved
}

/// Handles shared by every component of the window.
#[derive(Clone, Copy)]
struct Ctx {
    state: RwSignal<AppState>,
    controller: StoredValue<DualPaneController>,
    preview_state: StoredValue<PreviewState>,
    timers: StoredValue<Timers>,
    preview_html: RwSignal<String>,
    editor: NodeRef<html::Textarea>,
    preview: NodeRef<html::Div>,
}

impl Ctx {
    fn new() -> Self {
        Self {
            state: RwSignal::new(AppState::default()),
            controller: StoredValue::new(DualPaneController::default()),
            preview_state: StoredValue::new(PreviewState {
                debounce: Debounced::new(RENDER_DELAY),
                gate: RenderGate::default(),
            }),
            timers: StoredValue::new(Timers::default()),
            preview_html: RwSignal::new(String::new()),
            editor: NodeRef::new(),
            preview: NodeRef::new(),
        }
    }

    fn files(&self) -> Files {
        FileListReconciler::new(self.state, TauriBridge)
    }

    fn content_changed(&self, text: String) {
        let state = self.state;
        let now = now();
        let schedule = self
            .controller
            .try_update_value(|c| c.on_content_changed(&state, text, now))
            .unwrap_or_default();
        self.apply(schedule);
    }

    /// Wraps the textarea selection in `before`/`after`, then puts the caret
    /// back around the wrapped text.
    fn insert(&self, before: &str, after: &str) {
        let Some(textarea) = self.editor.get_untracked() else {
            return;
        };
        let text = self.state.read_state(|s| s.content().to_string());
        let start = textarea.selection_start().ok().flatten().unwrap_or(0) as usize;
        let end = textarea.selection_end().ok().flatten().unwrap_or(0) as usize;
        let selection = Selection::new(utf16_to_byte(&text, start), utf16_to_byte(&text, end));

        let state = self.state;
        let now = now();
        let Some((selection, schedule)) = self
            .controller
            .try_update_value(|c| c.insert_at_cursor(&state, selection, before, after, now))
        else {
            return;
        };
        self.apply(schedule);

        let text = self.state.read_state(|s| s.content().to_string());
        textarea.set_value(&text);
        let _ = textarea.focus();
        let _ = textarea.set_selection_range(
            byte_to_utf16(&text, selection.start) as u32,
            byte_to_utf16(&text, selection.end) as u32,
        );
    }

    fn apply(&self, schedule: SaveSchedule) {
        if let Some(write) = schedule.flush_now {
            spawn_persist(write);
        }
        if let Some(delay) = schedule.arm {
            self.arm_save(delay);
        }
    }

    fn arm_save(&self, delay: Duration) {
        let ctx = *self;
        self.timers
            .update_value(|t| rearm(&mut t.save, delay, move || ctx.save_due()));
    }

    fn save_due(&self) {
        let now = now();
        match self.controller.try_update_value(|c| c.take_due_write(now)).flatten() {
            Some(write) => spawn_persist(write),
            None => {
                // The timer fired ahead of the deadline.
                if let Some(rest) = self.controller.with_value(|c| c.save_remaining(now)) {
                    self.arm_save(rest);
                }
            }
        }
    }

    /// Persists a pending write right away. Called before the active document
    /// changes underneath it.
    fn flush_save(&self) {
        if let Some(write) = self.take_save() {
            spawn_persist(write);
        }
    }

    /// Removes the pending write and its timer, leaving the write to the caller.
    fn take_save(&self) -> Option<PendingWrite> {
        let write = self.controller.try_update_value(|c| c.flush()).flatten()?;
        self.clear_save_timer();
        Some(write)
    }

    fn discard_save(&self, path: &str) {
        if self.controller.try_update_value(|c| c.discard_for(path)) == Some(true) {
            self.clear_save_timer();
        }
    }

    fn clear_save_timer(&self) {
        self.timers.update_value(|t| {
            if let Some(handle) = t.save.take() {
                handle.clear();
            }
        });
    }

    fn schedule_render(&self) {
        let now = now();
        let delay = self.preview_state.try_update_value(|p| {
            p.debounce.schedule((), now);
            p.debounce.delay()
        });
        if let Some(delay) = delay {
            self.arm_render(delay);
        }
    }

    fn arm_render(&self, delay: Duration) {
        let ctx = *self;
        self.timers
            .update_value(|t| rearm(&mut t.render, delay, move || ctx.render_due()));
    }

    fn render_due(&self) {
        let now = now();
        let due = self.preview_state.try_update_value(|p| p.debounce.take_due(now)).flatten();
        if due.is_none() {
            if let Some(rest) = self.preview_state.with_value(|p| p.debounce.remaining(now)) {
                self.arm_render(rest);
            }
            return;
        }

        let (markdown, base) = self
            .state
            .read_state(|s| (s.content().to_string(), s.base_dir().map(str::to_string)));
        let Some(revision) = self.preview_state.try_update_value(|p| p.gate.begin()) else {
            return;
        };
        let ctx = *self;
        spawn_local(async move {
            let images = resolve_images(&markdown, base.as_deref()).await;
            let html = render_html(&markdown, &images);
            if ctx.preview_state.with_value(|p| p.gate.accepts(revision)) {
                ctx.preview_html.set(html);
            }
        });
    }

    fn scrolled(&self, source: Pane) {
        let (Some(editor), Some(preview)) = (self.editor.get_untracked(), self.preview.get_untracked()) else {
            return;
        };
        fn pos(el: &web_sys::Element) -> ScrollPos {
            ScrollPos {
                offset: el.scroll_top(),
                max: el.scroll_height() - el.client_height(),
            }
        }
        let (offset, counterpart) = match source {
            Pane::Editor => (editor.scroll_top(), pos(&preview)),
            Pane::Preview => (preview.scroll_top(), pos(&editor)),
        };
        let mirror = self
            .controller
            .try_update_value(|c| c.on_scroll(source, offset, counterpart))
            .flatten();
        if let Some(mirror) = mirror {
            match mirror.target {
                Pane::Editor => editor.set_scroll_top(mirror.offset),
                Pane::Preview => preview.set_scroll_top(mirror.offset),
            }
        }
    }

    fn choose_directory(&self) {
        self.flush_save();
        let files = self.files();
        spawn_local(async move {
            report(files.choose_directory().await);
        });
    }

    fn create_file(&self) {
        self.flush_save();
        let files = self.files();
        spawn_local(async move {
            if let Some(path) = report(files.create_file().await) {
                info!("created {path}");
            }
        });
    }

    fn open(&self, path: String) {
        if self.state.read_state(|s| s.is_active(&path)) {
            return;
        }
        self.flush_save();
        let files = self.files();
        spawn_local(async move {
            report(files.open_file(&path).await);
        });
    }

    fn label_clicked(&self, path: &str) {
        if let LabelClick::Open(path) = self.files().click_label(path) {
            self.open(path);
        }
    }

    fn confirm_rename(&self) {
        let ctx = *self;
        spawn_local(async move {
            if let Some(Some(renamed)) = report(ctx.files().confirm_rename(|| ctx.take_save()).await) {
                ctx.controller
                    .update_value(|c| c.retarget(&renamed.old_path, &renamed.new_path));
            }
        });
    }

    fn delete(&self, path: String) {
        let ctx = *self;
        spawn_local(async move {
            let confirm = |name: &str| {
                window()
                    .confirm_with_message(&format!("Delete \"{name}\"?"))
                    .unwrap_or(false)
            };
            report(ctx.files().delete(&path, confirm, |p| ctx.discard_save(p)).await);
        });
    }

    fn toggle_theme(&self) {
        let dark = !self.state.read_state(|s| s.layout().dark_mode());
        self.state.update_state(|s| s.set_dark_mode(dark));
        spawn_local(async move {
            if let Err(e) = TauriBridge.save_preferences(Preferences { is_dark_mode: dark }).await {
                warn!("{e}");
            }
        });
    }

    fn open_in_explorer(&self) {
        let Some(directory) = self.state.read_state(|s| s.current_directory().map(str::to_string)) else {
            return;
        };
        spawn_local(async move {
            if let Err(e) = TauriBridge.open_in_explorer(&directory).await {
                warn!("{e}");
            }
        });
    }

    /// Sends clicks on external links to the system browser instead of
    /// navigating the webview.
    fn preview_clicked(&self, ev: ev::MouseEvent) {
        let Some(target) = ev.target().and_then(|t| t.dyn_into::<web_sys::Element>().ok()) else {
            return;
        };
        let Ok(Some(link)) = target.closest("a") else {
            return;
        };
        let Some(href) = link.get_attribute("href") else {
            return;
        };
        if !is_external_link(&href) {
            return;
        }
        ev.prevent_default();
        spawn_local(async move {
            if let Err(e) = TauriBridge.open_external_link(&href).await {
                warn!("{e}");
            }
        });
    }
}

fn spawn_persist(write: PendingWrite) {
    spawn_local(async move {
        persist(&TauriBridge, write).await;
    });
}

#[component]
fn TitleBar() -> impl IntoView {
    let ctx = expect_context::<Ctx>();
    let folder = Memo::new(move |_| {
        ctx.state
            .with(|s| s.current_directory().map(|d| file_name(d).to_string()))
    });
    let file = Memo::new(move |_| {
        ctx.state
            .with(|s| s.active_file().map(|f| display_name(f).to_string()))
    });

    view! {
        <header class="titlebar" data-tauri-drag-region="">
            <div class="titlebar-title" data-tauri-drag-region="">
                <span class="app-name">"md-editor"</span>
                {move || folder.get().map(|name| view! {
                    <span class="titlebar-sep">"-"</span>
                    <span
                        class="titlebar-folder"
                        title="Open in file manager"
                        on:click=move |_| ctx.open_in_explorer()
                    >
                        {name}
                    </span>
                })}
                {move || file.get().map(|name| view! {
                    <span class="titlebar-sep">"-"</span>
                    <span class="titlebar-file">{name}</span>
                })}
            </div>
            <div class="window-controls">
                <button title="Minimize" on:click=move |_| window_command(Request::MinimizeWindow)>"\u{2013}"</button>
                <button title="Maximize" on:click=move |_| window_command(Request::ToggleMaximizeWindow)>"\u{25a1}"</button>
                <button class="close" title="Close" on:click=move |_| window_command(Request::CloseWindow)>"\u{2715}"</button>
            </div>
        </header>
    }
}

#[component]
fn Sidebar() -> impl IntoView {
    let ctx = expect_context::<Ctx>();
    let state = ctx.state;
    let open = Memo::new(move |_| state.with(|s| s.layout().sidebar_open()));
    let has_directory = Memo::new(move |_| state.with(|s| s.current_directory().is_some()));
    let paths = Memo::new(move |_| state.with(|s| s.files().paths().to_vec()));
    let active = Memo::new(move |_| state.with(|s| s.active_file().map(str::to_string)));
    let rename = Memo::new(move |_| state.with(|s| s.rename().clone()));

    let entry = move |path: String| {
        let is_active = {
            let path = path.clone();
            move || active.get().as_deref() == Some(path.as_str())
        };
        let draft = {
            let path = path.clone();
            move || match rename.get() {
                RenameEdit::Editing { path: editing, draft } if editing == path => Some(draft),
                _ => None,
            }
        };
        let name = display_name(&path).to_string();
        let open_path = path.clone();
        let label_path = path.clone();

        view! {
            <div class="file-item" class:active=is_active on:click=move |_| ctx.open(open_path.clone())>
                <span class="file-icon">"\u{1f4c4}"</span>
                {move || match draft() {
                    Some(draft) => {
                        let files = ctx.files();
                        view! {
                            <input
                                class="rename-input"
                                prop:value=draft
                                on:click=|ev: ev::MouseEvent| ev.stop_propagation()
                                on:input=move |ev| files.edit_rename(event_target_value(&ev))
                                on:keydown=move |ev: ev::KeyboardEvent| match ev.key().as_str() {
                                    "Enter" => {
                                        ev.prevent_default();
                                        ctx.confirm_rename();
                                    }
                                    "Escape" => ctx.files().cancel_rename(),
                                    _ => {}
                                }
                                on:blur=move |_| ctx.files().cancel_rename()
                            />
                        }
                        .into_any()
                    }
                    None => {
                        let label_path = label_path.clone();
                        view! {
                            <span
                                class="file-name"
                                on:click=move |ev: ev::MouseEvent| {
                                    ev.stop_propagation();
                                    ctx.label_clicked(&label_path);
                                }
                            >
                                {name.clone()}
                            </span>
                        }
                        .into_any()
                    }
                }}
                <button
                    class="delete-button"
                    title="Delete"
                    on:click=move |ev: ev::MouseEvent| {
                        ev.stop_propagation();
                        ctx.delete(path.clone());
                    }
                >
                    "\u{1f5d1}"
                </button>
            </div>
        }
    };

    view! {
        <nav class="sidebar" class:collapsed=move || !open.get()>
            <div class="sidebar-header">
                <button class="sidebar-button" on:click=move |_| ctx.choose_directory()>"Open Folder"</button>
                <button class="sidebar-button" title="New file" on:click=move |_| ctx.create_file()>"+"</button>
                <button
                    class="sidebar-button"
                    title=move || if open.get() { "Collapse sidebar" } else { "Expand sidebar" }
                    on:click=move |_| state.update(|s| {
                        let open = s.layout().sidebar_open();
                        s.set_sidebar_open(!open);
                    })
                >
                    {move || if open.get() { "\u{00ab}" } else { "\u{00bb}" }}
                </button>
            </div>
            <div class="file-list">
                {move || {
                    if !has_directory.get() {
                        return view! { <div class="sidebar-empty">"No folder opened"</div> }.into_any();
                    }
                    let paths = paths.get();
                    if paths.is_empty() {
                        return view! { <div class="sidebar-empty">"No markdown files"</div> }.into_any();
                    }
                    paths.into_iter().map(entry).collect::<Vec<_>>().into_any()
                }}
            </div>
        </nav>
    }
}

#[component]
fn Toolbar() -> impl IntoView {
    let ctx = expect_context::<Ctx>();
    let dark = Memo::new(move |_| ctx.state.with(|s| s.layout().dark_mode()));

    view! {
        <div class="toolbar">
            <div class="toolbar-group">
                {TOOLBAR
                    .iter()
                    .map(|item| {
                        let item = *item;
                        view! {
                            <button
                                class="tool"
                                title=item.title
                                on:mousedown=|ev: ev::MouseEvent| ev.prevent_default()
                                on:click=move |_| {
                                    let (before, after) = item.command.markers();
                                    ctx.insert(&before, after);
                                }
                            >
                                {item.label}
                            </button>
                        }
                    })
                    .collect::<Vec<_>>()}
            </div>
            <div class="toolbar-group">
                {LAYOUT_PRESETS
                    .iter()
                    .map(|preset| {
                        let preset = *preset;
                        view! {
                            <button
                                class="tool"
                                title=preset.title
                                on:click=move |_| ctx.state.update(|s| s.set_split_ratio(preset.split_ratio))
                            >
                                {(preset.split_ratio as u32).to_string()}
                            </button>
                        }
                    })
                    .collect::<Vec<_>>()}
                <button
                    class="tool"
                    title=move || if dark.get() { "Light mode" } else { "Dark mode" }
                    on:click=move |_| ctx.toggle_theme()
                >
                    {move || if dark.get() { "\u{2600}" } else { "\u{263e}" }}
                </button>
            </div>
        </div>
    }
}

#[component]
fn Workspace() -> impl IntoView {
    let ctx = expect_context::<Ctx>();
    let state = ctx.state;
    let has_file = Memo::new(move |_| state.with(|s| s.active_file().is_some()));
    let content = Memo::new(move |_| state.with(|s| s.content().to_string()));
    let ratio = Memo::new(move |_| state.with(|s| s.layout().split_ratio()));
    let dark = Memo::new(move |_| state.with(|s| s.layout().dark_mode()));

    let container: NodeRef<html::Div> = NodeRef::new();
    let resizing = RwSignal::new(false);
    let _ = window_event_listener(ev::mousemove, move |ev| {
        if !resizing.get_untracked() {
            return;
        }
        let Some(el) = container.get_untracked() else {
            return;
        };
        let rect = el.get_bounding_client_rect();
        if let Some(ratio) = split_ratio_from_pointer(ev.client_x() as f64, rect.left(), rect.width()) {
            state.update(|s| s.set_split_ratio(ratio));
        }
    });
    let _ = window_event_listener(ev::mouseup, move |_| resizing.set(false));

    // Any buffer change, typed or loaded, re-renders the preview.
    Effect::new(move |_| {
        content.track();
        ctx.schedule_render();
    });

    let on_keydown = move |ev: ev::KeyboardEvent| {
        let Some(command) = command_for(&ev.code(), ev.ctrl_key() || ev.meta_key(), ev.shift_key()) else {
            return;
        };
        ev.prevent_default();
        let (before, after) = command.markers();
        ctx.insert(&before, after);
    };

    view! {
        <div class="workspace" class:resizing=move || resizing.get() node_ref=container>
            <section class="editor-pane" style:width=move || format!("{}%", ratio.get())>
                {move || if has_file.get() {
                    view! {
                        <textarea
                            class="editor"
                            node_ref=ctx.editor
                            prop:value=move || content.get()
                            on:input=move |ev| ctx.content_changed(event_target_value(&ev))
                            on:keydown=on_keydown
                            on:scroll=move |_| ctx.scrolled(Pane::Editor)
                            placeholder="Start writing markdown..."
                            spellcheck="false"
                        ></textarea>
                    }
                    .into_any()
                } else {
                    view! {
                        <div class="empty-state">
                            <h2>"No file selected"</h2>
                            <p>"Select a file in the sidebar to start editing"</p>
                        </div>
                    }
                    .into_any()
                }}
            </section>
            <div class="divider" on:mousedown=move |ev: ev::MouseEvent| {
                ev.prevent_default();
                resizing.set(true);
            }></div>
            <div
                class="preview-pane"
                node_ref=ctx.preview
                on:scroll=move |_| ctx.scrolled(Pane::Preview)
                on:click=move |ev| ctx.preview_clicked(ev)
            >
                <article class="prose" class:prose-invert=move || dark.get() inner_html=move || ctx.preview_html.get()></article>
            </div>
        </div>
    }
}

#[component]
pub fn App() -> impl IntoView {
    let ctx = Ctx::new();
    provide_context(ctx);
    let state = ctx.state;

    spawn_local(async move {
        match TauriBridge.load_preferences().await {
            Ok(preferences) => state.update(|s| s.set_dark_mode(preferences.is_dark_mode)),
            Err(e) => warn!("{e}"),
        }
    });

    let title = Memo::new(move |_| {
        state.with(|s| (s.current_directory().map(str::to_string), s.active_file().map(str::to_string)))
    });
    Effect::new(move |_| {
        let (directory, file) = title.get();
        spawn_local(async move {
            if let Err(e) = TauriBridge
                .update_window_title(directory.as_deref(), file.as_deref())
                .await
            {
                warn!("{e}");
            }
        });
    });

    let light = Memo::new(move |_| !state.with(|s| s.layout().dark_mode()));

    view! {
        <main class="app-layout" class:light-mode=move || light.get()>
            <TitleBar/>
            <div class="app-body">
                <Sidebar/>
                <div class="main-column">
                    <Toolbar/>
                    <Workspace/>
                </div>
            </div>
        </main>
    }
}
