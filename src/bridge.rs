//! Requests to the application shell.
//!
//! Every call the front end makes crosses the webview boundary as one of the
//! [`Request`] variants; the set is closed, so an unknown command cannot be
//! built. [`FileAccess`] is the slice of it the core logic depends on, which
//! lets tests swap the shell for an in-memory fake.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["window", "__TAURI__", "core"])]
    async fn invoke(cmd: &str, args: JsValue) -> Result<JsValue, JsValue>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("{command} failed: {message}")]
    Rejected {
        command: &'static str,
        message: String,
    },
    #[error("could not encode arguments for {command}: {message}")]
    Encode {
        command: &'static str,
        message: String,
    },
    #[error("unexpected reply from {command}: {message}")]
    Decode {
        command: &'static str,
        message: String,
    },
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default = "default_dark_mode")]
    pub is_dark_mode: bool,
}

fn default_dark_mode() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            is_dark_mode: default_dark_mode(),
        }
    }
}

/// The closed set of shell commands. Serializes to the command's argument
/// object; [`Request::command`] names the handler.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Request<'a> {
    ListMarkdownFiles { directory: &'a str },
    CreateFile { directory: &'a str, name: &'a str },
    DeleteFile { path: &'a str },
    ReadFile { path: &'a str },
    RenameFile { path: &'a str, name: &'a str },
    WriteFile { path: &'a str, content: &'a str },
    ResolveRelativePath { base: &'a str, relative: &'a str },
    ChooseDirectory,
    LoadImage { path: &'a str },
    LoadPreferences,
    SavePreferences { preferences: Preferences },
    UpdateWindowTitle { directory: Option<&'a str>, file: Option<&'a str> },
    OpenInExplorer { path: &'a str },
    OpenExternalLink { url: &'a str },
    MinimizeWindow,
    ToggleMaximizeWindow,
    CloseWindow,
}

impl Request<'_> {
    pub fn command(&self) -> &'static str {
        match self {
            Request::ListMarkdownFiles { .. } => "list_markdown_files",
            Request::CreateFile { .. } => "create_file",
            Request::DeleteFile { .. } => "delete_file",
            Request::ReadFile { .. } => "read_file",
            Request::RenameFile { .. } => "rename_file",
            Request::WriteFile { .. } => "write_file",
            Request::ResolveRelativePath { .. } => "resolve_relative_path",
            Request::ChooseDirectory => "choose_directory",
            Request::LoadImage { .. } => "load_image",
            Request::LoadPreferences => "load_preferences",
            Request::SavePreferences { .. } => "save_preferences",
            Request::UpdateWindowTitle { .. } => "update_window_title",
            Request::OpenInExplorer { .. } => "open_in_explorer",
            Request::OpenExternalLink { .. } => "open_external_link",
            Request::MinimizeWindow => "minimize_window",
            Request::ToggleMaximizeWindow => "toggle_maximize_window",
            Request::CloseWindow => "close_window",
        }
    }
}

/// File operations the reconciler and controller depend on.
#[allow(async_fn_in_trait)]
pub trait FileAccess {
    async fn list_markdown_files(&self, directory: &str) -> Result<Vec<String>, BridgeError>;
    async fn create_file(&self, directory: &str, name: &str) -> Result<String, BridgeError>;
    async fn delete_file(&self, path: &str) -> Result<(), BridgeError>;
    /// A missing file is created empty by the shell and reads as `""`.
    async fn read_file(&self, path: &str) -> Result<String, BridgeError>;
    async fn rename_file(&self, path: &str, name: &str) -> Result<String, BridgeError>;
    async fn write_file(&self, path: &str, content: &str) -> Result<(), BridgeError>;
    async fn resolve_relative_path(&self, base: &str, relative: &str) -> Result<String, BridgeError>;
    /// `Ok(None)` when the user cancels the dialog.
    async fn choose_directory(&self) -> Result<Option<String>, BridgeError>;
}

/// [`FileAccess`] and the remaining shell commands over Tauri's `invoke`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TauriBridge;

impl TauriBridge {
    pub async fn call<T: DeserializeOwned>(&self, request: Request<'_>) -> Result<T, BridgeError> {
        let command = request.command();
        let args = match request {
            // Argument-less commands take no payload.
            Request::ChooseDirectory
            | Request::LoadPreferences
            | Request::MinimizeWindow
            | Request::ToggleMaximizeWindow
            | Request::CloseWindow => JsValue::NULL,
            _ => serde_wasm_bindgen::to_value(&request).map_err(|e| BridgeError::Encode {
                command,
                message: e.to_string(),
            })?,
        };
        let reply = invoke(command, args).await.map_err(|e| BridgeError::Rejected {
            command,
            message: e.as_string().unwrap_or_else(|| format!("{e:?}")),
        })?;
        serde_wasm_bindgen::from_value(reply).map_err(|e| BridgeError::Decode {
            command,
            message: e.to_string(),
        })
    }

    pub async fn load_image(&self, path: &str) -> Result<String, BridgeError> {
        self.call(Request::LoadImage { path }).await
    }

    pub async fn load_preferences(&self) -> Result<Preferences, BridgeError> {
        self.call(Request::LoadPreferences).await
    }

    pub async fn save_preferences(&self, preferences: Preferences) -> Result<(), BridgeError> {
        self.call(Request::SavePreferences { preferences }).await
    }

    pub async fn update_window_title(&self, directory: Option<&str>, file: Option<&str>) -> Result<(), BridgeError> {
        self.call(Request::UpdateWindowTitle { directory, file }).await
    }

    pub async fn open_in_explorer(&self, path: &str) -> Result<(), BridgeError> {
        self.call(Request::OpenInExplorer { path }).await
    }

    pub async fn open_external_link(&self, url: &str) -> Result<(), BridgeError> {
        self.call(Request::OpenExternalLink { url }).await
    }

    pub async fn window(&self, request: Request<'_>) -> Result<(), BridgeError> {
        self.call(request).await
    }
}

impl FileAccess for TauriBridge {
    async fn list_markdown_files(&self, directory: &str) -> Result<Vec<String>, BridgeError> {
        self.call(Request::ListMarkdownFiles { directory }).await
    }

    async fn create_file(&self, directory: &str, name: &str) -> Result<String, BridgeError> {
        self.call(Request::CreateFile { directory, name }).await
    }

    async fn delete_file(&self, path: &str) -> Result<(), BridgeError> {
        self.call(Request::DeleteFile { path }).await
    }

    async fn read_file(&self, path: &str) -> Result<String, BridgeError> {
        self.call(Request::ReadFile { path }).await
    }

    async fn rename_file(&self, path: &str, name: &str) -> Result<String, BridgeError> {
        self.call(Request::RenameFile { path, name }).await
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), BridgeError> {
        self.call(Request::WriteFile { path, content }).await
    }

    async fn resolve_relative_path(&self, base: &str, relative: &str) -> Result<String, BridgeError> {
        self.call(Request::ResolveRelativePath { base, relative }).await
    }

    async fn choose_directory(&self) -> Result<Option<String>, BridgeError> {
        self.call(Request::ChooseDirectory).await
    }
}
