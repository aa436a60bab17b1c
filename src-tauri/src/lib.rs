use std::path::Path;
use std::sync::Mutex;

use log::info;
use tauri::{AppHandle, Manager, State, WebviewWindow};
use tauri_plugin_opener::OpenerExt;

pub mod files;
pub mod preferences;
pub mod window;

use preferences::{Preferences, PreferencesStore, PREFERENCES_FILE};
use window::{compose_window_title, validate_external_url};

struct PreferencesState(Mutex<PreferencesStore>);

#[tauri::command]
fn list_markdown_files(directory: &str) -> Result<Vec<String>, String> {
    files::list_markdown_files(Path::new(directory)).map_err(|e| e.to_string())
}

#[tauri::command]
fn create_file(directory: &str, name: &str) -> Result<String, String> {
    files::create_file(Path::new(directory), name).map_err(|e| e.to_string())
}

#[tauri::command]
fn delete_file(path: &str) -> Result<(), String> {
    files::delete_file(Path::new(path)).map_err(|e| e.to_string())
}

#[tauri::command]
fn read_file(path: &str) -> Result<String, String> {
    files::read_file(Path::new(path)).map_err(|e| e.to_string())
}

#[tauri::command]
fn rename_file(path: &str, name: &str) -> Result<String, String> {
    files::rename_file(Path::new(path), name).map_err(|e| e.to_string())
}

#[tauri::command]
fn write_file(path: &str, content: &str) -> Result<(), String> {
    files::write_file(Path::new(path), content).map_err(|e| e.to_string())
}

#[tauri::command]
fn resolve_relative_path(base: &str, relative: &str) -> String {
    files::resolve_relative_path(Path::new(base), relative)
        .to_string_lossy()
        .into_owned()
}

#[tauri::command]
async fn choose_directory() -> Option<String> {
    rfd::AsyncFileDialog::new()
        .pick_folder()
        .await
        .map(|folder| folder.path().to_string_lossy().into_owned())
}

#[tauri::command]
fn load_image(path: &str) -> Result<String, String> {
    files::load_image_data_uri(Path::new(path)).map_err(|e| e.to_string())
}

#[tauri::command]
fn load_preferences(state: State<'_, PreferencesState>) -> Result<Preferences, String> {
    let store = state.0.lock().map_err(|e| e.to_string())?;
    Ok(store.preferences().clone())
}

#[tauri::command]
fn save_preferences(state: State<'_, PreferencesState>, preferences: Preferences) -> Result<(), String> {
    let mut store = state.0.lock().map_err(|e| e.to_string())?;
    store.overwrite(preferences).map_err(|e| e.to_string())
}

#[tauri::command]
fn minimize_window(window: WebviewWindow) -> Result<(), String> {
    window.minimize().map_err(|e| e.to_string())
}

#[tauri::command]
fn toggle_maximize_window(window: WebviewWindow) -> Result<(), String> {
    let result = if window.is_maximized().map_err(|e| e.to_string())? {
        window.unmaximize()
    } else {
        window.maximize()
    };
    result.map_err(|e| e.to_string())
}

#[tauri::command]
fn close_window(window: WebviewWindow) -> Result<(), String> {
    window.close().map_err(|e| e.to_string())
}

#[tauri::command]
fn update_window_title(window: WebviewWindow, directory: Option<String>, file: Option<String>) -> Result<(), String> {
    let title = compose_window_title(directory.as_deref(), file.as_deref());
    window.set_title(&title).map_err(|e| e.to_string())
}

#[tauri::command]
fn open_in_explorer(app: AppHandle, path: &str) -> Result<(), String> {
    app.opener()
        .open_path(path, None::<&str>)
        .map_err(|e| e.to_string())
}

#[tauri::command]
fn open_external_link(app: AppHandle, url: &str) -> Result<(), String> {
    let url = validate_external_url(url).map_err(|e| e.to_string())?;
    app.opener()
        .open_url(url, None::<&str>)
        .map_err(|e| e.to_string())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let path = app.path().app_config_dir()?.join(PREFERENCES_FILE);
            let store = PreferencesStore::load_or_default(&path);
            info!("preferences at {}", store.path().display());
            app.manage(PreferencesState(Mutex::new(store)));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            list_markdown_files,
            create_file,
            delete_file,
            read_file,
            rename_file,
            write_file,
            resolve_relative_path,
            choose_directory,
            load_image,
            load_preferences,
            save_preferences,
            minimize_window,
            toggle_maximize_window,
            close_window,
            update_window_title,
            open_in_explorer,
            open_external_link
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
