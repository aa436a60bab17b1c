mod app;
mod bridge;
mod controller;
mod debounce;
mod editor_core;
mod file_list;
mod logging;
mod preview;
mod scroll_sync;
mod shortcuts;
mod store;

use app::*;
use leptos::prelude::*;

fn main() {
    console_error_panic_hook::set_once();
    logging::init();
    mount_to_body(|| {
        view! {
            <App/>
        }
    })
}
