mod app;
mod config;
mod geocoder;
mod geolocation;
mod leaflet;
mod location_picker;
mod map_view;

use std::any::Any;
use std::cell::RefCell;

use leptos::mount::mount_to;
use wasm_bindgen::JsCast;

thread_local! {
    static MOUNTED_APP: RefCell<Option<Box<dyn Any>>> = RefCell::new(None);
}

/// `#app` when the page provides one, `<body>` otherwise.
fn mount_target() -> Option<web_sys::HtmlElement> {
    let document = web_sys::window()?.document()?;
    document
        .get_element_by_id("app")
        .and_then(|node| node.dyn_into::<web_sys::HtmlElement>().ok())
        .or_else(|| document.body())
}

fn main() {
    console_error_panic_hook::set_once();
    let Some(target) = mount_target() else {
        web_sys::console::warn_1(&"No element to mount the relief app into".into());
        return;
    };

    MOUNTED_APP.with(move |slot| {
        // A second main() replaces the first mount; its pickers and maps clean up on drop.
        drop(slot.borrow_mut().take());
        *slot.borrow_mut() = Some(Box::new(mount_to(target, app::App)));
    });
}
