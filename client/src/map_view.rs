use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use relief_shared::{LatLng, MapRenderer, MarkerSpec, PickerConfig, SelectedLocation};

use crate::config::use_picker_settings;
use crate::leaflet::{LeafletBackend, ensure_leaflet};

const INVALIDATE_SIZE_DELAY_MS: u32 = 100;

type LeafletRenderer = MapRenderer<LeafletBackend>;

thread_local! {
    /// Live map instances by component id. An entry exists from component
    /// creation until cleanup; it holds a renderer once the library has loaded.
    static MAPS: RefCell<HashMap<u64, Option<LeafletRenderer>>> = RefCell::new(HashMap::new());
    static NEXT_MAP_ID: Cell<u64> = const { Cell::new(1) };
}

fn register_map() -> u64 {
    let id = NEXT_MAP_ID.with(|next| {
        let id = next.get();
        next.set(id.wrapping_add(1));
        id
    });
    MAPS.with(|maps| maps.borrow_mut().insert(id, None));
    id
}

fn release_map(id: u64) {
    let renderer = MAPS.with(|maps| maps.borrow_mut().remove(&id).flatten());
    if let Some(renderer) = renderer {
        renderer.release();
    }
}

/// Stores the renderer unless the component was torn down while loading.
fn install_map(id: u64, renderer: LeafletRenderer) -> bool {
    MAPS.with(|maps| match maps.borrow_mut().get_mut(&id) {
        Some(slot) => {
            *slot = Some(renderer);
            true
        }
        None => false,
    })
}

fn is_registered(id: u64) -> bool {
    MAPS.with(|maps| maps.borrow().contains_key(&id))
}

fn with_map(id: u64, f: impl FnOnce(&mut LeafletRenderer)) {
    MAPS.with(|maps| {
        if let Some(Some(renderer)) = maps.borrow_mut().get_mut(&id) {
            f(renderer);
        }
    });
}

/// A Leaflet map locked to the configured region, showing the current
/// selection as a pin plus any number of colored, popup-bearing markers.
#[component]
pub fn MapView(
    #[prop(into, optional)] center: MaybeProp<LatLng>,
    #[prop(into, optional)] zoom: MaybeProp<f64>,
    #[prop(into, optional)] marker: MaybeProp<SelectedLocation>,
    #[prop(into, optional)] markers: MaybeProp<Vec<MarkerSpec>>,
    #[prop(optional)] on_map_click: Option<Callback<LatLng>>,
    #[prop(into, default = "400px".to_string())] height: String,
) -> impl IntoView {
    let settings = use_picker_settings();
    let container = NodeRef::<leptos::html::Div>::new();
    let ready = RwSignal::new(false);
    let load_error = RwSignal::new(None::<String>);
    let map_id = register_map();
    let started = Rc::new(Cell::new(false));

    on_cleanup(move || release_map(map_id));

    Effect::new(move || {
        let Some(element) = container.get() else {
            return;
        };
        let Some(config) = settings.get() else {
            return;
        };
        if started.replace(true) {
            return;
        }
        let element: web_sys::HtmlElement = (*element).clone();
        let initial_center = center.get_untracked();
        let initial_zoom = zoom.get_untracked();
        spawn_local(async move {
            if let Err(e) = ensure_leaflet(&config).await {
                web_sys::console::warn_1(&format!("Map library failed to load: {e}").into());
                if is_registered(map_id) {
                    load_error.set(Some("Map could not be loaded.".into()));
                }
                return;
            }
            if !is_registered(map_id) {
                return;
            }
            match mount_map(map_id, &element, &config, initial_center, initial_zoom, on_map_click)
            {
                Ok(()) => ready.set(true),
                Err(e) => {
                    web_sys::console::warn_1(&format!("Map mount failed: {e}").into());
                    load_error.set(Some("Map could not be loaded.".into()));
                }
            }
        });
    });

    Effect::new(move || {
        let selection = marker.get();
        if ready.get() {
            with_map(map_id, |renderer| {
                renderer.set_selection_marker(selection.as_ref());
            });
        }
    });

    // The whole marker layer is rebuilt on each change; marker counts stay small.
    Effect::new(move || {
        let specs = markers.get().unwrap_or_default();
        if ready.get() {
            with_map(map_id, |renderer| renderer.set_markers(&specs));
        }
    });

    Effect::new(move || {
        let next_center = center.get();
        let next_zoom = zoom.get();
        if !ready.get() || (next_center.is_none() && next_zoom.is_none()) {
            return;
        }
        with_map(map_id, |renderer| {
            let current = renderer.view();
            renderer.set_view(
                next_center.unwrap_or_else(|| current.center()),
                next_zoom.unwrap_or(current.zoom),
            );
        });
    });

    let style = format!("height: {height}; width: 100%; position: relative;");
    view! {
        <div class="relief-map-frame" style=style>
            <div node_ref=container class="relief-map" style="height: 100%; width: 100%;"></div>
            {move || {
                load_error
                    .get()
                    .map(|message| view! { <div class="relief-map-error" role="alert">{message}</div> })
            }}
        </div>
    }
}

fn mount_map(
    map_id: u64,
    element: &web_sys::HtmlElement,
    config: &PickerConfig,
    center: Option<LatLng>,
    zoom: Option<f64>,
    on_map_click: Option<Callback<LatLng>>,
) -> Result<(), String> {
    let on_click = on_map_click.map(|callback| {
        Rc::new(move |at: LatLng| callback.run(at)) as Rc<dyn Fn(LatLng)>
    });
    let backend = LeafletBackend::mount(element, config, on_click)?;
    let renderer = MapRenderer::acquire(
        backend,
        config.region,
        center.unwrap_or(config.default_center),
        zoom.unwrap_or(config.default_zoom),
    );
    if !install_map(map_id, renderer) {
        return Err("map was torn down while mounting".into());
    }

    // Leaflet measures its container at creation; re-measure after layout settles.
    spawn_local(async move {
        gloo_timers::future::TimeoutFuture::new(INVALIDATE_SIZE_DELAY_MS).await;
        with_map(map_id, |renderer| renderer.backend().invalidate_size());
    });
    Ok(())
}
