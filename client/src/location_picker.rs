use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use relief_shared::{LatLng, MarkerSpec, PickOutcome, PickerConfig, SelectedLocation};

use crate::config::use_picker_settings;
use crate::geocoder::NominatimLookup;
use crate::geolocation::BrowserGeolocation;
use crate::map_view::MapView;

type Controller = relief_shared::LocationPicker<BrowserGeolocation, NominatimLookup>;

thread_local! {
    /// Controllers by component id. The entry is created with the component and
    /// the controller itself on first use, once settings are known.
    static CONTROLLERS: RefCell<HashMap<u64, Option<Rc<Controller>>>> = RefCell::new(HashMap::new());
    static NEXT_PICKER_ID: Cell<u64> = const { Cell::new(1) };
}

fn register_picker() -> u64 {
    let id = NEXT_PICKER_ID.with(|next| {
        let id = next.get();
        next.set(id.wrapping_add(1));
        id
    });
    CONTROLLERS.with(|controllers| controllers.borrow_mut().insert(id, None));
    id
}

fn release_picker(id: u64) {
    let controller = CONTROLLERS.with(|controllers| controllers.borrow_mut().remove(&id).flatten());
    if let Some(controller) = controller {
        controller.cancel();
    }
}

/// The picker's controller, created on demand. `None` once the component is gone.
fn controller_for(id: u64, config: &PickerConfig) -> Option<Rc<Controller>> {
    CONTROLLERS.with(|controllers| {
        let mut controllers = controllers.borrow_mut();
        let slot = controllers.get_mut(&id)?;
        let controller = slot.get_or_insert_with(|| {
            Rc::new(Controller::new(
                BrowserGeolocation::new(),
                NominatimLookup::new(config.geocode_endpoint.clone()),
                config.policy(),
            ))
        });
        Some(controller.clone())
    })
}

#[derive(Clone, Copy)]
enum PickAction {
    CurrentLocation,
    MapClick(LatLng),
}

/// Form field for choosing a point: "use current location" or a click on the map.
///
/// `on_change` only ever receives committed selections. Failures show a message
/// and keep `value` as it was.
#[component]
pub fn LocationPicker(
    #[prop(into)] value: Signal<Option<SelectedLocation>>,
    #[prop(into)] on_change: Callback<SelectedLocation>,
    #[prop(into, optional)] label: Option<String>,
    #[prop(optional)] required: bool,
    #[prop(into, optional)] markers: MaybeProp<Vec<MarkerSpec>>,
    #[prop(into, default = "320px".to_string())] map_height: String,
) -> impl IntoView {
    let settings = use_picker_settings();
    let picker_id = register_picker();
    let busy = RwSignal::new(false);
    let error = RwSignal::new(None::<String>);

    on_cleanup(move || release_picker(picker_id));

    let run = move |action: PickAction| {
        let config = settings.get_untracked().unwrap_or_default();
        let Some(controller) = controller_for(picker_id, &config) else {
            return;
        };
        error.set(None);
        busy.set(matches!(action, PickAction::CurrentLocation));
        spawn_local(async move {
            let outcome = match action {
                PickAction::CurrentLocation => controller.use_current_location().await,
                PickAction::MapClick(at) => controller.select_point(at.lat, at.lng).await,
            };
            match outcome {
                PickOutcome::Selected(location) => {
                    busy.set(false);
                    on_change.run(location);
                }
                PickOutcome::Failed(err) => {
                    busy.set(false);
                    error.set(err.user_message());
                }
                PickOutcome::Superseded => {}
            }
        });
    };

    let on_map_click = Callback::new(move |at: LatLng| run(PickAction::MapClick(at)));
    let center = Signal::derive(move || value.get().map(|location| location.position()));

    view! {
        <div class="relief-picker">
            {label.map(|text| {
                view! {
                    <label class="relief-picker-label">
                        {text}
                        {required.then(|| view! { <span class="relief-picker-required">" *"</span> })}
                    </label>
                }
            })}
            <button
                type="button"
                class="relief-picker-locate"
                disabled=move || busy.get()
                aria-busy=move || busy.get().to_string()
                on:click=move |_| run(PickAction::CurrentLocation)
            >
                {move || if busy.get() { "Locating…" } else { "Use current location" }}
            </button>
            {move || {
                error
                    .get()
                    .map(|message| view! { <p class="relief-picker-error" role="alert">{message}</p> })
            }}
            <MapView
                center=center
                marker=value
                markers=markers
                on_map_click=on_map_click
                height=map_height
            />
            {move || {
                value
                    .get()
                    .map(|location| {
                        let coords = format!("{:.6}, {:.6}", location.lat, location.lng);
                        view! {
                            <div class="relief-picker-selection">
                                <p class="relief-picker-address">{location.display_label()}</p>
                                <p class="relief-picker-coords">{coords}</p>
                            </div>
                        }
                    })
            }}
            {move || {
                (required && value.get().is_none())
                    .then(|| view! { <p class="relief-picker-hint">"Select a location to continue."</p> })
            }}
        </div>
    }
}
