use leptos::prelude::*;

use relief_shared::{MarkerSpec, SelectedLocation};

use crate::config::provide_picker_settings;
use crate::location_picker::LocationPicker;

/// Points already reported, shown as colored markers beneath the picker.
fn reported_points() -> Vec<MarkerSpec> {
    vec![
        MarkerSpec::at(6.9271, 79.8612)
            .with_popup("<strong>Colombo</strong><br>Water and dry rations")
            .with_color("#d9534f"),
        MarkerSpec::at(7.2906, 80.6337)
            .with_popup("<strong>Kandy</strong><br>Medical supplies")
            .with_color("#f0ad4e"),
        MarkerSpec::at(9.6615, 80.0255)
            .with_popup("<strong>Jaffna</strong><br>Temporary shelter")
            .with_color("#0275d8"),
        MarkerSpec::at(6.0535, 80.2210).with_popup("<strong>Galle</strong>"),
    ]
}

#[component]
pub fn App() -> impl IntoView {
    provide_picker_settings();

    let location = RwSignal::new(None::<SelectedLocation>);
    let markers = Signal::derive(|| Some(reported_points()));
    let payload = move || {
        location
            .get()
            .and_then(|selected| serde_json::to_string_pretty(&selected).ok())
            .unwrap_or_else(|| "No location selected".to_string())
    };

    view! {
        <main class="relief-app">
            <h1>"Report a need"</h1>
            <form class="relief-form" on:submit=|ev| ev.prevent_default()>
                <LocationPicker
                    value=location
                    on_change=Callback::new(move |selected: SelectedLocation| location.set(Some(selected)))
                    label="Location"
                    required=true
                    markers=markers
                />
            </form>
            <pre class="relief-payload">{payload}</pre>
        </main>
    }
}
