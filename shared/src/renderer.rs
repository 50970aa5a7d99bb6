//! Map rendering over an abstract map backend.
//!
//! [`MapRenderer`] owns one map instance for its whole life: it is acquired with a
//! backend already bound to a container and releases it on drop. Callers only get
//! the narrow command surface (`set_view`, `set_selection_marker`, `set_markers`).

use crate::location::{LatLng, MarkerSpec, SelectedLocation};
use crate::region::{MapViewState, RegionBounds};

const DOT_SIZE_PX: u32 = 18;

/// How a batch-layer marker is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerIcon {
    /// The library's default pin.
    Pin,
    /// A filled circle in the given `#rrggbb` color.
    Dot { color: String },
}

impl MarkerIcon {
    pub fn for_spec(spec: &MarkerSpec) -> Self {
        spec.color_hex
            .as_deref()
            .and_then(normalize_hex_color)
            .map(|color| Self::Dot { color })
            .unwrap_or(Self::Pin)
    }
}

/// Accept `#rgb` or `#rrggbb` (leading `#` optional); return lowercase `#rrggbb`.
pub fn normalize_hex_color(input: &str) -> Option<String> {
    let hex = input.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    Some(format!("#{}", expanded.to_ascii_lowercase()))
}

/// Inner HTML of a colored circular marker icon.
pub fn dot_icon_html(color: &str) -> String {
    format!(
        "<div style=\"width:{DOT_SIZE_PX}px;height:{DOT_SIZE_PX}px;border-radius:50%;background:{color};border:2px solid #ffffff;box-shadow:0 0 4px rgba(0,0,0,0.45);box-sizing:border-box;\"></div>"
    )
}

pub const fn dot_icon_size() -> u32 {
    DOT_SIZE_PX
}

/// Primitive operations a concrete map library has to provide.
pub trait MapBackend {
    type Marker;

    fn set_view(&mut self, view: &MapViewState);
    /// The view on screen right now, including user pans and zooms, when the
    /// library can report it.
    fn current_view(&self) -> Option<MapViewState> {
        None
    }
    fn add_selection_marker(&mut self, at: LatLng) -> Self::Marker;
    fn remove_selection_marker(&mut self, marker: Self::Marker);
    /// Remove every marker from the batch layer.
    fn clear_layer(&mut self);
    fn add_layer_marker(&mut self, at: LatLng, icon: &MarkerIcon, popup_html: Option<&str>);
    /// Tear down the map instance and its listeners.
    fn destroy(&mut self);
}

pub struct MapRenderer<B: MapBackend> {
    backend: B,
    region: RegionBounds,
    view: MapViewState,
    selection: Option<B::Marker>,
    layer_len: usize,
    released: bool,
}

impl<B: MapBackend> MapRenderer<B> {
    pub fn acquire(mut backend: B, region: RegionBounds, center: LatLng, zoom: f64) -> Self {
        let view = MapViewState::clamped(&region, center, zoom);
        backend.set_view(&view);
        Self {
            backend,
            region,
            view,
            selection: None,
            layer_len: 0,
            released: false,
        }
    }

    /// The live view when the backend reports one, else the last one applied.
    pub fn view(&self) -> MapViewState {
        self.backend.current_view().unwrap_or(self.view)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn marker_count(&self) -> usize {
        self.layer_len
    }

    pub fn has_selection_marker(&self) -> bool {
        self.selection.is_some()
    }

    /// Recenter, clamping into the region. Returns the view actually applied.
    pub fn set_view(&mut self, center: LatLng, zoom: f64) -> MapViewState {
        let view = MapViewState::clamped(&self.region, center, zoom);
        if view != self.view() {
            self.backend.set_view(&view);
        }
        self.view = view;
        view
    }

    /// Replace the selection marker wholesale; `None` removes it.
    pub fn set_selection_marker(&mut self, location: Option<&SelectedLocation>) {
        if let Some(previous) = self.selection.take() {
            self.backend.remove_selection_marker(previous);
        }
        if let Some(location) = location {
            self.selection = Some(self.backend.add_selection_marker(location.position()));
        }
    }

    /// Rebuild the batch layer from `markers`. Nothing from earlier calls survives.
    pub fn set_markers(&mut self, markers: &[MarkerSpec]) {
        self.backend.clear_layer();
        for spec in markers {
            let icon = MarkerIcon::for_spec(spec);
            self.backend
                .add_layer_marker(spec.position, &icon, spec.popup_html.as_deref());
        }
        self.layer_len = markers.len();
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(marker) = self.selection.take() {
            self.backend.remove_selection_marker(marker);
        }
        self.backend.clear_layer();
        self.layer_len = 0;
        self.backend.destroy();
    }
}

impl<B: MapBackend> Drop for MapRenderer<B> {
    fn drop(&mut self) {
        self.release_inner();
    }
}
