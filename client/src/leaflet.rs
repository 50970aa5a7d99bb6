use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use js_sys::{Array, Object, Promise, Reflect};
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use relief_shared::assets::LoadCache;
use relief_shared::renderer::{dot_icon_html, dot_icon_size};
use relief_shared::{LatLng, MapBackend, MapViewState, MarkerIcon, PickerConfig, RegionBounds};

#[wasm_bindgen]
extern "C" {
    pub type LeafletMap;

    #[wasm_bindgen(catch, js_namespace = L, js_name = map)]
    fn create_map(container: &web_sys::HtmlElement, options: &JsValue)
    -> Result<LeafletMap, JsValue>;

    #[wasm_bindgen(method, js_name = setView)]
    fn set_view(this: &LeafletMap, center: &JsValue, zoom: f64);

    #[wasm_bindgen(method, js_name = getCenter)]
    fn get_center(this: &LeafletMap) -> JsValue;

    #[wasm_bindgen(method, js_name = getZoom)]
    fn get_zoom(this: &LeafletMap) -> f64;

    #[wasm_bindgen(method)]
    fn on(this: &LeafletMap, event: &str, handler: &js_sys::Function);

    #[wasm_bindgen(method)]
    fn off(this: &LeafletMap, event: &str, handler: &js_sys::Function);

    #[wasm_bindgen(method, js_name = invalidateSize)]
    fn invalidate_size(this: &LeafletMap);

    #[wasm_bindgen(method)]
    fn remove(this: &LeafletMap);

    type TileLayer;

    #[wasm_bindgen(js_namespace = L, js_name = tileLayer)]
    fn tile_layer(url: &str, options: &JsValue) -> TileLayer;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_to(this: &TileLayer, map: &LeafletMap);

    type LayerGroup;

    #[wasm_bindgen(js_namespace = L, js_name = layerGroup)]
    fn layer_group() -> LayerGroup;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_to(this: &LayerGroup, map: &LeafletMap);

    #[wasm_bindgen(method, js_name = addLayer)]
    fn add_layer(this: &LayerGroup, layer: &LeafletMarker);

    #[wasm_bindgen(method, js_name = clearLayers)]
    fn clear_layers(this: &LayerGroup);

    pub type LeafletMarker;

    #[wasm_bindgen(js_namespace = L, js_name = marker)]
    fn create_marker(at: &JsValue, options: &JsValue) -> LeafletMarker;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_to(this: &LeafletMarker, map: &LeafletMap);

    #[wasm_bindgen(method, js_name = bindPopup)]
    fn bind_popup(this: &LeafletMarker, html: &str);

    #[wasm_bindgen(method)]
    fn remove(this: &LeafletMarker);

    #[wasm_bindgen(js_namespace = L, js_name = icon)]
    fn create_icon(options: &JsValue) -> JsValue;

    #[wasm_bindgen(js_namespace = L, js_name = divIcon)]
    fn create_div_icon(options: &JsValue) -> JsValue;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct MapOptions {
    min_zoom: f64,
    max_zoom: f64,
    max_bounds: [[f64; 2]; 2],
    max_bounds_viscosity: f64,
    attribution_control: bool,
    zoom_control: bool,
}

impl MapOptions {
    fn for_region(region: &RegionBounds) -> Self {
        Self {
            min_zoom: region.min_zoom,
            max_zoom: region.max_zoom,
            max_bounds: region.corners(),
            max_bounds_viscosity: 1.0,
            attribution_control: false,
            zoom_control: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TileOptions {
    max_zoom: f64,
    bounds: [[f64; 2]; 2],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinIconOptions {
    icon_url: String,
    icon_retina_url: String,
    shadow_url: String,
    icon_size: [u32; 2],
    icon_anchor: [u32; 2],
    popup_anchor: [i32; 2],
    shadow_size: [u32; 2],
}

impl PinIconOptions {
    /// Leaflet's stock marker images, served next to its stylesheet.
    fn beside_stylesheet(style_url: &str) -> Self {
        let base = match style_url.rfind('/') {
            Some(idx) => &style_url[..=idx],
            None => "",
        };
        Self {
            icon_url: format!("{base}images/marker-icon.png"),
            icon_retina_url: format!("{base}images/marker-icon-2x.png"),
            shadow_url: format!("{base}images/marker-shadow.png"),
            icon_size: [25, 41],
            icon_anchor: [12, 41],
            popup_anchor: [1, -34],
            shadow_size: [41, 41],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct DotIconOptions {
    class_name: &'static str,
    html: String,
    icon_size: [u32; 2],
    icon_anchor: [u32; 2],
    popup_anchor: [i32; 2],
}

impl DotIconOptions {
    fn new(color: &str) -> Self {
        let size = dot_icon_size();
        Self {
            class_name: "relief-dot-marker",
            html: dot_icon_html(color),
            icon_size: [size, size],
            icon_anchor: [size / 2, size / 2],
            popup_anchor: [0, -(size as i32) / 2],
        }
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, String> {
    serde_wasm_bindgen::to_value(value).map_err(|e| format!("options serialization failed: {e}"))
}

fn latlng_js(at: LatLng) -> JsValue {
    Array::of2(&JsValue::from_f64(at.lat), &JsValue::from_f64(at.lng)).into()
}

fn marker_options(icon: &JsValue) -> JsValue {
    let options = Object::new();
    let _ = Reflect::set(&options, &JsValue::from_str("icon"), icon);
    let _ = Reflect::set(
        &options,
        &JsValue::from_str("keyboard"),
        &JsValue::from_bool(false),
    );
    options.into()
}

fn latlng_from_js(latlng: &JsValue) -> Option<LatLng> {
    let lat = Reflect::get(latlng, &JsValue::from_str("lat")).ok()?.as_f64()?;
    let lng = Reflect::get(latlng, &JsValue::from_str("lng")).ok()?.as_f64()?;
    Some(LatLng::new(lat, lng))
}

fn click_latlng(event: &JsValue) -> Option<LatLng> {
    latlng_from_js(&Reflect::get(event, &JsValue::from_str("latlng")).ok()?)
}

/// A live `L.map` bound to one container element.
pub struct LeafletBackend {
    map: LeafletMap,
    layer: LayerGroup,
    pin_icon: JsValue,
    click_handler: Option<Closure<dyn FnMut(JsValue)>>,
    destroyed: bool,
}

impl LeafletBackend {
    /// Creates the map, its tile layer and the marker layer. Requires the
    /// library to be loaded (see [`ensure_leaflet`]).
    pub fn mount(
        container: &web_sys::HtmlElement,
        config: &PickerConfig,
        on_click: Option<Rc<dyn Fn(LatLng)>>,
    ) -> Result<Self, String> {
        let region = &config.region;
        let map = create_map(container, &to_js(&MapOptions::for_region(region))?)
            .map_err(|e| format!("map creation failed: {e:?}"))?;

        let tiles = tile_layer(
            &config.tile_url,
            &to_js(&TileOptions {
                max_zoom: region.max_zoom,
                bounds: region.corners(),
            })?,
        );
        tiles.add_to(&map);

        let layer = layer_group();
        layer.add_to(&map);

        let pin_icon = create_icon(&to_js(&PinIconOptions::beside_stylesheet(
            &config.leaflet_style_url,
        ))?);

        let click_handler = on_click.map(|on_click| {
            let handler = Closure::<dyn FnMut(JsValue)>::new(move |event: JsValue| {
                if let Some(at) = click_latlng(&event) {
                    on_click(at);
                }
            });
            map.on("click", handler.as_ref().unchecked_ref());
            handler
        });

        Ok(Self {
            map,
            layer,
            pin_icon,
            click_handler,
            destroyed: false,
        })
    }

    /// Re-measures the container; needed once the surrounding layout settles.
    pub fn invalidate_size(&self) {
        if !self.destroyed {
            self.map.invalidate_size();
        }
    }

    fn icon_for(&self, icon: &MarkerIcon) -> JsValue {
        match icon {
            MarkerIcon::Pin => self.pin_icon.clone(),
            MarkerIcon::Dot { color } => match to_js(&DotIconOptions::new(color)) {
                Ok(options) => create_div_icon(&options),
                Err(e) => {
                    web_sys::console::warn_1(&e.into());
                    self.pin_icon.clone()
                }
            },
        }
    }
}

impl MapBackend for LeafletBackend {
    type Marker = LeafletMarker;

    fn set_view(&mut self, view: &MapViewState) {
        self.map.set_view(&latlng_js(view.center()), view.zoom);
    }

    fn current_view(&self) -> Option<MapViewState> {
        if self.destroyed {
            return None;
        }
        let center = latlng_from_js(&self.map.get_center())?;
        let zoom = self.map.get_zoom();
        zoom.is_finite().then_some(MapViewState {
            center_lat: center.lat,
            center_lng: center.lng,
            zoom,
        })
    }

    fn add_selection_marker(&mut self, at: LatLng) -> LeafletMarker {
        let marker = create_marker(&latlng_js(at), &marker_options(&self.pin_icon));
        marker.add_to(&self.map);
        marker
    }

    fn remove_selection_marker(&mut self, marker: LeafletMarker) {
        marker.remove();
    }

    fn clear_layer(&mut self) {
        self.layer.clear_layers();
    }

    fn add_layer_marker(&mut self, at: LatLng, icon: &MarkerIcon, popup_html: Option<&str>) {
        let marker = create_marker(&latlng_js(at), &marker_options(&self.icon_for(icon)));
        if let Some(html) = popup_html {
            marker.bind_popup(html);
        }
        self.layer.add_layer(&marker);
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(handler) = self.click_handler.take() {
            self.map.off("click", handler.as_ref().unchecked_ref());
        }
        self.map.remove();
    }
}

#[derive(Clone, Copy)]
enum AssetKind {
    Script,
    Stylesheet,
}

thread_local! {
    static ASSET_LOADS: LoadCache<String> = LoadCache::new();
    static LEAFLET_READY: RefCell<bool> = const { RefCell::new(false) };
}

fn leaflet_global_present() -> bool {
    let Some(window) = web_sys::window() else {
        return false;
    };
    Reflect::get(window.as_ref(), &JsValue::from_str("L"))
        .map(|value| value.is_object())
        .unwrap_or(false)
}

/// Loads Leaflet's stylesheet and script once per page. Concurrent callers
/// share the same in-flight loads.
pub async fn ensure_leaflet(config: &PickerConfig) -> Result<(), String> {
    if LEAFLET_READY.with(|ready| *ready.borrow()) {
        return Ok(());
    }
    if leaflet_global_present() {
        LEAFLET_READY.with(|ready| *ready.borrow_mut() = true);
        return Ok(());
    }

    let style_url = config.leaflet_style_url.clone();
    let script_url = config.leaflet_script_url.clone();
    let style = ASSET_LOADS.with(|cache| {
        cache.load(&style_url, || inject_asset(AssetKind::Stylesheet, style_url.clone()))
    });
    let script = ASSET_LOADS.with(|cache| {
        cache.load(&script_url, || inject_asset(AssetKind::Script, script_url.clone()))
    });

    let (style, script) = futures::join!(style, script);
    if let Err(e) = style {
        web_sys::console::warn_1(&format!("Map stylesheet unavailable: {e}").into());
    }
    script?;
    LEAFLET_READY.with(|ready| *ready.borrow_mut() = true);
    Ok(())
}

fn inject_asset(kind: AssetKind, url: String) -> impl Future<Output = Result<(), String>> {
    let attached = attach_asset(kind, &url);
    async move {
        let loaded = attached?;
        JsFuture::from(loaded)
            .await
            .map(|_| ())
            .map_err(|_| format!("failed to load {url}"))
    }
}

/// Appends the element to `<head>` and returns a promise settled by its
/// `load`/`error` events.
fn attach_asset(kind: AssetKind, url: &str) -> Result<Promise, String> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or("no document")?;
    let head = document.head().ok_or("document has no <head>")?;

    let element: web_sys::Element = match kind {
        AssetKind::Script => {
            let script = document
                .create_element("script")
                .map_err(|e| format!("{e:?}"))?
                .dyn_into::<web_sys::HtmlScriptElement>()
                .map_err(|_| "not a script element")?;
            script.set_src(url);
            script.set_async(true);
            script.into()
        }
        AssetKind::Stylesheet => {
            let link = document
                .create_element("link")
                .map_err(|e| format!("{e:?}"))?
                .dyn_into::<web_sys::HtmlLinkElement>()
                .map_err(|_| "not a link element")?;
            link.set_rel("stylesheet");
            link.set_href(url);
            link.into()
        }
    };

    let target: &web_sys::EventTarget = element.as_ref();
    let loaded = Promise::new(&mut |resolve, reject| {
        let _ = target.add_event_listener_with_callback("load", &resolve);
        let _ = target.add_event_listener_with_callback("error", &reject);
    });
    head.append_child(&element)
        .map_err(|e| format!("append failed: {e:?}"))?;
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_shared::SRI_LANKA;

    #[test]
    fn map_options_lock_view_to_region() {
        let json = serde_json::to_value(MapOptions::for_region(&SRI_LANKA)).expect("serialize");
        assert_eq!(json["attributionControl"], false);
        assert_eq!(json["minZoom"], 7.0);
        assert_eq!(json["maxZoom"], 18.0);
        assert_eq!(
            json["maxBounds"],
            serde_json::json!([[5.9, 79.7], [9.8, 81.9]])
        );
    }

    #[test]
    fn pin_icon_resolves_next_to_stylesheet() {
        let options =
            PinIconOptions::beside_stylesheet("https://unpkg.com/leaflet@1.9.4/dist/leaflet.css");
        assert_eq!(
            options.icon_url,
            "https://unpkg.com/leaflet@1.9.4/dist/images/marker-icon.png"
        );
        assert_eq!(
            options.shadow_url,
            "https://unpkg.com/leaflet@1.9.4/dist/images/marker-shadow.png"
        );
    }

    #[test]
    fn dot_icon_is_centered_on_point() {
        let json = serde_json::to_value(DotIconOptions::new("#ff8800")).expect("serialize");
        let size = dot_icon_size();
        assert_eq!(json["iconSize"], serde_json::json!([size, size]));
        assert_eq!(json["iconAnchor"], serde_json::json!([size / 2, size / 2]));
        assert!(json["html"].as_str().unwrap_or_default().contains("#ff8800"));
        assert_eq!(json["className"], "relief-dot-marker");
    }
}
