use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use web_sys::{Geolocation, PositionOptions};

use relief_shared::{
    GeoSample, LocationPlatform, PlatformCallback, PlatformError, PositionRequest, WatchId,
};

type PositionClosure = Closure<dyn FnMut(JsValue)>;

/// JS-side handlers for one `getCurrentPosition` or `watchPosition` call.
struct HandlerPair {
    position_handler: PositionClosure,
    error_handler: PositionClosure,
}

impl HandlerPair {
    fn new(callback: PlatformCallback) -> Self {
        let on_position_cb = callback.clone();
        let on_position = Closure::<dyn FnMut(JsValue)>::new(move |position: JsValue| {
            match sample_from_position(&position) {
                Some(sample) => on_position_cb(Ok(sample)),
                None => on_position_cb(Err(PlatformError::PositionUnavailable)),
            }
        });
        let on_error = Closure::<dyn FnMut(JsValue)>::new(move |error: JsValue| {
            callback(Err(platform_error(&error)));
        });
        Self {
            position_handler: on_position,
            error_handler: on_error,
        }
    }

    fn on_position(&self) -> &js_sys::Function {
        self.position_handler.as_ref().unchecked_ref()
    }

    fn on_error(&self) -> &js_sys::Function {
        self.error_handler.as_ref().unchecked_ref()
    }

    /// Free the handlers after the current JS task, so a handler that clears its
    /// own watch is not dropped while still running.
    fn retire(self) {
        wasm_bindgen_futures::spawn_local(async move {
            drop(self);
        });
    }
}

/// Values kept alive until the browser settles the request they belong to.
///
/// `getCurrentPosition` cannot be cancelled: its handlers must outlive both a
/// newer request and the platform itself, and are released by the handler that
/// fires.
struct PendingFixes<H> {
    next_id: Cell<u64>,
    entries: RefCell<HashMap<u64, H>>,
}

impl<H> PendingFixes<H> {
    fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            entries: RefCell::new(HashMap::new()),
        }
    }

    fn reserve(&self) -> u64 {
        let id = self.next_id.get().wrapping_add(1);
        self.next_id.set(id);
        id
    }

    fn hold(&self, id: u64, value: H) {
        self.entries.borrow_mut().insert(id, value);
    }

    fn settle(&self, id: u64) -> Option<H> {
        self.entries.borrow_mut().remove(&id)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

/// `navigator.geolocation` behind [`LocationPlatform`].
pub struct BrowserGeolocation {
    geolocation: Option<Geolocation>,
    pending_fixes: Rc<PendingFixes<HandlerPair>>,
    watches: RefCell<HashMap<i32, HandlerPair>>,
}

impl BrowserGeolocation {
    pub fn new() -> Self {
        Self {
            geolocation: detect_geolocation(),
            pending_fixes: Rc::new(PendingFixes::new()),
            watches: RefCell::new(HashMap::new()),
        }
    }
}

impl Default for BrowserGeolocation {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BrowserGeolocation {
    fn drop(&mut self) {
        if let Some(geolocation) = self.geolocation.as_ref() {
            for (id, handlers) in self.watches.borrow_mut().drain() {
                geolocation.clear_watch(id);
                handlers.retire();
            }
        }
    }
}

impl LocationPlatform for BrowserGeolocation {
    fn is_supported(&self) -> bool {
        self.geolocation.is_some()
    }

    fn current_position(
        &self,
        options: &PositionRequest,
        callback: PlatformCallback,
    ) -> Result<(), PlatformError> {
        let Some(geolocation) = self.geolocation.as_ref() else {
            return Err(PlatformError::PositionUnavailable);
        };
        // The pair owns a strong handle on the registry until one handler fires,
        // so it also survives this platform being dropped.
        let fix_id = self.pending_fixes.reserve();
        let pending = Rc::clone(&self.pending_fixes);
        let handlers = HandlerPair::new(Rc::new(move |event: Result<GeoSample, PlatformError>| {
            if let Some(settled) = pending.settle(fix_id) {
                settled.retire();
            }
            callback(event);
        }));
        geolocation
            .get_current_position_with_error_callback_and_options(
                handlers.on_position(),
                Some(handlers.on_error()),
                &position_options(options),
            )
            .map_err(|_| PlatformError::PositionUnavailable)?;

        self.pending_fixes.hold(fix_id, handlers);
        Ok(())
    }

    fn watch_position(
        &self,
        options: &PositionRequest,
        callback: PlatformCallback,
    ) -> Result<WatchId, PlatformError> {
        let Some(geolocation) = self.geolocation.as_ref() else {
            return Err(PlatformError::PositionUnavailable);
        };
        let handlers = HandlerPair::new(callback);
        let id = geolocation
            .watch_position_with_error_callback_and_options(
                handlers.on_position(),
                Some(handlers.on_error()),
                &position_options(options),
            )
            .map_err(|_| PlatformError::PositionUnavailable)?;
        self.watches.borrow_mut().insert(id, handlers);
        Ok(WatchId(id))
    }

    fn clear_watch(&self, id: WatchId) {
        if let Some(geolocation) = self.geolocation.as_ref() {
            geolocation.clear_watch(id.0);
        }
        let handlers = self.watches.borrow_mut().remove(&id.0);
        if let Some(handlers) = handlers {
            handlers.retire();
        }
    }

    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}

fn detect_geolocation() -> Option<Geolocation> {
    let window = web_sys::window()?;
    let navigator = window.navigator();
    let present = Reflect::get(navigator.as_ref(), &JsValue::from_str("geolocation"))
        .map(|value| !value.is_undefined() && !value.is_null())
        .unwrap_or(false);
    if !present {
        return None;
    }
    navigator.geolocation().ok()
}

fn position_options(request: &PositionRequest) -> PositionOptions {
    let options = PositionOptions::new();
    options.set_enable_high_accuracy(request.high_accuracy);
    options.set_timeout(request.timeout_ms);
    options.set_maximum_age(request.max_age_ms);
    options
}

fn number_field(target: &JsValue, key: &str) -> Option<f64> {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .and_then(|value| value.as_f64())
}

fn sample_from_position(position: &JsValue) -> Option<GeoSample> {
    let coords = Reflect::get(position, &JsValue::from_str("coords")).ok()?;
    Some(GeoSample {
        lat: number_field(&coords, "latitude")?,
        lng: number_field(&coords, "longitude")?,
        accuracy_meters: number_field(&coords, "accuracy").unwrap_or(f64::INFINITY),
        captured_at_ms: number_field(position, "timestamp").unwrap_or_else(js_sys::Date::now),
    })
}

fn platform_error(error: &JsValue) -> PlatformError {
    let code = number_field(error, "code").unwrap_or(0.0);
    PlatformError::from_code(code as u16)
}
