//! In-memory fakes shared by the unit tests of this crate.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config::PositionRequest;
use crate::error::PlatformError;
use crate::location::GeoSample;
use crate::resolver::{LocationPlatform, PlatformCallback, WatchId};

pub(crate) fn sample(lat: f64, lng: f64, accuracy_meters: f64) -> GeoSample {
    GeoSample {
        lat,
        lng,
        accuracy_meters,
        captured_at_ms: 0.0,
    }
}

#[derive(Default)]
struct FakeState {
    unsupported: bool,
    refuse_watches: Cell<bool>,
    now_ms: Cell<f64>,
    fix_callbacks: RefCell<Vec<PlatformCallback>>,
    watch_callbacks: RefCell<Vec<PlatformCallback>>,
    cleared: RefCell<Vec<WatchId>>,
}

/// Scripted location platform. Tests push fixes and watch samples by hand.
#[derive(Clone, Default)]
pub(crate) struct FakePlatform(Rc<FakeState>);

impl FakePlatform {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn unsupported() -> Self {
        Self(Rc::new(FakeState {
            unsupported: true,
            ..FakeState::default()
        }))
    }

    pub(crate) fn refuse_watches(&self) {
        self.0.refuse_watches.set(true);
    }

    pub(crate) fn advance(&self, ms: f64) {
        self.0.now_ms.set(self.0.now_ms.get() + ms);
    }

    /// Deliver to the most recent one-shot fix callback.
    pub(crate) fn deliver_fix(&self, event: Result<GeoSample, PlatformError>) {
        let callback = self.0.fix_callbacks.borrow().last().cloned();
        if let Some(callback) = callback {
            callback(event);
        }
    }

    /// Deliver to the most recently started watch, cleared or not.
    pub(crate) fn deliver_watch(&self, event: Result<GeoSample, PlatformError>) {
        let callback = self.0.watch_callbacks.borrow().last().cloned();
        if let Some(callback) = callback {
            callback(event);
        }
    }

    pub(crate) fn fix_requests(&self) -> usize {
        self.0.fix_callbacks.borrow().len()
    }

    pub(crate) fn watch_starts(&self) -> usize {
        self.0.watch_callbacks.borrow().len()
    }

    pub(crate) fn cleared(&self) -> Vec<WatchId> {
        self.0.cleared.borrow().clone()
    }
}

impl LocationPlatform for FakePlatform {
    fn is_supported(&self) -> bool {
        !self.0.unsupported
    }

    fn current_position(
        &self,
        _options: &PositionRequest,
        callback: PlatformCallback,
    ) -> Result<(), PlatformError> {
        self.0.fix_callbacks.borrow_mut().push(callback);
        Ok(())
    }

    fn watch_position(
        &self,
        _options: &PositionRequest,
        callback: PlatformCallback,
    ) -> Result<WatchId, PlatformError> {
        if self.0.refuse_watches.get() {
            return Err(PlatformError::PositionUnavailable);
        }
        let mut callbacks = self.0.watch_callbacks.borrow_mut();
        callbacks.push(callback);
        Ok(WatchId(callbacks.len() as i32))
    }

    fn clear_watch(&self, id: WatchId) {
        self.0.cleared.borrow_mut().push(id);
    }

    fn now_ms(&self) -> f64 {
        self.0.now_ms.get()
    }
}
