//! Progressive-accuracy location acquisition.
//!
//! One request asks the platform for a single high-accuracy fix. A fix within the
//! accuracy threshold commits immediately; otherwise a continuous watch refines
//! the position until a sample meets the threshold or the acquisition window
//! elapses, at which point the sample in hand is accepted as-is.
//!
//! The platform is abstracted behind [`LocationPlatform`] so the state machine runs
//! unchanged against the browser Geolocation API and against test fakes.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::channel::oneshot;

use crate::config::{AcquisitionPolicy, PositionRequest};
use crate::error::{LocationError, PlatformError};
use crate::location::GeoSample;

/// Callback handed to the platform; receives every fix or error it reports.
pub type PlatformCallback = Rc<dyn Fn(Result<GeoSample, PlatformError>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub i32);

pub trait LocationPlatform {
    fn is_supported(&self) -> bool;

    /// Ask for one fix. `callback` fires at most once.
    fn current_position(
        &self,
        options: &PositionRequest,
        callback: PlatformCallback,
    ) -> Result<(), PlatformError>;

    /// Start a continuous watch. `callback` fires until [`Self::clear_watch`].
    fn watch_position(
        &self,
        options: &PositionRequest,
        callback: PlatformCallback,
    ) -> Result<WatchId, PlatformError>;

    fn clear_watch(&self, id: WatchId);

    /// Wall clock in milliseconds.
    fn now_ms(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    InitialFix,
    Watching,
}

type Reply = oneshot::Sender<Result<GeoSample, LocationError>>;

struct Attempt {
    id: u64,
    started_at_ms: f64,
    phase: Phase,
    watch: Option<WatchId>,
    latest: Option<GeoSample>,
    reply: Reply,
}

struct Inner<P> {
    platform: P,
    policy: AcquisitionPolicy,
    next_id: Cell<u64>,
    active: RefCell<Option<Attempt>>,
}

/// Drives a [`LocationPlatform`] to a single terminal position per request.
///
/// At most one attempt (and so at most one platform watch) is live at a time.
/// Dropping the resolver cancels the live attempt.
pub struct GeolocationResolver<P: LocationPlatform + 'static> {
    inner: Rc<Inner<P>>,
}

impl<P: LocationPlatform + 'static> GeolocationResolver<P> {
    pub fn new(platform: P, policy: AcquisitionPolicy) -> Self {
        Self {
            inner: Rc::new(Inner {
                platform,
                policy,
                next_id: Cell::new(0),
                active: RefCell::new(None),
            }),
        }
    }

    /// Start a new attempt, cancelling any attempt still in flight.
    ///
    /// The returned future resolves exactly once. A superseded or cancelled
    /// attempt resolves to [`LocationError::Cancelled`].
    pub fn request_location(&self) -> LocationRequest {
        self.cancel();

        let (reply, rx) = oneshot::channel();
        if !self.inner.platform.is_supported() {
            let _ = reply.send(Err(LocationError::Unsupported));
            return LocationRequest { rx };
        }

        let id = self.inner.next_id.get().wrapping_add(1);
        self.inner.next_id.set(id);
        *self.inner.active.borrow_mut() = Some(Attempt {
            id,
            started_at_ms: self.inner.platform.now_ms(),
            phase: Phase::InitialFix,
            watch: None,
            latest: None,
            reply,
        });

        let callback = Inner::callback(&self.inner, id, Phase::InitialFix);
        if let Err(err) = self
            .inner
            .platform
            .current_position(&self.inner.policy.options, callback)
        {
            self.inner.finish(id, Err(err.into()));
        }

        LocationRequest { rx }
    }

    /// Abandon the live attempt, clearing its watch. No-op when idle.
    pub fn cancel(&self) {
        let attempt = self.inner.active.borrow_mut().take();
        if let Some(attempt) = attempt
            && let Some(watch) = attempt.watch
        {
            self.inner.platform.clear_watch(watch);
        }
    }

    pub fn is_acquiring(&self) -> bool {
        self.inner.active.borrow().is_some()
    }

    pub fn is_watching(&self) -> bool {
        self.inner
            .active
            .borrow()
            .as_ref()
            .is_some_and(|attempt| attempt.watch.is_some())
    }
}

impl<P: LocationPlatform + 'static> Drop for GeolocationResolver<P> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<P: LocationPlatform + 'static> Inner<P> {
    fn callback(this: &Rc<Self>, id: u64, phase: Phase) -> PlatformCallback {
        let weak = Rc::downgrade(this);
        Rc::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_event(id, phase, event);
            }
        })
    }

    fn on_event(self: &Rc<Self>, id: u64, phase: Phase, event: Result<GeoSample, PlatformError>) {
        let current = self
            .active
            .borrow()
            .as_ref()
            .map(|attempt| (attempt.id, attempt.phase, attempt.started_at_ms, attempt.latest));
        let Some((active_id, active_phase, started_at_ms, latest)) = current else {
            return;
        };
        // Callbacks from superseded attempts or finished phases are ignored.
        if active_id != id || active_phase != phase {
            return;
        }

        let threshold = self.policy.accuracy_threshold_m;
        match (phase, event) {
            (Phase::InitialFix, Ok(sample)) => {
                if sample.meets(threshold) {
                    self.finish(id, Ok(sample));
                } else {
                    self.begin_watch(id, sample);
                }
            }
            (Phase::InitialFix, Err(err)) => self.finish(id, Err(err.into())),
            (Phase::Watching, Ok(sample)) => {
                let elapsed_ms = self.platform.now_ms() - started_at_ms;
                if sample.meets(threshold) || elapsed_ms >= self.policy.window_ms {
                    self.finish(id, Ok(sample));
                } else if let Some(attempt) = self.active.borrow_mut().as_mut() {
                    attempt.latest = Some(sample);
                }
            }
            (Phase::Watching, Err(err)) => match latest {
                Some(held) => self.finish(id, Ok(held)),
                None => self.finish(id, Err(err.into())),
            },
        }
    }

    fn begin_watch(self: &Rc<Self>, id: u64, first: GeoSample) {
        if let Some(attempt) = self.active.borrow_mut().as_mut() {
            attempt.phase = Phase::Watching;
            attempt.latest = Some(first);
        }

        let callback = Self::callback(self, id, Phase::Watching);
        match self.platform.watch_position(&self.policy.options, callback) {
            Ok(watch) => {
                let stale = {
                    let mut active = self.active.borrow_mut();
                    match active.as_mut() {
                        Some(attempt) if attempt.id == id => {
                            attempt.watch = Some(watch);
                            false
                        }
                        _ => true,
                    }
                };
                if stale {
                    self.platform.clear_watch(watch);
                }
            }
            Err(_) => self.finish(id, Ok(first)),
        }
    }

    /// Terminal commit: clear the watch, then resolve the request.
    fn finish(&self, id: u64, result: Result<GeoSample, LocationError>) {
        let attempt = {
            let mut active = self.active.borrow_mut();
            if active.as_ref().is_some_and(|attempt| attempt.id == id) {
                active.take()
            } else {
                None
            }
        };
        let Some(attempt) = attempt else {
            return;
        };
        if let Some(watch) = attempt.watch {
            self.platform.clear_watch(watch);
        }
        let _ = attempt.reply.send(result);
    }
}

/// Pending result of [`GeolocationResolver::request_location`].
#[must_use = "the request resolves through this future"]
pub struct LocationRequest {
    rx: oneshot::Receiver<Result<GeoSample, LocationError>>,
}

impl Future for LocationRequest {
    type Output = Result<GeoSample, LocationError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|reply| reply.unwrap_or(Err(LocationError::Cancelled)))
    }
}
