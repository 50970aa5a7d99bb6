use std::cell::Cell;

use crate::config::AcquisitionPolicy;
use crate::error::LocationError;
use crate::geocode::{AddressLookup, locate};
use crate::location::SelectedLocation;
use crate::resolver::{GeolocationResolver, LocationPlatform};

/// What a picker action produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    /// Emit this through `on_change`.
    Selected(SelectedLocation),
    /// Show the error's message; keep the previous selection.
    Failed(LocationError),
    /// A newer action or teardown took over; do nothing.
    Superseded,
}

/// Orchestrates acquisition, reverse geocoding and emission for one picker.
///
/// Every action bumps a generation counter; an action's result is only reported
/// while its generation is still the latest, so a slow geocode from an earlier
/// click can never overwrite a newer selection.
pub struct LocationPicker<P: LocationPlatform + 'static, L: AddressLookup> {
    resolver: GeolocationResolver<P>,
    lookup: L,
    generation: Cell<u64>,
}

impl<P: LocationPlatform + 'static, L: AddressLookup> LocationPicker<P, L> {
    pub fn new(platform: P, lookup: L, policy: AcquisitionPolicy) -> Self {
        Self {
            resolver: GeolocationResolver::new(platform, policy),
            lookup,
            generation: Cell::new(0),
        }
    }

    pub fn is_acquiring(&self) -> bool {
        self.resolver.is_acquiring()
    }

    /// "Use current location".
    pub async fn use_current_location(&self) -> PickOutcome {
        let generation = self.bump();
        match self.resolver.request_location().await {
            Ok(sample) => self.commit(generation, sample.lat, sample.lng).await,
            Err(LocationError::Cancelled) => PickOutcome::Superseded,
            Err(err) if self.is_current(generation) => PickOutcome::Failed(err),
            Err(_) => PickOutcome::Superseded,
        }
    }

    /// Manual map click. Abandons any acquisition still running.
    pub async fn select_point(&self, lat: f64, lng: f64) -> PickOutcome {
        let generation = self.bump();
        self.resolver.cancel();
        self.commit(generation, lat, lng).await
    }

    /// Teardown: nothing started before this call may report a result.
    pub fn cancel(&self) {
        self.bump();
        self.resolver.cancel();
    }

    async fn commit(&self, generation: u64, lat: f64, lng: f64) -> PickOutcome {
        let located = locate(&self.lookup, lat, lng).await;
        if self.is_current(generation) {
            PickOutcome::Selected(located)
        } else {
            PickOutcome::Superseded
        }
    }

    fn bump(&self) -> u64 {
        let next = self.generation.get().wrapping_add(1);
        self.generation.set(next);
        next
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.get() == generation
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use futures::FutureExt;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::pin_mut;

    use super::*;
    use crate::error::{GeocodeError, PlatformError};
    use crate::testing::{FakePlatform, sample};

    /// Answers from a queue; `Pending` entries wait on a channel the test controls.
    enum Answer {
        Ready(Result<String, GeocodeError>),
        Pending(oneshot::Receiver<String>),
    }

    #[derive(Default)]
    struct ScriptedLookup {
        answers: RefCell<VecDeque<Answer>>,
    }

    impl ScriptedLookup {
        fn answering(answers: impl IntoIterator<Item = Answer>) -> Self {
            Self {
                answers: RefCell::new(answers.into_iter().collect()),
            }
        }
    }

    impl AddressLookup for ScriptedLookup {
        async fn lookup(&self, _lat: f64, _lng: f64) -> Result<String, GeocodeError> {
            let next = self.answers.borrow_mut().pop_front();
            match next {
                Some(Answer::Ready(result)) => result,
                Some(Answer::Pending(rx)) => rx
                    .await
                    .map_err(|_| GeocodeError::Network("dropped".into())),
                None => Err(GeocodeError::Network("no answer scripted".into())),
            }
        }
    }

    fn picker(
        platform: &FakePlatform,
        lookup: ScriptedLookup,
    ) -> LocationPicker<FakePlatform, ScriptedLookup> {
        LocationPicker::new(platform.clone(), lookup, AcquisitionPolicy::default())
    }

    #[test]
    fn current_location_resolves_then_geocodes() {
        let platform = FakePlatform::new();
        let picker = picker(
            &platform,
            ScriptedLookup::answering([Answer::Ready(Ok("123 Galle Road".into()))]),
        );

        let outcome = picker.use_current_location();
        pin_mut!(outcome);
        assert!(outcome.as_mut().now_or_never().is_none());
        assert!(picker.is_acquiring());

        platform.deliver_fix(Ok(sample(6.9271, 79.8612, 15.0)));
        assert_eq!(
            outcome.now_or_never(),
            Some(PickOutcome::Selected(SelectedLocation::new(
                6.9271,
                79.8612,
                Some("123 Galle Road".into())
            )))
        );
        assert_eq!(platform.watch_starts(), 0);
    }

    #[test]
    fn resolver_failure_is_reported_with_message() {
        let platform = FakePlatform::new();
        let picker = picker(&platform, ScriptedLookup::default());

        let outcome = picker.use_current_location();
        pin_mut!(outcome);
        assert!(outcome.as_mut().now_or_never().is_none());
        platform.deliver_fix(Err(PlatformError::PermissionDenied));

        assert_eq!(
            outcome.now_or_never(),
            Some(PickOutcome::Failed(LocationError::PermissionDenied))
        );
    }

    #[test]
    fn unsupported_platform_fails_immediately() {
        let platform = FakePlatform::unsupported();
        let picker = picker(&platform, ScriptedLookup::default());
        assert_eq!(
            block_on(picker.use_current_location()),
            PickOutcome::Failed(LocationError::Unsupported)
        );
    }

    #[test]
    fn map_click_skips_resolver_and_falls_back_on_geocode_error() {
        let platform = FakePlatform::new();
        let picker = picker(
            &platform,
            ScriptedLookup::answering([Answer::Ready(Err(GeocodeError::Status(503)))]),
        );

        let outcome = block_on(picker.select_point(7.8731, 80.7718));
        assert_eq!(
            outcome,
            PickOutcome::Selected(SelectedLocation::new(
                7.8731,
                80.7718,
                Some("7.873100, 80.771800".into())
            ))
        );
        assert_eq!(platform.fix_requests(), 0);
    }

    #[test]
    fn map_click_supersedes_pending_acquisition() {
        let platform = FakePlatform::new();
        let picker = picker(
            &platform,
            ScriptedLookup::answering([Answer::Ready(Ok("Kandy".into()))]),
        );

        let gps = picker.use_current_location();
        pin_mut!(gps);
        assert!(gps.as_mut().now_or_never().is_none());
        platform.deliver_fix(Ok(sample(7.0, 80.0, 90.0)));
        assert_eq!(platform.watch_starts(), 1);

        let clicked = block_on(picker.select_point(7.29, 80.63));
        assert!(matches!(clicked, PickOutcome::Selected(_)));
        assert_eq!(platform.cleared().len(), 1);

        // The late precise sample belongs to the cancelled attempt.
        platform.deliver_watch(Ok(sample(7.01, 80.01, 5.0)));
        assert_eq!(gps.now_or_never(), Some(PickOutcome::Superseded));
    }

    #[test]
    fn stale_geocode_result_is_dropped() {
        let platform = FakePlatform::new();
        let (slow_tx, slow_rx) = oneshot::channel();
        let picker = picker(
            &platform,
            ScriptedLookup::answering([
                Answer::Pending(slow_rx),
                Answer::Ready(Ok("Second click".into())),
            ]),
        );

        let first = picker.select_point(6.9, 79.9);
        pin_mut!(first);
        assert!(first.as_mut().now_or_never().is_none());

        let second = block_on(picker.select_point(7.2, 80.2));
        assert_eq!(
            second,
            PickOutcome::Selected(SelectedLocation::new(7.2, 80.2, Some("Second click".into())))
        );

        slow_tx.send("First click".into()).expect("lookup waiting");
        assert_eq!(first.now_or_never(), Some(PickOutcome::Superseded));
    }

    #[test]
    fn cancel_on_teardown_suppresses_result() {
        let platform = FakePlatform::new();
        let picker = picker(
            &platform,
            ScriptedLookup::answering([Answer::Ready(Ok("Galle".into()))]),
        );

        let outcome = picker.use_current_location();
        pin_mut!(outcome);
        assert!(outcome.as_mut().now_or_never().is_none());
        picker.cancel();
        platform.deliver_fix(Ok(sample(6.03, 80.22, 8.0)));

        assert_eq!(outcome.now_or_never(), Some(PickOutcome::Superseded));
        assert!(!picker.is_acquiring());
    }
}
