pub mod assets;
pub mod config;
pub mod error;
pub mod geocode;
pub mod location;
pub mod picker;
pub mod region;
pub mod renderer;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use config::{AcquisitionPolicy, PickerConfig, PositionRequest};
pub use error::{GeocodeError, LocationError, PlatformError};
pub use geocode::{AddressLookup, fallback_address, resolve_address};
pub use location::{GeoSample, LatLng, MarkerSpec, SelectedLocation};
pub use picker::{LocationPicker, PickOutcome};
pub use region::{MapViewState, RegionBounds, SRI_LANKA};
pub use renderer::{MapBackend, MapRenderer, MarkerIcon};
pub use resolver::{GeolocationResolver, LocationPlatform, LocationRequest, PlatformCallback, WatchId};
