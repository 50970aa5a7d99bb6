use serde::{Deserialize, Serialize};

use crate::location::LatLng;

/// Axis-aligned lat/lng box for the serviced region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

/// Sri Lanka, padded slightly past the coastline.
pub const SRI_LANKA: RegionBounds = RegionBounds {
    south: 5.9,
    west: 79.7,
    north: 9.8,
    east: 81.9,
    min_zoom: 7.0,
    max_zoom: 18.0,
};

impl Default for RegionBounds {
    fn default() -> Self {
        SRI_LANKA
    }
}

impl RegionBounds {
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lng >= self.west
            && point.lng <= self.east
    }

    /// Nearest point inside the box. Non-finite input collapses to the center.
    pub fn clamp(&self, point: LatLng) -> LatLng {
        if !point.lat.is_finite() || !point.lng.is_finite() {
            return self.center();
        }
        LatLng::new(
            point.lat.clamp(self.south, self.north),
            point.lng.clamp(self.west, self.east),
        )
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        if !zoom.is_finite() {
            return self.min_zoom;
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// `[[south, west], [north, east]]`, the corner order Leaflet expects.
    pub fn corners(&self) -> [[f64; 2]; 2] {
        [[self.south, self.west], [self.north, self.east]]
    }

    /// A box whose corners are swapped or whose zoom range is inverted is unusable.
    pub fn is_valid(&self) -> bool {
        [self.south, self.west, self.north, self.east, self.min_zoom, self.max_zoom]
            .iter()
            .all(|v| v.is_finite())
            && self.south < self.north
            && self.west < self.east
            && self.min_zoom <= self.max_zoom
    }
}

/// Center and zoom actually applied to a map instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapViewState {
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: f64,
}

impl MapViewState {
    pub fn clamped(region: &RegionBounds, center: LatLng, zoom: f64) -> Self {
        let center = region.clamp(center);
        Self {
            center_lat: center.lat,
            center_lng: center.lng,
            zoom: region.clamp_zoom(zoom),
        }
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(self.center_lat, self.center_lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_point_south_of_region() {
        let clamped = SRI_LANKA.clamp(LatLng::new(5.0, 80.0));
        assert_eq!(clamped, LatLng::new(5.9, 80.0));
    }

    #[test]
    fn clamps_both_axes_at_corner() {
        let clamped = SRI_LANKA.clamp(LatLng::new(12.0, 85.0));
        assert_eq!(clamped, LatLng::new(9.8, 81.9));
    }

    #[test]
    fn inside_point_is_unchanged() {
        let point = LatLng::new(6.0, 80.0);
        assert!(SRI_LANKA.contains(point));
        assert_eq!(SRI_LANKA.clamp(point), point);
    }

    #[test]
    fn non_finite_point_collapses_to_center() {
        let clamped = SRI_LANKA.clamp(LatLng::new(f64::NAN, 80.0));
        assert_eq!(clamped, SRI_LANKA.center());
    }

    #[test]
    fn view_state_clamps_center_and_zoom() {
        let view = MapViewState::clamped(&SRI_LANKA, LatLng::new(3.0, 78.0), 22.0);
        assert_eq!(view.center(), LatLng::new(5.9, 79.7));
        assert_eq!(view.zoom, 18.0);
    }

    #[test]
    fn inverted_bounds_are_invalid() {
        let inverted = RegionBounds {
            south: 9.8,
            north: 5.9,
            ..SRI_LANKA
        };
        assert!(!inverted.is_valid());
        assert!(SRI_LANKA.is_valid());
    }
}
