use thiserror::Error;

/// Why a location acquisition attempt produced no position.
///
/// `Display` is the message shown to the user next to the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("Geolocation is not supported by your browser")]
    Unsupported,
    #[error("Location permission denied. Please enable location access and try again.")]
    PermissionDenied,
    #[error("Location request timed out. Please try again or select on the map.")]
    Timeout,
    #[error("Unable to retrieve your location. Please select on the map.")]
    Unavailable,
    /// The attempt was superseded or torn down before it committed.
    #[error("Location request was cancelled.")]
    Cancelled,
}

impl LocationError {
    /// Message for the picker, or `None` when nothing should be shown.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Cancelled => None,
            other => Some(other.to_string()),
        }
    }
}

/// Error codes of the W3C `GeolocationPositionError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformError {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Other(u16),
}

impl PlatformError {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            2 => Self::PositionUnavailable,
            3 => Self::Timeout,
            other => Self::Other(other),
        }
    }
}

impl From<PlatformError> for LocationError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::PermissionDenied => Self::PermissionDenied,
            PlatformError::Timeout => Self::Timeout,
            PlatformError::PositionUnavailable | PlatformError::Other(_) => Self::Unavailable,
        }
    }
}

/// Reverse-geocode failures. Logged, never shown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    #[error("fetch error: {0}")]
    Network(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("response has no display_name")]
    MissingAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_codes_map_to_user_messages() {
        let denied: LocationError = PlatformError::from_code(1).into();
        assert_eq!(
            denied.to_string(),
            "Location permission denied. Please enable location access and try again."
        );

        let timeout: LocationError = PlatformError::from_code(3).into();
        assert_eq!(
            timeout.to_string(),
            "Location request timed out. Please try again or select on the map."
        );

        let unavailable: LocationError = PlatformError::from_code(2).into();
        assert_eq!(
            unavailable.to_string(),
            "Unable to retrieve your location. Please select on the map."
        );
    }

    #[test]
    fn unknown_codes_fall_through_to_generic_message() {
        let unknown: LocationError = PlatformError::from_code(42).into();
        assert_eq!(unknown, LocationError::Unavailable);
    }

    #[test]
    fn unsupported_message() {
        assert_eq!(
            LocationError::Unsupported.user_message().as_deref(),
            Some("Geolocation is not supported by your browser")
        );
    }

    #[test]
    fn cancelled_is_silent() {
        assert_eq!(LocationError::Cancelled.user_message(), None);
    }
}
