#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Reverse geocoding for report locations.
//!
//! Uses Nominatim / OpenStreetMap to turn coordinates into a display
//! address. Nominatim has strict rate limits on the public instance
//! (**1 request per second**); point `NOMINATIM_BASE_URL` at a
//! self-hosted instance for anything beyond light interactive use.
//!
//! Geocoding is a convenience, never a requirement: callers fall back to
//! [`coordinate_label`] when no address can be resolved.

pub mod nominatim;

use thiserror::Error;

/// Errors from reverse geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Coordinate fallback label used when no address is available.
///
/// Four decimal places, matching roughly 11 m of precision.
#[must_use]
pub fn coordinate_label(latitude: f64, longitude: f64) -> String {
    format!("{latitude:.4}, {longitude:.4}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_label_rounds_to_four_decimals() {
        assert_eq!(coordinate_label(40.712_8, -74.006_0), "40.7128, -74.0060");
        assert_eq!(coordinate_label(40.712_849, -74.005_951), "40.7128, -74.0060");
    }
}
