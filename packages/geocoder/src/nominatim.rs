//! Nominatim / OpenStreetMap reverse geocoder client.
//!
//! See <https://nominatim.org/release-docs/develop/api/Reverse/>

use crate::GeocodeError;

/// Reverse-geocodes a coordinate to a display address.
///
/// Returns `Ok(None)` when Nominatim has no address for the location
/// (open water, unmapped areas). The caller is responsible for rate
/// limiting against the public instance.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing fails.
pub async fn reverse_geocode(
    client: &reqwest::Client,
    base_url: &str,
    latitude: f64,
    longitude: f64,
) -> Result<Option<String>, GeocodeError> {
    let resp = client
        .get(format!("{base_url}/reverse"))
        .query(&[
            ("lat", latitude.to_string().as_str()),
            ("lon", longitude.to_string().as_str()),
            ("format", "jsonv2"),
        ])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Parses a Nominatim reverse JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<String>, GeocodeError> {
    if !body.is_object() {
        return Err(GeocodeError::Parse {
            message: "Nominatim response is not an object".to_string(),
        });
    }

    // "Unable to geocode" — nothing mapped at this location.
    if body.get("error").is_some() {
        return Ok(None);
    }

    let display_name = body["display_name"]
        .as_str()
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing display_name in Nominatim response".to_string(),
        })?;

    Ok(Some(display_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reverse_result() {
        let body = serde_json::json!({
            "place_id": 287_781_008_u64,
            "lat": "40.71279",
            "lon": "-74.00604",
            "display_name": "City Hall Park, Manhattan, New York, NY, USA"
        });
        let address = parse_response(&body).unwrap().unwrap();
        assert_eq!(address, "City Hall Park, Manhattan, New York, NY, USA");
    }

    #[test]
    fn parses_unable_to_geocode() {
        let body = serde_json::json!({"error": "Unable to geocode"});
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_response() {
        let body = serde_json::json!([1, 2, 3]);
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));

        let body = serde_json::json!({"display_name": 42});
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }
}
