//! Version header parsing.
//!
//! The header carries one or more comma separated `"{service} {version}"`
//! entries, e.g. `OpenStack-API-Version: instance-ha 1.2`. Only the entry
//! naming this service is considered.

use failsafe_model::{ApiError, ApiErrorCode, ApiVersion, VersionError, VersionToken, VersionWindow};

/// Extract the version token addressed to `service` from the header map.
///
/// Returns `Ok(None)` when the header is absent or names other services only.
pub fn requested_version(
    headers: &http::HeaderMap,
    header_name: &str,
    service: &str,
) -> Result<Option<VersionToken>, ApiError> {
    for value in headers.get_all(header_name) {
        let Ok(value) = value.to_str() else {
            return Err(ApiError::with_message(
                ApiErrorCode::InvalidVersionString,
                format!("{header_name} header is not valid ASCII."),
            ));
        };
        for entry in value.split(',') {
            let mut parts = entry.split_whitespace();
            let (Some(name), version) = (parts.next(), parts.next()) else {
                continue;
            };
            if !name.eq_ignore_ascii_case(service) {
                continue;
            }
            let raw = version.unwrap_or_default();
            if parts.next().is_some() {
                return Err(VersionError::InvalidVersionString(entry.trim().to_owned()).into());
            }
            return VersionToken::parse(raw).map(Some).map_err(ApiError::from);
        }
    }
    Ok(None)
}

/// Resolve the request version against the supported window.
///
/// Malformed values yield a 400 `InvalidVersionString`, versions outside the
/// window a 406 `UnsupportedGlobalVersion`.
pub fn resolve_version(
    headers: &http::HeaderMap,
    header_name: &str,
    service: &str,
    window: &VersionWindow,
) -> Result<ApiVersion, ApiError> {
    let requested = requested_version(headers, header_name, service)?;
    window.resolve(requested).map_err(ApiError::from)
}

/// Value of the version response header, e.g. `"instance-ha 1.2"`.
#[must_use]
pub fn version_header_value(service: &str, version: ApiVersion) -> String {
    format!("{service} {version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "OpenStack-API-Version";
    const SERVICE: &str = "instance-ha";

    fn headers(value: &str) -> http::HeaderMap {
        let mut map = http::HeaderMap::new();
        map.insert(HEADER, http::HeaderValue::from_str(value).unwrap());
        map
    }

    fn window() -> VersionWindow {
        VersionWindow::new(
            ApiVersion::new(1, 0),
            ApiVersion::new(1, 2),
            ApiVersion::new(1, 0),
        )
        .unwrap()
    }

    #[test]
    fn test_should_default_when_header_missing() {
        let version = resolve_version(&http::HeaderMap::new(), HEADER, SERVICE, &window()).unwrap();
        assert_eq!(version, ApiVersion::new(1, 0));
    }

    #[test]
    fn test_should_pick_entry_for_this_service() {
        let map = headers("compute 2.60, instance-ha 1.1");
        let version = resolve_version(&map, HEADER, SERVICE, &window()).unwrap();
        assert_eq!(version, ApiVersion::new(1, 1));
    }

    #[test]
    fn test_should_ignore_other_services() {
        let map = headers("compute 2.60");
        assert_eq!(requested_version(&map, HEADER, SERVICE).unwrap(), None);
    }

    #[test]
    fn test_should_resolve_latest_to_window_max() {
        let map = headers("instance-ha latest");
        let version = resolve_version(&map, HEADER, SERVICE, &window()).unwrap();
        assert_eq!(version, ApiVersion::new(1, 2));
    }

    #[test]
    fn test_should_reject_malformed_version() {
        let err = resolve_version(&headers("instance-ha 1.x"), HEADER, SERVICE, &window())
            .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::InvalidVersionString);
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_should_reject_version_outside_window() {
        let err = resolve_version(&headers("instance-ha 9.9"), HEADER, SERVICE, &window())
            .unwrap_err();
        assert_eq!(err.code, ApiErrorCode::UnsupportedGlobalVersion);
        assert_eq!(err.status_code, http::StatusCode::NOT_ACCEPTABLE);
    }

    #[test]
    fn test_should_format_response_header() {
        assert_eq!(
            version_header_value(SERVICE, ApiVersion::new(1, 2)),
            "instance-ha 1.2"
        );
    }
}
