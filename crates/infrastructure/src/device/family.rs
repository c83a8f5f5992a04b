use std::time::Duration;

use telemetry_core::config::DeviceConfig;

/// How a family exchanges its long-lived API token for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAuth {
    /// POST `/api/{ver}/auth/session` with `{"api_token": ..}`; the session
    /// travels back as cookies.
    ApiTokenBody,
    /// POST `/api/login` with an `api-token` header; the session travels
    /// back as the `x-auth-token` header.
    AuthTokenHeader,
}

/// Everything that differs between device families at the protocol level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFamily {
    pub name: &'static str,
    pub user_agent: &'static str,
    pub preferred_api_version: &'static str,
    /// Field of the `/api/api_version` response listing the versions
    pub version_field: &'static str,
    pub auth: SessionAuth,
}

pub const FLASH_ARRAY: DeviceFamily = DeviceFamily {
    name: "FlashArray",
    user_agent: "Pure1 Unplugged FlashArray Client v1.0",
    preferred_api_version: "1.7",
    version_field: "version",
    auth: SessionAuth::ApiTokenBody,
};

pub const FLASH_BLADE: DeviceFamily = DeviceFamily {
    name: "FlashBlade",
    user_agent: "Pure1 Unplugged FlashBlade Client v1.0",
    preferred_api_version: "1.5",
    version_field: "versions",
    auth: SessionAuth::AuthTokenHeader,
};

/// Attempts per GET, session refreshes and 500 backoffs included
pub const REQUEST_ATTEMPT_COUNT: u32 = 3;
pub const SERVER_ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// Transport settings shared by every device client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceClientSettings {
    pub scheme: String,
    pub accept_invalid_certs: bool,
    pub request_timeout: Option<Duration>,
}

impl Default for DeviceClientSettings {
    fn default() -> Self {
        Self::from(&DeviceConfig::default())
    }
}

impl From<&DeviceConfig> for DeviceClientSettings {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            scheme: config.scheme.clone(),
            accept_invalid_certs: config.accept_invalid_certs,
            request_timeout: config.request_timeout(),
        }
    }
}

impl DeviceClientSettings {
    /// Plain HTTP, used against mock devices
    pub fn plain_http() -> Self {
        Self {
            scheme: "http".to_string(),
            ..Self::default()
        }
    }
}

/// Pick the preferred version if the device lists it, else the last
/// listed one. Returns the choice and whether it was the preferred one.
pub fn select_api_version(versions: &[String], preferred: &str) -> Option<(String, bool)> {
    if versions.iter().any(|v| v == preferred) {
        return Some((preferred.to_string(), true));
    }
    versions.last().map(|v| (v.clone(), false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(list: &[&str]) -> Vec<String> {
        list.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_preferred_version_wins() {
        let chosen = select_api_version(&versions(&["1.5", "1.7", "1.8"]), "1.7");
        assert_eq!(chosen, Some(("1.7".to_string(), true)));
    }

    #[test]
    fn test_falls_back_to_last_listed_version() {
        let chosen = select_api_version(&versions(&["1.2", "1.4"]), "1.7");
        assert_eq!(chosen, Some(("1.4".to_string(), false)));
    }

    #[test]
    fn test_empty_version_list() {
        assert_eq!(select_api_version(&[], "1.5"), None);
    }

    #[test]
    fn test_settings_follow_device_config() {
        let config = DeviceConfig {
            scheme: "http".to_string(),
            accept_invalid_certs: false,
            request_timeout_seconds: Some(5),
        };
        let settings = DeviceClientSettings::from(&config);

        assert_eq!(settings.scheme, "http");
        assert!(!settings.accept_invalid_certs);
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(5)));
    }
}
