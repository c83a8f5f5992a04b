use std::fmt;

use serde::{Deserialize, Serialize};
use telemetry_core::{TelemetryError, TelemetryResult};

/// Device family tag carried by a registration.
///
/// Unknown tags are preserved so the factory can report them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    FlashArray,
    FlashBlade,
    Other(String),
}

impl DeviceType {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceType::FlashArray => "FlashArray",
            DeviceType::FlashBlade => "FlashBlade",
            DeviceType::Other(tag) => tag,
        }
    }
}

impl From<String> for DeviceType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "FlashArray" => DeviceType::FlashArray,
            "FlashBlade" => DeviceType::FlashBlade,
            _ => DeviceType::Other(tag),
        }
    }
}

impl From<&str> for DeviceType {
    fn from(tag: &str) -> Self {
        DeviceType::from(tag.to_string())
    }
}

impl From<DeviceType> for String {
    fn from(device_type: DeviceType) -> Self {
        device_type.as_str().to_string()
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to open a connection with one array.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayRegistrationInfo {
    pub id: String,
    pub name: String,
    pub mgmt_endpoint: String,
    pub api_token: String,
    pub device_type: DeviceType,
}

impl ArrayRegistrationInfo {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        mgmt_endpoint: impl Into<String>,
        api_token: impl Into<String>,
        device_type: DeviceType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mgmt_endpoint: mgmt_endpoint.into(),
            api_token: api_token.into(),
            device_type,
        }
    }

    /// Structured log fields identifying the device
    pub fn log_fields(&self, include_endpoint: bool) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("device_id", self.id.clone()),
            ("device_name", self.name.clone()),
        ];
        if include_endpoint {
            fields.push(("device_mgmt_endpoint", self.mgmt_endpoint.clone()));
        }
        fields
    }
}

impl fmt::Debug for ArrayRegistrationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayRegistrationInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mgmt_endpoint", &self.mgmt_endpoint)
            .field("api_token", &"****")
            .field("device_type", &self.device_type)
            .finish()
    }
}

/// Fields commonly patched on the API server. Empty fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayPatchInfo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(rename = "_as_of", default, skip_serializing_if = "String::is_empty")]
    pub as_of: String,
}

/// Normalize a management endpoint into a bare host.
///
/// Strips a leading `http://`/`https://` and one trailing `/`.
pub fn parse_endpoint(endpoint: &str) -> TelemetryResult<String> {
    let host = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .unwrap_or(endpoint);
    let host = host.strip_suffix('/').unwrap_or(host);

    if host.is_empty() {
        return Err(TelemetryError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(host.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_token() {
        let info = ArrayRegistrationInfo::new(
            "a1",
            "array-one",
            "10.0.0.1",
            "secret-token-value",
            DeviceType::FlashArray,
        );

        let rendered = format!("{info:?}");
        assert!(rendered.contains("****"));
        assert!(!rendered.contains("secret-token-value"));
    }

    #[test]
    fn test_device_type_round_trips_original_tags() {
        let json = r#"{"id":"b","name":"n","mgmt_endpoint":"e","api_token":"t","device_type":"FlashBlade"}"#;
        let info: ArrayRegistrationInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.device_type, DeviceType::FlashBlade);

        let other = DeviceType::from("Tape");
        assert_eq!(other, DeviceType::Other("Tape".to_string()));
        assert_eq!(serde_json::to_string(&other).unwrap(), "\"Tape\"");
    }

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(parse_endpoint("https://array.local/").unwrap(), "array.local");
        assert_eq!(parse_endpoint("http://10.0.0.1").unwrap(), "10.0.0.1");
        assert_eq!(parse_endpoint("10.0.0.1:8443").unwrap(), "10.0.0.1:8443");
        assert!(parse_endpoint("https://").is_err());
        assert!(parse_endpoint("").is_err());
    }

    #[test]
    fn test_patch_info_omits_empty_fields() {
        let patch = ArrayPatchInfo {
            status: "Connected".to_string(),
            as_of: "2024-01-01T00:00:00.000".to_string(),
            ..Default::default()
        };

        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value["status"], "Connected");
        assert_eq!(value["_as_of"], "2024-01-01T00:00:00.000");
        assert!(value.get("model").is_none());
        assert!(value.get("version").is_none());
    }

    #[test]
    fn test_log_fields() {
        let info = ArrayRegistrationInfo::new("a1", "n", "h", "t", DeviceType::FlashArray);
        assert_eq!(info.log_fields(false).len(), 2);
        let with_endpoint = info.log_fields(true);
        assert_eq!(with_endpoint[2], ("device_mgmt_endpoint", "h".to_string()));
    }
}
