use metrics::counter;
use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, error, info, trace, warn};

use telemetry_core::{TelemetryError, TelemetryResult};
use telemetry_domain::parse_endpoint;

use super::family::{
    select_api_version, DeviceClientSettings, DeviceFamily, SessionAuth, REQUEST_ATTEMPT_COUNT,
    SERVER_ERROR_BACKOFF,
};

const AUTH_TOKEN_HEADER: &str = "x-auth-token";
const API_TOKEN_HEADER: &str = "api-token";
const TOTAL_ITEM_COUNT_HEADER: &str = "x-total-item-count";

/// Parsed body of a successful GET together with its headers
#[derive(Debug)]
pub struct DeviceResponse<T> {
    pub body: T,
    pub headers: HeaderMap,
}

impl<T> DeviceResponse<T> {
    /// Read the `x-total-item-count` header
    pub fn total_item_count(&self) -> TelemetryResult<u32> {
        self.headers
            .get(TOTAL_ITEM_COUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u32>().ok())
            .ok_or_else(|| {
                TelemetryError::UnexpectedResponse(format!(
                    "missing or invalid {TOTAL_ITEM_COUNT_HEADER} header"
                ))
            })
    }
}

/// Session-aware REST client for one management endpoint.
///
/// Every GET goes through a bounded retry loop: an expired session is
/// refreshed and retried, a 500 is retried after a short backoff, and a
/// transport error fails at once. Session state belongs to this instance
/// and is never shared between devices.
pub struct DeviceClient {
    family: DeviceFamily,
    display_name: String,
    host: String,
    api_token: String,
    scheme: String,
    api_version: String,
    http: reqwest::Client,
    session: RwLock<Option<String>>,
}

impl DeviceClient {
    /// Build the client and negotiate the API version with the device
    pub async fn connect(
        family: DeviceFamily,
        display_name: &str,
        mgmt_endpoint: &str,
        api_token: &str,
        settings: &DeviceClientSettings,
    ) -> TelemetryResult<Self> {
        let mut client = Self::unversioned(family, display_name, mgmt_endpoint, api_token, settings)
            .inspect_err(|e| {
                error!(
                    display_name,
                    family = family.name,
                    error = %e,
                    "Could not create device client"
                );
            })?;

        match client.negotiate_api_version().await {
            Ok(version) => client.api_version = version,
            Err(e) => {
                error!(
                    display_name,
                    family = family.name,
                    error = %e,
                    "Could not create device client"
                );
                return Err(e);
            }
        }

        info!(
            display_name,
            family = family.name,
            api_version = %client.api_version,
            "Successfully created device client"
        );
        Ok(client)
    }

    fn unversioned(
        family: DeviceFamily,
        display_name: &str,
        mgmt_endpoint: &str,
        api_token: &str,
        settings: &DeviceClientSettings,
    ) -> TelemetryResult<Self> {
        let host = parse_endpoint(mgmt_endpoint)?;

        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(settings.accept_invalid_certs);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            family,
            display_name: display_name.to_string(),
            host,
            api_token: api_token.to_string(),
            scheme: settings.scheme.clone(),
            api_version: String::new(),
            http,
            session: RwLock::new(None),
        })
    }

    async fn negotiate_api_version(&self) -> TelemetryResult<String> {
        let url = self.root_url("/api/api_version");
        let response: DeviceResponse<serde_json::Value> = self.get_url(&url).await?;

        let versions: Vec<String> = response
            .body
            .get(self.family.version_field)
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();

        match select_api_version(&versions, self.family.preferred_api_version) {
            Some((version, true)) => Ok(version),
            Some((version, false)) => {
                warn!(
                    display_name = %self.display_name,
                    preferred = self.family.preferred_api_version,
                    chosen = %version,
                    "Preferred API version not supported by device, using latest listed"
                );
                Ok(version)
            }
            None => Err(TelemetryError::UnexpectedResponse(format!(
                "{url}: device listed no API versions"
            ))),
        }
    }

    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// `{scheme}://{host}/api/{version}{endpoint}`
    pub fn url(&self, endpoint: &str) -> String {
        format!(
            "{}://{}/api/{}{}",
            self.scheme, self.host, self.api_version, endpoint
        )
    }

    fn root_url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, path)
    }

    /// GET a versioned endpoint
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> TelemetryResult<DeviceResponse<T>> {
        let url = self.url(endpoint);
        self.get_url(&url).await
    }

    /// GET an absolute URL through the retry loop
    pub async fn get_url<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> TelemetryResult<DeviceResponse<T>> {
        for attempt in 1..=REQUEST_ATTEMPT_COUNT {
            trace!(display_name = %self.display_name, url, attempt, "Making GET request");

            let mut request = self
                .http
                .get(url)
                .header(USER_AGENT, self.family.user_agent);
            if let Some(session) = self.session.read().await.as_deref() {
                request = match self.family.auth {
                    SessionAuth::ApiTokenBody => request.header(COOKIE, session),
                    SessionAuth::AuthTokenHeader => request.header(AUTH_TOKEN_HEADER, session),
                };
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    error!(
                        display_name = %self.display_name,
                        url,
                        error = %e,
                        "Client error with GET request"
                    );
                    counter!("telemetry_device_requests_total", "family" => self.family.name, "outcome" => "transport_error").increment(1);
                    return Err(e.into());
                }
            };

            let retries_left = attempt < REQUEST_ATTEMPT_COUNT;
            match response.status() {
                StatusCode::OK => {
                    counter!("telemetry_device_requests_total", "family" => self.family.name, "outcome" => "ok").increment(1);
                    let headers = response.headers().clone();
                    let body = response.json::<T>().await.map_err(|e| {
                        TelemetryError::UnexpectedResponse(format!("{url}: {e}"))
                    })?;
                    return Ok(DeviceResponse { body, headers });
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    trace!(
                        display_name = %self.display_name,
                        url,
                        status_code = response.status().as_u16(),
                        "Session expired; refreshing session and retrying"
                    );
                    if retries_left {
                        if let Err(e) = self.refresh_session().await {
                            warn!(display_name = %self.display_name, error = %e, "Session refresh failed");
                        }
                    }
                }
                StatusCode::INTERNAL_SERVER_ERROR => {
                    warn!(
                        display_name = %self.display_name,
                        url,
                        "Device internal server error; waiting 500ms and retrying"
                    );
                    if retries_left {
                        tokio::time::sleep(SERVER_ERROR_BACKOFF).await;
                    }
                }
                status => {
                    let body = response.text().await.unwrap_or_default();
                    debug!(
                        display_name = %self.display_name,
                        url,
                        status_code = status.as_u16(),
                        body = %body,
                        "Unexpected status from device"
                    );
                    break;
                }
            }
        }

        error!(display_name = %self.display_name, url, "No successful GET request");
        counter!("telemetry_device_requests_total", "family" => self.family.name, "outcome" => "failed").increment(1);
        Err(TelemetryError::NoSuccessfulRequest {
            url: url.to_string(),
        })
    }

    /// Exchange the API token for a fresh session credential
    pub async fn refresh_session(&self) -> TelemetryResult<()> {
        let session = match self.family.auth {
            SessionAuth::ApiTokenBody => self.start_cookie_session().await?,
            SessionAuth::AuthTokenHeader => self.start_header_session().await?,
        };
        *self.session.write().await = Some(session);
        debug!(display_name = %self.display_name, "Started new session");
        Ok(())
    }

    async fn start_cookie_session(&self) -> TelemetryResult<String> {
        let url = self.url("/auth/session");
        let response = self
            .http
            .post(&url)
            .header(USER_AGENT, self.family.user_agent)
            .json(&serde_json::json!({ "api_token": self.api_token }))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(TelemetryError::SessionRefresh(format!(
                "{url} returned {}",
                response.status()
            )));
        }

        let cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .collect::<Vec<_>>()
            .join("; ");

        if cookies.is_empty() {
            return Err(TelemetryError::SessionRefresh(format!(
                "{url} returned no session cookie"
            )));
        }
        Ok(cookies)
    }

    async fn start_header_session(&self) -> TelemetryResult<String> {
        let url = self.root_url("/api/login");
        let response = self
            .http
            .post(&url)
            .header(USER_AGENT, self.family.user_agent)
            .header(API_TOKEN_HEADER, &self.api_token)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(TelemetryError::SessionRefresh(format!(
                "{url} returned {}",
                response.status()
            )));
        }

        match response
            .headers()
            .get(AUTH_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => {
                warn!(display_name = %self.display_name, "Login response carried no x-auth-token header");
                Err(TelemetryError::SessionRefresh(format!(
                    "{url} returned no {AUTH_TOKEN_HEADER} header"
                )))
            }
        }
    }
}

/// Take the first element of a list response
pub fn first_item<T>(items: Vec<T>, endpoint: &str) -> TelemetryResult<T> {
    items.into_iter().next().ok_or_else(|| {
        TelemetryError::UnexpectedResponse(format!("{endpoint} returned no items"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::family::FLASH_ARRAY;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_url_layout() {
        let mut client = DeviceClient::unversioned(
            FLASH_ARRAY,
            "array-one",
            "https://10.0.0.5/",
            "token",
            &DeviceClientSettings::default(),
        )
        .unwrap();
        client.api_version = "1.7".to_string();

        assert_eq!(client.url("/array?space=true"), "https://10.0.0.5/api/1.7/array?space=true");
        assert_eq!(client.root_url("/api/api_version"), "https://10.0.0.5/api/api_version");
    }

    #[test]
    fn test_empty_endpoint_is_rejected() {
        let result = DeviceClient::unversioned(
            FLASH_ARRAY,
            "array-one",
            "https://",
            "token",
            &DeviceClientSettings::default(),
        );
        assert!(matches!(result, Err(TelemetryError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_total_item_count_header() {
        let mut headers = HeaderMap::new();
        headers.insert(TOTAL_ITEM_COUNT_HEADER, HeaderValue::from_static("42"));
        let response = DeviceResponse { body: (), headers };
        assert_eq!(response.total_item_count().unwrap(), 42);

        let missing = DeviceResponse {
            body: (),
            headers: HeaderMap::new(),
        };
        assert!(missing.total_item_count().is_err());
    }

    #[test]
    fn test_first_item_of_empty_list_is_an_error() {
        assert_eq!(first_item(vec![3, 4], "/x").unwrap(), 3);
        assert!(first_item(Vec::<u8>::new(), "/array?space=true").is_err());
    }
}
