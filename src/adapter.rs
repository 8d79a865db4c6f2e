// Provider adapter: authenticated search request + normalization
// A provider failure is always contained here. Callers either get an explicit
// `Result` (`search_isolated`) or an empty list (`search_or_empty`).

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::auth_headers;
use crate::canonical::CanonicalHotelResult;
use crate::config::DEFAULT_PROVIDER_TIMEOUT_MS;
use crate::normalize::normalize_response;
use crate::registry::ProviderConfig;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Provider error: {status_code} - {message}")]
    Status { status_code: u16, message: String },

    #[error("Malformed response body: {0}")]
    MalformedBody(String),

    #[error("Provider task aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Occupancy {
    pub rooms: u32,
    pub adults: u32,
    pub children: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    Km,
    Mi,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFilter {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: u32,
    pub unit: DistanceUnit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchFilters {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub occupancies: Vec<Occupancy>,
    pub geolocation: Option<GeoFilter>,
}

/// Per-call context. Carries its own timeout instead of relying on
/// client-wide settings.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    pub timeout: Duration,
}

impl RequestContext {
    pub fn new(timeout: Duration) -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            timeout,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS))
    }
}

// Outbound body: {stay: {checkIn, checkOut}, occupancies, geolocation}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StayBody {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

#[derive(Debug, Serialize)]
struct ProviderSearchBody<'a> {
    stay: StayBody,
    occupancies: &'a [Occupancy],
    geolocation: Option<GeoFilter>,
}

impl<'a> From<&'a SearchFilters> for ProviderSearchBody<'a> {
    fn from(filters: &'a SearchFilters) -> Self {
        Self {
            stay: StayBody {
                check_in: filters.check_in,
                check_out: filters.check_out,
            },
            occupancies: &filters.occupancies,
            geolocation: filters.geolocation,
        }
    }
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync + 'static {
    async fn search(
        &self,
        config: &ProviderConfig,
        filters: &SearchFilters,
        ctx: &RequestContext,
    ) -> Result<Vec<CanonicalHotelResult>, ProviderError>;
}

/// Generic HTTP adapter, parameterized per provider by its `ProviderConfig`.
#[derive(Clone, Default)]
pub struct HttpProviderAdapter {
    client: reqwest::Client,
}

impl HttpProviderAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderAdapter for HttpProviderAdapter {
    async fn search(
        &self,
        config: &ProviderConfig,
        filters: &SearchFilters,
        ctx: &RequestContext,
    ) -> Result<Vec<CanonicalHotelResult>, ProviderError> {
        let url = format!("{}/hotels", config.credentials.base_url.trim_end_matches('/'));
        debug!(
            provider = %config.slug,
            correlation_id = %ctx.correlation_id,
            %url,
            "Searching provider"
        );

        let mut request = self
            .client
            .post(&url)
            .timeout(ctx.timeout)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&ProviderSearchBody::from(filters));
        for (name, value) in auth_headers(config.auth_method, &config.credentials) {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(ctx.timeout.as_millis() as u64)
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status_code: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(ctx.timeout.as_millis() as u64)
            } else {
                ProviderError::MalformedBody(e.to_string())
            }
        })?;

        Ok(normalize_response(&config.slug, &body))
    }
}

/// Runs one provider search under the context's hard timeout.
pub async fn search_isolated(
    adapter: &dyn ProviderAdapter,
    config: &ProviderConfig,
    filters: &SearchFilters,
    ctx: &RequestContext,
) -> Result<Vec<CanonicalHotelResult>, ProviderError> {
    match tokio::time::timeout(ctx.timeout, adapter.search(config, filters, ctx)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(ctx.timeout.as_millis() as u64)),
    }
}

/// Best-effort search: any failure is logged and becomes an empty list.
pub async fn search_or_empty(
    adapter: &dyn ProviderAdapter,
    config: &ProviderConfig,
    filters: &SearchFilters,
    ctx: &RequestContext,
) -> Vec<CanonicalHotelResult> {
    match search_isolated(adapter, config, filters, ctx).await {
        Ok(hotels) => hotels,
        Err(e) => {
            warn!(
                provider = %config.slug,
                correlation_id = %ctx.correlation_id,
                error = %e,
                "Provider search failed"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::signature;
    use crate::registry::fixtures::provider;
    use crate::registry::AuthMethod;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn filters() -> SearchFilters {
        SearchFilters {
            check_in: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            occupancies: vec![Occupancy {
                rooms: 1,
                adults: 2,
                children: 0,
            }],
            geolocation: Some(GeoFilter {
                latitude: 41.38,
                longitude: 2.17,
                radius: 20,
                unit: DistanceUnit::Km,
            }),
        }
    }

    fn ctx(timeout_ms: u64) -> RequestContext {
        RequestContext::new(Duration::from_millis(timeout_ms))
    }

    fn hotels_body(code: &str) -> Value {
        json!({
            "hotels": {
                "hotels": [{
                    "code": code,
                    "name": "Mock Hotel",
                    "rooms": [{"code": "DBL", "name": "Double", "rates": [{"rateKey": "k1", "net": "99.00"}]}]
                }]
            }
        })
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(ProviderSearchBody::from(&filters())).unwrap();
        assert_eq!(
            body,
            json!({
                "stay": {"checkIn": "2024-06-01", "checkOut": "2024-06-04"},
                "occupancies": [{"rooms": 1, "adults": 2, "children": 0}],
                "geolocation": {"latitude": 41.38, "longitude": 2.17, "radius": 20, "unit": "km"}
            })
        );

        let mut no_geo = filters();
        no_geo.geolocation = None;
        let body = serde_json::to_value(ProviderSearchBody::from(&no_geo)).unwrap();
        assert!(body["geolocation"].is_null());
    }

    #[tokio::test]
    async fn test_search_posts_signed_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hotels"))
            .and(header("Api-key", "hb-key"))
            .and(header_exists("X-Signature"))
            .and(header_exists("X-Timestamp"))
            .and(header("Accept", "application/json"))
            .and(body_partial_json(json!({"stay": {"checkIn": "2024-06-01"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(hotels_body("H1")))
            .expect(1)
            .mount(&server)
            .await;

        let config = provider("hb", &server.uri(), AuthMethod::XSignature);
        let hotels = HttpProviderAdapter::new()
            .search(&config, &filters(), &ctx(2_000))
            .await
            .unwrap();

        assert_eq!(hotels.len(), 1);
        assert_eq!(hotels[0].id, "hb_H1");
        assert_eq!(hotels[0].rooms[0].id, "hb_DBL_k1");

        let received = server.received_requests().await.unwrap();
        let request = &received[0];
        let timestamp = request.headers.get("X-Timestamp").unwrap().to_str().unwrap();
        let signed = request.headers.get("X-Signature").unwrap().to_str().unwrap();
        assert_eq!(signed, signature("hb-key", "hb-secret", timestamp));
    }

    #[tokio::test]
    async fn test_bearer_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hotels"))
            .and(header("Authorization", "Bearer bk-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"hotels": []}})))
            .expect(1)
            .mount(&server)
            .await;

        let config = provider("bk", &format!("{}/", server.uri()), AuthMethod::ApiKey);
        let hotels = HttpProviderAdapter::new()
            .search(&config, &filters(), &ctx(2_000))
            .await
            .unwrap();
        assert!(hotels.is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let config = provider("down", &server.uri(), AuthMethod::None);
        let result = HttpProviderAdapter::new()
            .search(&config, &filters(), &ctx(2_000))
            .await;

        assert_eq!(
            result,
            Err(ProviderError::Status {
                status_code: 503,
                message: "maintenance".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let config = provider("html", &server.uri(), AuthMethod::None);
        let result = HttpProviderAdapter::new()
            .search(&config, &filters(), &ctx(2_000))
            .await;
        assert!(matches!(result, Err(ProviderError::MalformedBody(_))));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(hotels_body("SLOW"))
                    .set_delay(Duration::from_millis(800)),
            )
            .mount(&server)
            .await;

        let config = provider("slow", &server.uri(), AuthMethod::None);
        let adapter = HttpProviderAdapter::new();

        let result = search_isolated(&adapter, &config, &filters(), &ctx(100)).await;
        assert_eq!(result, Err(ProviderError::Timeout(100)));

        let hotels = search_or_empty(&adapter, &config, &filters(), &ctx(100)).await;
        assert!(hotels.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_provider() {
        let config = provider("gone", "http://127.0.0.1:9", AuthMethod::None);
        let adapter = HttpProviderAdapter::new();
        let hotels = search_or_empty(&adapter, &config, &filters(), &ctx(1_000)).await;
        assert!(hotels.is_empty());
    }
}
