//! # Allergen API Client Module
//!
//! HTTP client for the remote allergen backend: free-form text detection,
//! barcode product lookup, and scan history. The client owns DTO-to-domain
//! mapping, including the name fallback chain for allergen records and the
//! default severity for records that omit one.
//!
//! Wire contract:
//! - `POST {base}/allergens/detect` with `{"text": "..."}` returns matched
//!   allergens plus a `has_allergens` flag
//! - `GET {base}/products/{barcode}` returns the product or 404
//! - `POST {base}/scans` records one scan
//! - `GET {base}/scans?limit={n}` returns recent scans
//! - `GET {base}/health` is the readiness probe target
//!
//! Every error is an [`ApiError`]; the detection orchestrator absorbs all
//! of them into the offline fallback.

use crate::allergen_table;
use crate::api_errors::ApiError;
use crate::config::ApiConfig;
use crate::errors::error_logging;
use crate::models::{Allergen, DetectionResult, DetectionSource, Product, ScanRecord};
use crate::observability::api_span;
use crate::observability::metrics::record_api_request_metrics;
use crate::validation::validate_barcode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn, Instrument};

/// Severity assigned to online allergen records that omit one (medium)
pub const DEFAULT_ONLINE_SEVERITY: u8 = 2;

/// Maximum number of error body characters kept in an [`ApiError::Status`]
const ERROR_BODY_SNIPPET_CHARS: usize = 200;

/// Request body for the detection endpoint
#[derive(Debug, Clone, Serialize)]
pub struct DetectRequest {
    pub text: String,
}

/// One allergen record as returned by the backend.
///
/// Accepts both snake_case and camelCase field spellings; the backend has
/// shipped both over time.
#[derive(Debug, Clone, Deserialize)]
pub struct AllergenDto {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "allergenName")]
    pub allergen_name: Option<String>,
    #[serde(default, alias = "severityLevel")]
    pub severity_level: Option<u8>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "alternativeNames")]
    pub alternative_names: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AllergenDto {
    /// Map to the domain type.
    ///
    /// Name fallback chain: `name`, then `allergen_name`, then the static
    /// id map, then a generic placeholder. Missing severity becomes
    /// medium ([`DEFAULT_ONLINE_SEVERITY`]).
    pub fn into_domain(self) -> Allergen {
        let name = non_blank(self.name)
            .or_else(|| non_blank(self.allergen_name))
            .or_else(|| allergen_table::online_name_for_id(self.id).map(str::to_string))
            .unwrap_or_else(|| {
                warn!(allergen_id = self.id, "Allergen record without a resolvable name");
                "Unknown Allergen".to_string()
            });

        Allergen {
            id: self.id,
            name,
            severity_level: self.severity_level.unwrap_or(DEFAULT_ONLINE_SEVERITY),
            description: non_blank(self.description),
            alternative_names: non_blank(self.alternative_names),
        }
    }
}

/// Response body of the detection endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionResponse {
    #[serde(default)]
    pub allergens: Vec<AllergenDto>,
    #[serde(default, alias = "hasAllergens")]
    pub has_allergens: Option<bool>,
}

impl DetectionResponse {
    /// Map to a domain result tagged [`DetectionSource::Online`].
    ///
    /// The backend flag wins when present; otherwise it is derived from
    /// the allergen list.
    pub fn into_domain(self, ocr_text: String) -> DetectionResult {
        let allergens: Vec<Allergen> = self
            .allergens
            .into_iter()
            .map(AllergenDto::into_domain)
            .collect();
        let has_allergens = self.has_allergens.unwrap_or(!allergens.is_empty());
        DetectionResult {
            ocr_text,
            allergens,
            has_allergens,
            source: DetectionSource::Online,
        }
    }
}

/// Product record as returned by the barcode lookup
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDto {
    pub barcode: String,
    pub name: String,
    #[serde(default, alias = "ingredientsText")]
    pub ingredients_text: Option<String>,
}

impl ProductDto {
    pub fn into_domain(self) -> Product {
        Product {
            barcode: self.barcode,
            name: self.name,
            ingredients_text: non_blank(self.ingredients_text),
        }
    }
}

/// HTTP client for the allergen backend. Cheap to clone; all clones
/// share one connection pool.
#[derive(Clone)]
pub struct AllergenApiClient {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl AllergenApiClient {
    /// Create a client from configuration. The reqwest client enforces
    /// the configured request timeout; there are no retries at this layer.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    /// Base URL the client talks to, without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Turn a non-success response into `ApiError::Status` carrying a
    /// truncated body snippet.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(ERROR_BODY_SNIPPET_CHARS)
            .collect();
        Err(ApiError::Status(status.as_u16(), body))
    }

    /// Send a request, check its status and record request metrics.
    /// The status label is the HTTP code, or the error kind when the
    /// request never produced a response.
    async fn send_checked(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let started = Instant::now();
        let outcome = async {
            match request.send().await {
                Ok(response) => Self::ensure_success(response).await,
                Err(e) => Err(ApiError::from(e)),
            }
        }
        .instrument(api_span(operation))
        .await;

        let status_label = match &outcome {
            Ok(response) => response.status().as_u16().to_string(),
            Err(ApiError::Status(code, _)) => code.to_string(),
            Err(e) => e.kind().to_string(),
        };
        record_api_request_metrics(operation, &status_label, started.elapsed());
        outcome
    }

    /// Submit OCR text for detection and map the response to a domain
    /// result tagged `Online`.
    pub async fn detect(&self, ocr_text: &str) -> Result<DetectionResult, ApiError> {
        let url = format!("{}/allergens/detect", self.base_url);
        debug!(
            text_chars = ocr_text.chars().count(),
            "Submitting OCR text for online detection"
        );

        let request = DetectRequest {
            text: ocr_text.to_string(),
        };
        let response = self
            .send_checked("detect", self.with_auth(self.http.post(&url)).json(&request))
            .await?;
        let body: DetectionResponse = response.json().await?;

        Ok(body.into_domain(ocr_text.to_string()))
    }

    /// Look up a product by barcode. A 404 is not an error: the product
    /// is simply unknown to the catalog. Invalid barcodes never leave the
    /// device and behave like unknown products.
    pub async fn product_by_barcode(&self, barcode: &str) -> Result<Option<Product>, ApiError> {
        // The barcode lands in the request path, so reject anything that
        // is not plain barcode material before building the URL.
        let barcode = match validate_barcode(barcode) {
            Ok(barcode) => barcode,
            Err(reason) => {
                error_logging::log_validation_error(
                    &reason,
                    "product_by_barcode",
                    "barcode",
                    Some(barcode),
                );
                return Ok(None);
            }
        };

        let url = format!("{}/products/{}", self.base_url, barcode);
        let response = self
            .send_checked("product_by_barcode", self.with_auth(self.http.get(&url)))
            .await;

        let response = match response {
            Ok(response) => response,
            Err(ApiError::Status(404, _)) => {
                debug!(barcode, "Product not found in catalog");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let body: ProductDto = response.json().await?;
        Ok(Some(body.into_domain()))
    }

    /// Record one completed scan in the backend history
    pub async fn record_scan(&self, record: &ScanRecord) -> Result<(), ApiError> {
        let url = format!("{}/scans", self.base_url);
        self.send_checked("record_scan", self.with_auth(self.http.post(&url)).json(record))
            .await?;
        Ok(())
    }

    /// Fetch the most recent scans, newest first
    pub async fn scan_history(&self, limit: usize) -> Result<Vec<ScanRecord>, ApiError> {
        let url = format!("{}/scans?limit={}", self.base_url, limit);
        let response = self
            .send_checked("scan_history", self.with_auth(self.http.get(&url)))
            .await?;
        let records: Vec<ScanRecord> = response.json().await?;
        Ok(records)
    }

    /// Probe the backend health endpoint. Used by the readiness check.
    pub async fn health(&self) -> Result<(), ApiError> {
        let url = format!("{}/health", self.base_url);
        self.send_checked("health", self.with_auth(self.http.get(&url)))
            .await?;
        Ok(())
    }
}
