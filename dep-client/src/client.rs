use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};

use dep_config::ClientOptions;
use dep_core::{CoreError, CoreResult, EnvironmentProfile};
use dep_order::{assemble, EnrollmentEnvelope, Order};
use dep_shared::Masked;

use crate::response::{interpret, EnrollmentResult};
use crate::transport::{EnrollmentTransport, RemoteResponse};

pub const BULK_ENROLL_DEVICES: &str = "bulk-enroll-devices";
pub const CHECK_TRANSACTION_STATUS: &str = "check-transaction-status";
pub const SHOW_ORDER_DETAILS: &str = "show-order-details";

pub const RESELLER_ID_HEADER: &str = "x-dep-reseller-id";
pub const SHIP_TO_HEADER: &str = "x-dep-ship-to";

const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// `requestContext` block carried by the lookup calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub ship_to: String,
    pub time_zone: String,
    pub lang_code: String,
}

impl RequestContext {
    pub fn new(profile: &EnvironmentProfile, options: &ClientOptions) -> Self {
        Self {
            ship_to: profile.ship_to().to_string(),
            time_zone: options.time_zone.clone(),
            lang_code: options.lang_code.clone(),
        }
    }

    pub fn to_document(&self) -> Value {
        json!({
            "shipTo": self.ship_to,
            "timeZone": self.time_zone,
            "langCode": self.lang_code,
        })
    }
}

/// Mutual-TLS client for the enrollment service.
///
/// Holds no connection state: every call builds its own HTTP client from the
/// profile's certificate pair and drops it when the call ends, so nothing is
/// pooled across calls and a cancelled call leaves no session behind.
/// Exactly one attempt is made per call.
#[derive(Debug, Clone, Default)]
pub struct DepClient {
    options: ClientOptions,
}

impl DepClient {
    pub fn new(options: ClientOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Assemble, submit and interpret in one call.
    pub async fn enroll(
        &self,
        transaction_id: impl Into<String>,
        order: Order,
        profile: &EnvironmentProfile,
    ) -> CoreResult<EnrollmentResult> {
        let envelope = assemble(transaction_id, order)?;
        let response = self.submit(&envelope, profile).await?;
        let result = interpret(&response.body)?;

        tracing::info!(
            "Enrollment {} for order {} finished as {:?}",
            envelope.transaction_id(),
            envelope.order().order_number(),
            result.outcome
        );
        Ok(result)
    }

    /// Ask for the processing status of an earlier bulk enrollment.
    pub async fn check_transaction_status(
        &self,
        transaction_id: &str,
        profile: &EnvironmentProfile,
    ) -> CoreResult<EnrollmentResult> {
        if transaction_id.trim().is_empty() {
            return Err(CoreError::validation("deviceEnrollmentTransactionId", "must not be empty"));
        }
        let body = json!({
            "requestContext": RequestContext::new(profile, &self.options).to_document(),
            "depResellerId": profile.reseller_id(),
            "deviceEnrollmentTransactionId": transaction_id,
        });
        let response = self.post(profile, CHECK_TRANSACTION_STATUS, &body).await?;
        interpret(&response.body)
    }

    /// Latest enrollment state of previously submitted orders.
    pub async fn show_order_details(
        &self,
        order_numbers: &[String],
        profile: &EnvironmentProfile,
    ) -> CoreResult<EnrollmentResult> {
        if order_numbers.is_empty() {
            return Err(CoreError::validation("orderNumbers", "at least one order number is required"));
        }
        if order_numbers.iter().any(|n| n.trim().is_empty()) {
            return Err(CoreError::validation("orderNumbers", "order numbers must not be empty"));
        }
        let body = json!({
            "requestContext": RequestContext::new(profile, &self.options).to_document(),
            "depResellerId": profile.reseller_id(),
            "orderNumbers": order_numbers,
        });
        let response = self.post(profile, SHOW_ORDER_DETAILS, &body).await?;
        interpret(&response.body)
    }

    async fn post(
        &self,
        profile: &EnvironmentProfile,
        endpoint: &str,
        body: &Value,
    ) -> CoreResult<RemoteResponse> {
        let identity = load_identity(profile).await?;
        let http = self.http_client(profile, identity)?;
        let url = profile.endpoint_url(endpoint);

        tracing::debug!("POST {} ({})", url, profile.environment());

        let resp = http
            .post(&url)
            .body(body.to_string())
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body = match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!("Unable to read DEP {} rejection body: {}", endpoint, e);
                    String::new()
                }
            };
            tracing::warn!("DEP {} rejected with HTTP {}", endpoint, code);
            return Err(CoreError::RemoteRejectionError { status: code, body });
        }

        let text = resp.text().await.map_err(transport_error)?;
        let body: Value = serde_json::from_str(&text).map_err(|e| {
            CoreError::MalformedResponseError(format!("{} returned a non-JSON body: {}", endpoint, e))
        })?;

        tracing::debug!("DEP {} answered HTTP {}", endpoint, status.as_u16());
        Ok(RemoteResponse { status: status.as_u16(), body })
    }

    fn http_client(&self, profile: &EnvironmentProfile, identity: reqwest::Identity) -> CoreResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(RESELLER_ID_HEADER),
            header_value("reseller id", profile.reseller_id())?,
        );
        headers.insert(
            HeaderName::from_static(SHIP_TO_HEADER),
            header_value("ship-to", profile.ship_to())?,
        );

        reqwest::Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .default_headers(headers)
            .connect_timeout(self.options.connect_timeout)
            .timeout(self.options.timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| CoreError::TransportError(format!("unable to set up TLS client: {}", e)))
    }
}

#[async_trait]
impl EnrollmentTransport for DepClient {
    async fn submit(
        &self,
        envelope: &EnrollmentEnvelope,
        profile: &EnvironmentProfile,
    ) -> CoreResult<RemoteResponse> {
        tracing::info!(
            "Submitting transaction {} (order {}, {} devices) to DEP {}",
            envelope.transaction_id(),
            envelope.order().order_number(),
            envelope.order().device_count(),
            profile.environment()
        );
        self.post(profile, BULK_ENROLL_DEVICES, &envelope.to_document()).await
    }
}

/// Read the certificate and key PEM files into one identity.
///
/// An unreadable file is a configuration problem and stops the call before
/// any connection is attempted; PEM the TLS stack refuses is a transport
/// problem.
async fn load_identity(profile: &EnvironmentProfile) -> CoreResult<reqwest::Identity> {
    let cert = read_pem("certificate", profile.certificate_path()).await?;
    let key = read_pem("private key", profile.private_key_path()).await?;

    let mut bundle = cert.into_inner();
    bundle.push(b'\n');
    bundle.extend_from_slice(key.expose());
    let bundle = Masked::new(bundle);

    reqwest::Identity::from_pem(bundle.expose())
        .map_err(|e| CoreError::TransportError(format!("client certificate rejected: {}", e)))
}

async fn read_pem(what: &str, path: &std::path::Path) -> CoreResult<Masked<Vec<u8>>> {
    tokio::fs::read(path).await.map(Masked::new).map_err(|e| {
        CoreError::ConfigurationError(format!("unable to read {} {}: {}", what, path.display(), e))
    })
}

fn header_value(what: &str, value: &str) -> CoreResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| {
        CoreError::ConfigurationError(format!("{} contains characters not allowed in a header", what))
    })
}

fn transport_error(err: reqwest::Error) -> CoreError {
    let what = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    tracing::warn!("DEP transport failure: {}: {}", what, err);
    CoreError::TransportError(format!("{}: {}", what, err))
}
