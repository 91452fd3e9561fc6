// File: voucherbot-core/src/platforms/voucher_api/client.rs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};
use voucherbot_common::models::CheckOutcome;
use voucherbot_common::traits::VoucherChecker;

use crate::config::ApiConfig;
use crate::http::{HttpClient, HttpResponse};
use crate::platforms::voucher_api::auth::CookieBlob;
use crate::Error;

const APPLY_PATH: &str = "/api/cart/apply-voucher";
const RESET_PATH: &str = "/api/cart/reset-voucher";

/// Key whose presence in the apply response marks a code as unusable.
const ERROR_INDICATOR: &str = "errorMessage";

const USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36";

/// Checks a code by applying it to the cart, then removes it again.
///
/// Two requests per code, no retries: pacing and re-checking are the scan
/// engine's and the protection loop's business.
pub struct VoucherApiClient {
    http: Arc<dyn HttpClient>,
    api: ApiConfig,
    cookie: Option<CookieBlob>,
}

impl VoucherApiClient {
    pub fn new(http: Arc<dyn HttpClient>, api: ApiConfig, cookie: Option<CookieBlob>) -> Self {
        Self { http, api, cookie }
    }

    pub fn has_credential(&self) -> bool {
        self.cookie.is_some()
    }

    fn endpoint(&self, path: &str) -> Result<String, Error> {
        self.api
            .base_url
            .join(path)
            .map(|u| u.to_string())
            .map_err(|e| Error::Platform(format!("bad endpoint {path}: {e}")))
    }

    fn headers(&self, cookie: &CookieBlob) -> HashMap<String, String> {
        let origin = self.api.base_url.origin().ascii_serialization();
        let mut h = HashMap::new();
        h.insert("accept".into(), "application/json".into());
        h.insert("accept-language".into(), "en-US,en;q=0.9".into());
        h.insert("cache-control".into(), "no-cache".into());
        h.insert("pragma".into(), "no-cache".into());
        h.insert("referer".into(), format!("{origin}/cart"));
        h.insert("origin".into(), origin);
        h.insert("sec-fetch-dest".into(), "empty".into());
        h.insert("sec-fetch-mode".into(), "cors".into());
        h.insert("sec-fetch-site".into(), "same-origin".into());
        h.insert("user-agent".into(), USER_AGENT.into());
        h.insert("x-tenant-id".into(), "SHEIN".into());
        h.insert("cookie".into(), cookie.header_value().to_string());
        h
    }

    fn payload(code: &str) -> Value {
        json!({
            "voucherId": code,
            "device": { "client_type": "mobile_web" },
        })
    }

    async fn apply_voucher(&self, code: &str, cookie: &CookieBlob) -> Result<HttpResponse, Error> {
        let url = self.endpoint(APPLY_PATH)?;
        self.http
            .post_json(&url, &self.headers(cookie), &Self::payload(code), self.api.check_timeout)
            .await
    }

    async fn reset_voucher(&self, code: &str, cookie: &CookieBlob) -> Result<(), Error> {
        let url = self.endpoint(RESET_PATH)?;
        self.http
            .post_json(&url, &self.headers(cookie), &Self::payload(code), self.api.reset_timeout)
            .await?;
        Ok(())
    }
}

/// Maps the raw apply-voucher body onto an outcome.
///
/// * body that is not JSON (or is `null`) => `NetworkError`
/// * JSON with a top-level `errorMessage` key, whatever its text => `Dead`
/// * any other JSON => `Alive`
///
/// The HTTP status is deliberately not consulted.
pub fn classify_response(body: &str) -> CheckOutcome {
    match serde_json::from_str::<Value>(body) {
        Err(_) | Ok(Value::Null) => CheckOutcome::NetworkError,
        Ok(Value::Object(map)) if map.contains_key(ERROR_INDICATOR) => CheckOutcome::Dead,
        Ok(_) => CheckOutcome::Alive,
    }
}

#[async_trait]
impl VoucherChecker for VoucherApiClient {
    async fn check_one(&self, code: &str) -> CheckOutcome {
        let cookie = match &self.cookie {
            Some(c) => c,
            None => {
                warn!(code, "No cookies loaded => reporting network error");
                return CheckOutcome::NetworkError;
            }
        };

        let outcome = match self.apply_voucher(code, cookie).await {
            Ok(resp) => {
                let outcome = classify_response(&resp.body);
                if outcome == CheckOutcome::NetworkError {
                    warn!(code, status = resp.status, "Unreadable apply-voucher response");
                }
                outcome
            }
            Err(e) => {
                warn!(code, "Network error: {}", e);
                CheckOutcome::NetworkError
            }
        };

        // Keeps the cart clean; the verdict above stands either way.
        if let Err(e) = self.reset_voucher(code, cookie).await {
            debug!(code, "reset-voucher failed (ignored): {}", e);
        }

        outcome
    }
}
