// File: voucherbot-core/src/platforms/voucher_api/auth.rs
//
// The remote service authenticates with browser cookies exported as JSON.
// Two export shapes are common: a list of `{ "name": .., "value": .. }`
// objects (browser extensions) or a flat `{ "name": "value" }` object.

use std::fmt;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::Error;

/// Opaque `Cookie` header value. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct CookieBlob(String);

impl CookieBlob {
    pub fn new(header_value: impl Into<String>) -> Self {
        Self(header_value.into())
    }

    pub fn header_value(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CookieBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CookieBlob(<{} bytes redacted>)", self.0.len())
    }
}

/// Loads the cookie file once at startup.
///
/// A missing file is not an error: the bot still runs, every check simply
/// reports a network error. A file that exists but can't be understood is.
pub fn load_cookie_blob(path: &Path) -> Result<Option<CookieBlob>, Error> {
    if !path.exists() {
        warn!("Cookie file not found at {} => checks will fail until it is provided", path.display());
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    let blob = parse_cookie_json(&raw)?;
    info!("Loaded cookies from {}", path.display());
    Ok(Some(blob))
}

pub fn parse_cookie_json(raw: &str) -> Result<CookieBlob, Error> {
    let data: Value = serde_json::from_str(raw)
        .map_err(|e| Error::Credential(format!("cookie file is not valid JSON: {e}")))?;

    let pairs: Vec<String> = match data {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                let name = obj.get("name")?;
                let value = obj.get("value")?;
                Some(format!("{}={}", plain(name), plain(value)))
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}={}", k, plain(v)))
            .collect(),
        _ => {
            return Err(Error::Credential(
                "cookie file must hold a list of {name, value} objects or a flat object".into(),
            ))
        }
    };

    if pairs.is_empty() {
        return Err(Error::Credential("cookie file contains no cookies".into()));
    }
    Ok(CookieBlob(pairs.join("; ")))
}

// Strings go in without their JSON quotes, anything else as its JSON text.
fn plain(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
