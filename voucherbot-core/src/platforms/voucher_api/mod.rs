//! Remote voucher service: credential loading and the check/cleanup client.

pub mod auth;
pub mod client;

pub use auth::{load_cookie_blob, parse_cookie_json, CookieBlob};
pub use client::{classify_response, VoucherApiClient};
