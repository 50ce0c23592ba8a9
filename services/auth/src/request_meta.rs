//! Client metadata extraction.
//!
//! Raw IP and user agent never leave this module; everything downstream works
//! with salted hashes, and the type itself only carries the hashes.

use axum::http::HeaderMap;

use crate::crypto::hash_identifier;

#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub ip_hash: String,
    pub user_agent_hash: String,
}

pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_owned();
            }
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_owned()
}

impl RequestMeta {
    pub fn from_headers(headers: &HeaderMap, audit_salt: &str) -> Self {
        let ip = client_ip(headers);
        let user_agent = headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        Self {
            ip_hash: hash_identifier(&ip, audit_salt),
            user_agent_hash: hash_identifier(user_agent, audit_salt),
        }
    }
}
