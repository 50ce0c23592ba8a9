//! Boundary validation. Malformed shapes are rejected in the handlers and
//! never reach the use cases.

use crate::crypto::normalize_email;

/// Validate and normalize an email address. Deliberately shallow: the
/// allow-list is the real gate, this only rejects obviously broken input.
pub fn parse_email(raw: &str) -> Option<String> {
    let email = normalize_email(raw);
    if email.len() > 254 || email.contains(char::is_whitespace) {
        return None;
    }
    if email.matches('@').count() != 1 {
        return None;
    }
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return None;
    }
    Some(email)
}

/// One-time codes are exactly six ASCII digits.
pub fn is_valid_code_shape(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}
