//! sea-orm entities for the auth service.

pub mod allowed_emails;
pub mod auth_events;
pub mod otp_codes;
pub mod sessions;
pub mod users;
