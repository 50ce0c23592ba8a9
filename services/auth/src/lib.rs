pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod infra;
pub mod otp;
pub mod rate_limit;
pub mod request_meta;
pub mod risk;
pub mod router;
pub mod state;
pub mod usecase;
pub mod validation;
