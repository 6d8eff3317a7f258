//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: AppSettings → Result<(), Vec<String>>
//! - Runs before any server is constructed

use crate::config::schema::{
    AppSettings, HTTP_HOST_KEY, HTTP_PORT_KEY, HTTP_REQUEST_TIMEOUT_KEY, SHUTDOWN_TIMEOUT_KEY,
};

/// Upper bound for every timeout setting: one day.
pub const MAX_TIMEOUT_SECS: i64 = 24 * 60 * 60;

/// Check value ranges the typed getters cannot express.
pub fn validate_settings(settings: &AppSettings) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if settings.http.host.trim().is_empty() {
        errors.push(format!("{HTTP_HOST_KEY} must not be empty"));
    }
    if !(0..=i64::from(u16::MAX)).contains(&settings.http.port) {
        errors.push(format!(
            "{HTTP_PORT_KEY} must be between 0 and 65535, got {}",
            settings.http.port
        ));
    }
    check_timeout(&mut errors, HTTP_REQUEST_TIMEOUT_KEY, settings.http.request_timeout_secs);
    check_timeout(&mut errors, SHUTDOWN_TIMEOUT_KEY, settings.shutdown.timeout_secs);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_timeout(errors: &mut Vec<String>, key: &str, secs: i64) {
    if !(1..=MAX_TIMEOUT_SECS).contains(&secs) {
        errors.push(format!(
            "{key} must be between 1 and {MAX_TIMEOUT_SECS} seconds, got {secs}"
        ));
    }
}
