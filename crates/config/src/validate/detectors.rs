//! Detector validation
//!
//! Checks endpoint URLs, timeouts, block statuses and API key availability.

use url::Url;

use super::{ErrorCategory, ValidationError, ValidationResult, ValidationWarning};
use crate::Config;

/// Validate detector endpoints
pub fn validate_detectors(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    for detector in config.detectors.values() {
        match check_api_base(&detector.api_base) {
            Ok(url) if url.scheme() == "http" => {
                result.add_warning(ValidationWarning::new(format!(
                    "Detector '{}' uses plain HTTP; conversation content is sent unencrypted",
                    detector.id
                )));
            }
            Ok(_) => {}
            Err(reason) => {
                result.add_error(ValidationError::new(
                    ErrorCategory::Detector,
                    format!(
                        "Detector '{}' api-base must be an http(s) URL with a host, got '{}': {}",
                        detector.id, detector.api_base, reason
                    ),
                ));
            }
        }

        if detector.timeout_ms == 0 {
            result.add_error(ValidationError::new(
                ErrorCategory::Detector,
                format!("Detector '{}' timeout-ms must be > 0", detector.id),
            ));
        }

        if !(400..600).contains(&detector.block_status) {
            result.add_error(ValidationError::new(
                ErrorCategory::Detector,
                format!(
                    "Detector '{}' block-status must be a 4xx or 5xx code, got {}",
                    detector.id, detector.block_status
                ),
            ));
        }

        if detector.resolve_api_key().is_none() {
            result.add_warning(ValidationWarning::new(format!(
                "Detector '{}' has no API key (set api-key or the {} environment variable)",
                detector.id, detector.api_key_env
            )));
        }
    }

    result
}

fn check_api_base(api_base: &str) -> Result<Url, String> {
    let url = Url::parse(api_base).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(url)
}
