//! Request validation for `POST /process`
//!
//! Rejects malformed input before anything reaches the upstream API or the
//! webhook endpoint.

use chrono::NaiveDate;
use relay_core::dto::process::ProcessRequest;
use thiserror::Error;

/// Country suffixes the upstream serves
pub const SUPPORTED_COUNTRIES: &[&str] = &["co", "mx", "cl", "ar", "ec", "gt", "pa", "pe", "com.py"];

const FORBIDDEN_WEBHOOK_CHARS: &[char] = &[
    '<', '>', '"', '\'', ';', '&', '|', '`', '$', '(', ')', '{', '}', '[', ']', '\\', '\n', '\r',
    '\t',
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("api_key and date are required")]
    MissingCredentials,

    #[error("{field} must be in format YYYY-MM-DD")]
    InvalidDate { field: &'static str },

    #[error("dropi_country_suffix is required")]
    MissingCountry,

    #[error("dropi_country_suffix must be 2 lowercase letters or special format (e.g., 'co', 'mx', 'com.py')")]
    MalformedCountry,

    #[error("dropi_country_suffix '{0}' is not supported. Valid countries: co, mx, cl, ar, ec, gt, pa, pe, com.py")]
    UnsupportedCountry(String),

    #[error("webhook_suffix is required")]
    MissingWebhookSuffix,

    #[error("webhook_suffix cannot contain '..'")]
    WebhookPathTraversal,

    #[error("webhook_suffix contains invalid characters")]
    WebhookInvalidCharacters,
}

/// Validates a whole request, reporting the first problem found
pub fn validate_request(req: &ProcessRequest) -> Result<(), ValidationError> {
    if req.api_key.trim().is_empty() || req.date.trim().is_empty() {
        return Err(ValidationError::MissingCredentials);
    }

    validate_date("date", &req.date)?;
    if let Some(until) = req.date_util.as_deref().filter(|d| !d.is_empty()) {
        validate_date("date_util", until)?;
    }

    validate_country_suffix(&req.dropi_country_suffix)?;
    validate_webhook_suffix(&req.webhook_suffix)
}

/// Accepts exactly `YYYY-MM-DD` naming a real calendar day
pub fn validate_date(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(ValidationError::InvalidDate { field })
    }
}

pub fn validate_country_suffix(suffix: &str) -> Result<(), ValidationError> {
    if suffix.is_empty() {
        return Err(ValidationError::MissingCountry);
    }

    let well_formed = suffix == "com.py"
        || (suffix.len() == 2 && suffix.chars().all(|c| c.is_ascii_lowercase()));
    if !well_formed {
        return Err(ValidationError::MalformedCountry);
    }

    if !SUPPORTED_COUNTRIES.contains(&suffix) {
        return Err(ValidationError::UnsupportedCountry(suffix.to_string()));
    }

    Ok(())
}

pub fn validate_webhook_suffix(suffix: &str) -> Result<(), ValidationError> {
    if suffix.is_empty() {
        return Err(ValidationError::MissingWebhookSuffix);
    }

    if suffix.contains("..") {
        return Err(ValidationError::WebhookPathTraversal);
    }

    if suffix.contains(FORBIDDEN_WEBHOOK_CHARS) {
        return Err(ValidationError::WebhookInvalidCharacters);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProcessRequest {
        ProcessRequest {
            api_key: "key".to_string(),
            date: "2025-11-18".to_string(),
            dropi_country_suffix: "co".to_string(),
            webhook_suffix: "hooks/orders".to_string(),
            ..ProcessRequest::default()
        }
    }

    #[test]
    fn test_valid_request() {
        assert_eq!(validate_request(&request()), Ok(()));

        let mut req = request();
        req.date_util = Some("2025-11-20".to_string());
        req.dropi_country_suffix = "com.py".to_string();
        assert_eq!(validate_request(&req), Ok(()));
    }

    #[test]
    fn test_missing_credentials() {
        let mut req = request();
        req.api_key.clear();
        assert_eq!(validate_request(&req), Err(ValidationError::MissingCredentials));

        let mut req = request();
        req.date.clear();
        assert_eq!(validate_request(&req), Err(ValidationError::MissingCredentials));
    }

    #[test]
    fn test_date_format() {
        for bad in ["18-11-2025", "2025-1-18", "2025-02-30", "2025/11/18", "2025-11-18T00:00"] {
            assert!(validate_date("date", bad).is_err(), "{bad}");
        }
        assert!(validate_date("date", "2024-02-29").is_ok());

        let mut req = request();
        req.date_util = Some("tomorrow".to_string());
        assert_eq!(
            validate_request(&req).unwrap_err().to_string(),
            "date_util must be in format YYYY-MM-DD"
        );
    }

    #[test]
    fn test_country_suffix() {
        for country in SUPPORTED_COUNTRIES {
            assert_eq!(validate_country_suffix(country), Ok(()));
        }
        assert_eq!(validate_country_suffix(""), Err(ValidationError::MissingCountry));
        assert_eq!(validate_country_suffix("CO"), Err(ValidationError::MalformedCountry));
        assert_eq!(validate_country_suffix("co.uk"), Err(ValidationError::MalformedCountry));
        assert_eq!(
            validate_country_suffix("br"),
            Err(ValidationError::UnsupportedCountry("br".to_string()))
        );
    }

    #[test]
    fn test_webhook_suffix() {
        assert_eq!(validate_webhook_suffix("flows/abc-123/orders"), Ok(()));
        assert_eq!(validate_webhook_suffix(""), Err(ValidationError::MissingWebhookSuffix));
        assert_eq!(
            validate_webhook_suffix("../admin"),
            Err(ValidationError::WebhookPathTraversal)
        );

        for bad in ["a<b", "a;b", "a$b", "a`b", "a b\n", "a\\b", "a{b}", "a'b"] {
            assert_eq!(
                validate_webhook_suffix(bad),
                Err(ValidationError::WebhookInvalidCharacters),
                "{bad:?}"
            );
        }
    }
}
