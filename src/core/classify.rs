//! Error classification for raw generation-service failures.
//!
//! The service does not expose a stable structured error contract: failures
//! arrive as HTTP bodies, sometimes JSON, sometimes plain text, sometimes a
//! JSON blob embedded mid-sentence. Classification is therefore substring
//! matching against known markers, kept behind one pure function so the rule
//! table stays independently testable. Rules are ordered; first match wins.

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    CredentialInvalid,
    RegionUnsupported,
    Quota,
    ScriptUnavailable,
    Generic,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::CredentialInvalid => "credential_invalid",
            ErrorCategory::RegionUnsupported => "region_unsupported",
            ErrorCategory::Quota => "quota",
            ErrorCategory::ScriptUnavailable => "script_unavailable",
            ErrorCategory::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    ReselectCredential,
    WaitAndRetry,
    Inform,
}

impl RecoveryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryAction::ReselectCredential => "reselect_credential",
            RecoveryAction::WaitAndRetry => "wait_and_retry",
            RecoveryAction::Inform => "inform",
        }
    }
}

/// A raw failure mapped to a category plus the suggested recovery action.
/// Derived per run; lives only inside the `RunState` it terminates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub message: String,
    pub recovery: RecoveryAction,
}

impl ClassifiedError {
    /// Script synthesis succeeded but produced nothing usable (empty list or
    /// a payload that does not parse as a script).
    pub fn script_unavailable() -> Self {
        Self {
            category: ErrorCategory::ScriptUnavailable,
            message: "script synthesis returned no usable panels".to_string(),
            recovery: RecoveryAction::Inform,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.category, ErrorCategory::Quota | ErrorCategory::Generic)
    }
}

const CREDENTIAL_MARKERS: [&str; 4] = [
    "api_key_invalid",
    "api key expired",
    "api key not valid",
    "requested entity was not found",
];

const REGION_MARKERS: [&str; 2] = [
    "user location is not supported",
    "location is not supported",
];

const QUOTA_MARKERS: [&str; 4] = ["resource_exhausted", "rate limit", "quota", "429"];

/// Classify a raw failure payload. Never fails: anything unrecognized or
/// unparsable degrades to [`ErrorCategory::Generic`].
pub fn classify(payload: &str) -> ClassifiedError {
    let haystack = payload.to_lowercase();
    let message = extract_error_message(payload).unwrap_or_else(|| payload.trim().to_string());

    let (category, recovery) = if CREDENTIAL_MARKERS.iter().any(|m| haystack.contains(m)) {
        (
            ErrorCategory::CredentialInvalid,
            RecoveryAction::ReselectCredential,
        )
    } else if REGION_MARKERS.iter().any(|m| haystack.contains(m)) {
        (ErrorCategory::RegionUnsupported, RecoveryAction::Inform)
    } else if QUOTA_MARKERS.iter().any(|m| haystack.contains(m)) {
        (ErrorCategory::Quota, RecoveryAction::WaitAndRetry)
    } else {
        (ErrorCategory::Generic, RecoveryAction::Inform)
    };

    ClassifiedError {
        category,
        message,
        recovery,
    }
}

/// Dig a human-readable message out of an embedded JSON error body. The
/// service wraps failures as `{"error": {"message": "...", ...}}`, often
/// concatenated after prose, so parsing starts at the first `{`.
fn extract_error_message(payload: &str) -> Option<String> {
    let start = payload.find('{')?;
    let value: serde_json::Value = serde_json::from_str(payload[start..].trim()).ok()?;
    let message = value
        .get("error")
        .and_then(|e| e.get("message"))
        .or_else(|| value.get("message"))?
        .as_str()?
        .trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}
