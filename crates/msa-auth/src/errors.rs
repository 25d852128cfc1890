use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::result::AuthResult;

/// Authentication pipeline error types
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Microsoft token request rejected: {0}")]
    MicrosoftRefresh(MicrosoftRefreshError),

    #[error("Xbox Live rejected the request: {0}")]
    Xbox(XboxError),

    #[error("Minecraft services rejected the request: {0}")]
    Minecraft(MinecraftError),

    #[error("Login failed: {0}")]
    Url(UrlError),

    #[error("HTTP error {status}: {body_snippet}")]
    Http {
        status: reqwest::StatusCode,
        body_snippet: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Player didn't buy Minecraft Java Edition or did not migrate its account")]
    NotOwned,

    #[error("User cancelled the authentication flow")]
    UserCancelled,

    #[error("Invalid redirect URI or missing code")]
    InvalidRedirect,

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Broad classification used by the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Timeouts and I/O failures talking to a remote service
    Transport,
    /// A remote service answered with an error payload
    Provider,
    /// The account is not allowed to proceed; terminal
    BusinessRule,
    /// Malformed input on our side; terminal
    Local,
}

impl AuthError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Timeout(_) | Self::Network(_) => ErrorCategory::Transport,
            Self::MicrosoftRefresh(_)
            | Self::Xbox(_)
            | Self::Minecraft(_)
            | Self::Url(_)
            | Self::Http { .. }
            | Self::InvalidResponse(_)
            | Self::Serde(_) => ErrorCategory::Provider,
            Self::NotOwned => ErrorCategory::BusinessRule,
            Self::UserCancelled | Self::InvalidRedirect | Self::UrlParse(_) => ErrorCategory::Local,
        }
    }

    /// Whether the stored-token entry point may retry after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transport | ErrorCategory::Provider
        )
    }

    /// Human readable message, derived from the remote payload when there is one
    pub fn message(&self) -> String {
        match self {
            Self::MicrosoftRefresh(e) => e.message().to_string(),
            Self::Xbox(e) => e.message().to_string(),
            Self::Minecraft(e) => e.message().to_string(),
            Self::Url(e) => e.message(),
            Self::Timeout(_) => "Request timed out".to_string(),
            Self::Network(_) => "I/O exception thrown during Microsoft HTTP requests".to_string(),
            other => other.to_string(),
        }
    }
}

/// A pipeline run that stopped on an error, along with everything it obtained
#[derive(Error, Debug)]
#[error("{error}")]
pub struct AuthFailure {
    pub result: AuthResult,
    #[source]
    pub error: AuthError,
}

impl AuthFailure {
    pub fn new(result: AuthResult, error: AuthError) -> Self {
        Self { result, error }
    }
}

/// Error body of the Microsoft token endpoint (code exchange and refresh)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MicrosoftRefreshError {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl MicrosoftRefreshError {
    pub fn message(&self) -> &str {
        self.error_description
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or_default()
    }
}

impl fmt::Display for MicrosoftRefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Error body of the XBL and XSTS endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct XboxError {
    #[serde(rename = "XErr", default)]
    pub xerr: u64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
}

impl XboxError {
    pub fn kind(&self) -> XboxErrorKind {
        XboxErrorKind::from_xerr(self.xerr)
    }

    /// Message for well-known XErr codes, `None` when the code is unclassified
    pub fn known_message(&self) -> Option<&'static str> {
        self.kind().known_message()
    }

    /// The explicit message, unless it is empty or too short to say anything,
    /// in which case the well-known message for the code is used.
    pub fn message(&self) -> &str {
        let raw = self.message.as_deref().unwrap_or_default();
        if raw.chars().count() <= 4 {
            return self.known_message().unwrap_or(raw);
        }
        raw
    }
}

impl fmt::Display for XboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (XErr: {})", self.message(), self.xerr)
    }
}

/// XSTS-specific error codes from the XErr field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XboxErrorKind {
    NoXboxAccount,
    RegionNotSupported,
    AdultVerificationRequired,
    ChildAccountRequiresFamily,
    Unknown(u64),
}

impl XboxErrorKind {
    pub fn from_xerr(code: u64) -> Self {
        match code {
            2148916233 => Self::NoXboxAccount,
            2148916235 => Self::RegionNotSupported,
            2148916236 | 2148916237 => Self::AdultVerificationRequired,
            2148916238 => Self::ChildAccountRequiresFamily,
            code => Self::Unknown(code),
        }
    }

    pub fn known_message(self) -> Option<&'static str> {
        match self {
            Self::NoXboxAccount => Some("The account doesn't have an Xbox account"),
            Self::RegionNotSupported => {
                Some("The account is from a country where Xbox Live is not available/banned")
            }
            Self::AdultVerificationRequired => {
                Some("The account needs adult verification on Xbox page. (South Korea)")
            }
            Self::ChildAccountRequiresFamily => Some(
                "The account is a child (under 18) and cannot proceed unless the account is added to a Family by an adult",
            ),
            Self::Unknown(_) => None,
        }
    }
}

/// Error body of the Minecraft services endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinecraftError {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub developer_message: Option<String>,
}

impl MinecraftError {
    /// `errorMessage`, then `error`, then `path`
    pub fn message(&self) -> &str {
        self.error_message
            .as_deref()
            .or(self.error.as_deref())
            .or(self.path.as_deref())
            .unwrap_or_default()
    }
}

impl fmt::Display for MinecraftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// `error` and `error_description` taken from a failed login redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlError {
    pub error: String,
    pub description: String,
}

impl UrlError {
    pub fn message(&self) -> String {
        format!("{} : {}", self.error, self.description)
    }
}

impl fmt::Display for UrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
