use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::AuthConfig;
use crate::errors::{AuthError, MicrosoftRefreshError, MinecraftError, Result, XboxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// `application/json`
    Json(Value),
}

/// Which typed error payload a non-2xx body decodes into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorShape {
    MicrosoftRefresh,
    Xbox,
    Minecraft,
}

impl ErrorShape {
    /// Turn a rejected response into the matching [`AuthError`] variant.
    ///
    /// Bodies that are not a recognizable payload of the expected shape
    /// become [`AuthError::Http`].
    pub fn decode(self, status: StatusCode, body: &str) -> AuthError {
        let decoded = match self {
            Self::MicrosoftRefresh => serde_json::from_str::<MicrosoftRefreshError>(body)
                .ok()
                .filter(|e| e.error.is_some() || e.error_description.is_some())
                .map(AuthError::MicrosoftRefresh),
            Self::Xbox => serde_json::from_str::<XboxError>(body)
                .ok()
                .filter(|e| e.xerr != 0 || e.message.is_some())
                .map(AuthError::Xbox),
            Self::Minecraft => serde_json::from_str::<MinecraftError>(body)
                .ok()
                .filter(|e| !e.message().is_empty())
                .map(AuthError::Minecraft),
        };

        decoded.unwrap_or_else(|| AuthError::Http {
            status,
            body_snippet: if body.trim().is_empty() {
                format!("unknown error with status code {}", status.as_u16())
            } else {
                body.chars().take(200).collect()
            },
        })
    }
}

/// A single call to one of the remote services
#[derive(Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
    pub bearer: Option<String>,
    pub headers: Vec<(&'static str, String)>,
    pub error_shape: ErrorShape,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>, bearer: &str, error_shape: ErrorShape) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: RequestBody::Empty,
            bearer: Some(bearer.to_string()),
            headers: Vec::new(),
            error_shape,
        }
    }

    pub fn post_form(
        url: impl Into<String>,
        fields: &[(&str, &str)],
        error_shape: ErrorShape,
    ) -> Self {
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            method: Method::Post,
            url: url.into(),
            body: RequestBody::Form(fields),
            bearer: None,
            headers: Vec::new(),
            error_shape,
        }
    }

    pub fn post_json<T: Serialize>(
        url: impl Into<String>,
        body: &T,
        error_shape: ErrorShape,
    ) -> Result<Self> {
        Ok(Self {
            method: Method::Post,
            url: url.into(),
            body: RequestBody::Json(serde_json::to_value(body)?),
            bearer: None,
            headers: Vec::new(),
            error_shape,
        })
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

// Bodies and bearer tokens carry secrets
impl std::fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("error_shape", &self.error_shape)
            .finish_non_exhaustive()
    }
}

/// Carries requests to the remote services.
///
/// A successful (2xx) response yields its JSON body, or `None` when the body
/// is empty or `null`. A rejected response is converted into the
/// [`AuthError`] variant selected by the request's [`ErrorShape`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Option<Value>>;
}

/// [`Transport`] over a reqwest client
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.http_timeouts.connect)
            .timeout(config.http_timeouts.request)
            .user_agent(config.user_agent.as_deref().unwrap_or("msa-authenticator"))
            .build()?;

        Ok(Self { http })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, fields(method = ?request.method, url = %request.url))]
    async fn send(&self, request: ApiRequest) -> Result<Option<Value>> {
        let mut builder = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.header(ACCEPT, "*/*").form(fields),
            RequestBody::Json(value) => builder.header(ACCEPT, "application/json").json(value),
        };

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let body = response.text().await.map_err(classify)?;
        debug!(status = status.as_u16(), "Received response");

        if !status.is_success() {
            return Err(request.error_shape.decode(status, &body));
        }

        if body.trim().is_empty() {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(&body)?;
        Ok(if value.is_null() { None } else { Some(value) })
    }
}

fn classify(error: reqwest::Error) -> AuthError {
    if error.is_timeout() {
        AuthError::Timeout(error)
    } else {
        AuthError::Network(error)
    }
}
