//! The interactive login surface, reduced to a single capability: show the
//! user a URL and eventually report how the login ended.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{instrument, warn};
use url::Url;

use crate::errors::{AuthError, Result, UrlError};

/// How an interactive login ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Code(String),
    ProviderError(UrlError),
    Cancelled,
}

impl LoginOutcome {
    /// Interpret the URL the identity provider redirected to.
    ///
    /// `error` wins over `code`. An `error` without `error_description` is
    /// treated as the user walking away.
    pub fn from_redirect(redirect_url: &str) -> Result<Self> {
        let url = Url::parse(redirect_url)?;
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

        if let Some(error) = params.get("error") {
            return Ok(match params.get("error_description") {
                Some(description) => Self::ProviderError(UrlError {
                    error: error.clone(),
                    description: description.clone(),
                }),
                None => Self::Cancelled,
            });
        }

        params
            .get("code")
            .map(|code| Self::Code(code.clone()))
            .ok_or(AuthError::InvalidRedirect)
    }
}

/// Extract the authorization code from a redirect URL
pub fn parse_redirect(redirect_url: &str) -> Result<String> {
    match LoginOutcome::from_redirect(redirect_url)? {
        LoginOutcome::Code(code) => Ok(code),
        LoginOutcome::ProviderError(error) => Err(AuthError::Url(error)),
        LoginOutcome::Cancelled => Err(AuthError::UserCancelled),
    }
}

/// Something able to walk a user through the Microsoft login page
#[async_trait]
pub trait LoginCapture: Send + Sync {
    /// Present `authorize_url` and resolve once the login finished one way or
    /// another. An `Err` is a local failure, such as an unusable redirect.
    async fn present(&self, authorize_url: &Url) -> Result<LoginOutcome>;
}

/// Prints the login URL and reads the result back from stdin.
///
/// Accepts either the full redirect URL copied from the browser or the bare
/// authorization code. An empty line or end of input cancels; a redirect URL
/// that does not parse or lacks a code is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleCapture;

#[async_trait]
impl LoginCapture for ConsoleCapture {
    #[instrument(skip_all)]
    async fn present(&self, authorize_url: &Url) -> Result<LoginOutcome> {
        let mut stdout = io::stdout();
        let prompt = format!(
            "Open this URL in your browser and sign in:\n{}\n\nThen paste the URL you were redirected to (or just the code):\n",
            authorize_url
        );
        if let Err(e) = stdout.write_all(prompt.as_bytes()).await {
            warn!("Failed to write login prompt: {}", e);
        }
        if let Err(e) = stdout.flush().await {
            warn!("Failed to flush login prompt: {}", e);
        }

        let mut line = String::new();
        let mut stdin = BufReader::new(io::stdin());
        match stdin.read_line(&mut line).await {
            Ok(_) => outcome_from_input(&line),
            Err(e) => {
                warn!("Failed to read login response: {}", e);
                Ok(LoginOutcome::Cancelled)
            }
        }
    }
}

fn outcome_from_input(input: &str) -> Result<LoginOutcome> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(LoginOutcome::Cancelled);
    }

    if input.contains("://") {
        return LoginOutcome::from_redirect(input);
    }

    Ok(LoginOutcome::Code(input.to_string()))
}
