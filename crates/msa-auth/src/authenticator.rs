use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::capture::{LoginCapture, LoginOutcome};
use crate::client::AuthClient;
use crate::config::AuthConfig;
use crate::errors::{AuthError, AuthFailure, Result};
use crate::expiry::expired;
use crate::phase::Phase;
use crate::result::AuthResult;
use crate::transport::Transport;

/// Runs the Microsoft → Xbox Live → Minecraft token exchange.
///
/// Every run owns its own [`AuthResult`]. The phase tracker is shared by
/// clones of the same authenticator, so concurrent runs on one instance only
/// race on what [`MicrosoftAuthenticator::phase`] reports.
#[derive(Debug, Clone)]
pub struct MicrosoftAuthenticator {
    client: AuthClient,
}

impl MicrosoftAuthenticator {
    pub fn new(config: AuthConfig) -> Result<Self> {
        Ok(Self {
            client: AuthClient::new(config)?,
        })
    }

    pub fn with_transport(config: AuthConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            client: AuthClient::with_transport(config, transport),
        }
    }

    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    /// Stage the most recent run is in, `None` before any stage started
    pub fn phase(&self) -> Option<Phase> {
        self.client.phase().current()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<Option<Phase>> {
        self.client.phase().subscribe()
    }

    /// URL the interactive login should present
    pub fn authorize_url(&self) -> Result<Url> {
        self.client.build_authorize_url()
    }

    /// Walk the user through the login page, then run the full chain with the
    /// code it produced. A capture that fails locally ends the run with its
    /// error.
    #[instrument(skip_all)]
    pub async fn run_interactive(
        &self,
        capture: &dyn LoginCapture,
    ) -> std::result::Result<AuthResult, AuthFailure> {
        self.client.phase().reset();
        let url = self
            .authorize_url()
            .map_err(|e| AuthFailure::new(AuthResult::new(), e))?;

        self.client.phase().advance(Phase::AwaitingLogin);
        let outcome = capture
            .present(&url)
            .await
            .map_err(|e| AuthFailure::new(AuthResult::new(), e))?;

        match outcome {
            LoginOutcome::Code(code) => self.run_code_chain(&code).await,
            LoginOutcome::ProviderError(error) => {
                Err(AuthFailure::new(AuthResult::new(), AuthError::Url(error)))
            }
            LoginOutcome::Cancelled => {
                Err(AuthFailure::new(AuthResult::new(), AuthError::UserCancelled))
            }
        }
    }

    /// Run the full chain once for a freshly obtained authorization code.
    ///
    /// The first failing stage ends the run; its error comes back together
    /// with whatever was obtained before it.
    #[instrument(skip_all)]
    pub async fn run_from_authorization_code(
        &self,
        code: &str,
    ) -> std::result::Result<AuthResult, AuthFailure> {
        self.client.phase().reset();
        self.run_code_chain(code).await
    }

    /// Resume a session from stored tokens.
    ///
    /// Returns `Ok(None)` without touching the network when `expires_at` has
    /// not passed and `force_refresh` says no. Otherwise the downstream chain
    /// is attempted with `access_token` first; each failure is followed by a
    /// refresh through `refresh_token` and another attempt, up to the
    /// configured number of retries. Ownership and local errors are never
    /// retried.
    #[instrument(skip(self, refresh_token, access_token, force_refresh))]
    pub async fn run_from_stored_token(
        &self,
        refresh_token: &str,
        access_token: &str,
        expires_at: i64,
        force_refresh: impl FnOnce() -> bool + Send,
    ) -> std::result::Result<Option<AuthResult>, AuthFailure> {
        if !(expired(expires_at) || force_refresh()) {
            debug!("Stored tokens still valid, nothing to do");
            return Ok(None);
        }

        self.client.phase().reset();
        let max_retries = self.client.config().retry.max_retries;
        let mut result = AuthResult::new();
        let mut access_token = access_token.to_string();
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                match self
                    .client
                    .refresh_microsoft_account(&mut result, refresh_token)
                    .await
                {
                    Ok(Some(account)) => access_token = account.access_token,
                    Ok(None) => {}
                    Err(error) => return Err(AuthFailure::new(result, error)),
                }
            }

            result.clear_downstream();
            match self.run_downstream(&mut result, &access_token).await {
                Ok(()) => break,
                Err(error) if error.is_retryable() && attempt < max_retries => {
                    attempt += 1;
                    warn!(attempt, max_retries, "Downstream authentication failed, refreshing: {}", error);
                }
                Err(error) => return Err(AuthFailure::new(result, error)),
            }
        }

        info!(complete = result.is_complete(), "Session resumed");
        Ok(Some(result))
    }

    async fn run_code_chain(&self, code: &str) -> std::result::Result<AuthResult, AuthFailure> {
        let mut result = AuthResult::new();
        match self.exchange_code(&mut result, code).await {
            Ok(()) => {
                info!(complete = result.is_complete(), "Login finished");
                Ok(result)
            }
            Err(error) => Err(AuthFailure::new(result, error)),
        }
    }

    async fn exchange_code(&self, result: &mut AuthResult, code: &str) -> Result<()> {
        let Some(account) = self.client.acquire_microsoft_account(result, code).await? else {
            return Ok(());
        };
        self.run_downstream(result, &account.access_token).await
    }

    /// XBL → XSTS → Minecraft login → ownership → Xbox Live XSTS → profile.
    ///
    /// A stage that yields nothing ends the chain quietly; an error ends it
    /// loudly.
    async fn run_downstream(&self, result: &mut AuthResult, ms_access_token: &str) -> Result<()> {
        let Some(xbl) = self.client.acquire_xbl_token(result, ms_access_token).await? else {
            return Ok(());
        };

        let Some(xsts) = self.client.acquire_xsts_token(result, &xbl.token).await? else {
            return Ok(());
        };
        let user_hash = xsts
            .user_hash()
            .ok_or_else(|| AuthError::InvalidResponse("Missing XUI claims".to_string()))?;

        let Some(minecraft) = self
            .client
            .acquire_minecraft_account(result, user_hash, &xsts.token)
            .await?
        else {
            return Ok(());
        };

        if self
            .client
            .acquire_minecraft_store(result, &minecraft.access_token)
            .await?
            .is_none()
        {
            return Ok(());
        }

        if self
            .client
            .acquire_xbox_live_xsts_token(result, &xbl.token)
            .await?
            .is_none()
        {
            return Ok(());
        }

        self.client
            .acquire_minecraft_profile(result, &minecraft.access_token)
            .await?;
        Ok(())
    }
}
