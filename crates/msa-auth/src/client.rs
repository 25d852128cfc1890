use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::{AuthConfig, MINECRAFT_OWNERSHIP_ITEM, RP_MINECRAFT, RP_XBL_AUTH, RP_XBOXLIVE};
use crate::errors::{AuthError, Result};
use crate::models::*;
use crate::phase::{Phase, PhaseTracker};
use crate::result::AuthResult;
use crate::transport::{ApiRequest, ErrorShape, HttpTransport, Transport};

/// Issues the individual pipeline calls.
///
/// Each stage advances the phase tracker, performs exactly one remote call,
/// and records its artifact into the run's [`AuthResult`]. `Ok(None)` means
/// the service answered without producing anything.
#[derive(Clone)]
pub struct AuthClient {
    config: AuthConfig,
    transport: Arc<dyn Transport>,
    phase: PhaseTracker,
}

impl AuthClient {
    /// Create a client talking HTTP to the configured endpoints
    pub fn new(config: AuthConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: AuthConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            phase: PhaseTracker::new(),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn phase(&self) -> &PhaseTracker {
        &self.phase
    }

    /// Build the authorization URL the login page should open
    pub fn build_authorize_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.config.endpoints.authorize)?;
        url.query_pairs_mut()
            .append_pair("client_id", self.config.client_id.as_str())
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", self.config.scope.as_str())
            .append_pair("response_type", "code")
            .append_pair("prompt", "login");

        debug!("Built authorize URL: {}", url);
        Ok(url)
    }

    /// Exchange an authorization code for Microsoft tokens
    #[instrument(skip_all)]
    pub async fn acquire_microsoft_account(
        &self,
        result: &mut AuthResult,
        code: &str,
    ) -> Result<Option<MicrosoftAccount>> {
        self.phase.advance(Phase::AcquiringMicrosoftAccount);

        let request = ApiRequest::post_form(
            &self.config.endpoints.token,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", self.config.scope.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ],
            ErrorShape::MicrosoftRefresh,
        );

        let account = self.call::<MicrosoftAccount>(request).await?;
        result.microsoft_account = account.clone();
        Ok(account)
    }

    /// Obtain a fresh Microsoft access token from a refresh token
    #[instrument(skip_all)]
    pub async fn refresh_microsoft_account(
        &self,
        result: &mut AuthResult,
        refresh_token: &str,
    ) -> Result<Option<MicrosoftAccount>> {
        self.phase.advance(Phase::RefreshingMicrosoftAccount);

        let request = ApiRequest::post_form(
            &self.config.endpoints.token,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("scope", self.config.scope.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ],
            ErrorShape::MicrosoftRefresh,
        );

        let account = self.call::<MicrosoftAccount>(request).await?;
        result.microsoft_account = account.clone();
        Ok(account)
    }

    /// Authenticate with Xbox Live
    #[instrument(skip_all)]
    pub async fn acquire_xbl_token(
        &self,
        result: &mut AuthResult,
        ms_access_token: &str,
    ) -> Result<Option<XblToken>> {
        self.phase.advance(Phase::AcquiringXblToken);

        let body = XblAuthRequest {
            properties: XblAuthProperties {
                auth_method: "RPS".to_string(),
                site_name: "user.auth.xboxlive.com".to_string(),
                rps_ticket: ms_access_token.to_string(),
            },
            relying_party: RP_XBL_AUTH.to_string(),
            token_type: "JWT".to_string(),
        };
        let request =
            ApiRequest::post_json(&self.config.endpoints.xbl_authenticate, &body, ErrorShape::Xbox)?
                .header("X-Xbl-Contract-Version", "2");

        let token = self.call::<XblToken>(request).await?;
        result.xbl_token = token.clone();
        Ok(token)
    }

    /// XSTS token for the Minecraft services relying party
    pub async fn acquire_xsts_token(
        &self,
        result: &mut AuthResult,
        xbl_token: &str,
    ) -> Result<Option<XstsToken>> {
        let token = self.authorize_xsts(xbl_token, RP_MINECRAFT).await?;
        result.xsts_token = token.clone();
        Ok(token)
    }

    /// XSTS token for `http://xboxlive.com`, which carries XUID and gamertag
    pub async fn acquire_xbox_live_xsts_token(
        &self,
        result: &mut AuthResult,
        xbl_token: &str,
    ) -> Result<Option<XstsToken>> {
        let token = self.authorize_xsts(xbl_token, RP_XBOXLIVE).await?;
        result.xbox_live_xsts_token = token.clone();
        Ok(token)
    }

    /// Authorize with XSTS for an arbitrary relying party without recording
    /// the token anywhere
    #[instrument(skip(self, xbl_token))]
    pub async fn authorize_xsts(
        &self,
        xbl_token: &str,
        relying_party: &str,
    ) -> Result<Option<XstsToken>> {
        self.phase.advance(Phase::AcquiringXstsToken);

        let body = XstsAuthRequest {
            properties: XstsAuthProperties {
                sandbox_id: "RETAIL".to_string(),
                user_tokens: vec![xbl_token.to_string()],
            },
            relying_party: relying_party.to_string(),
            token_type: "JWT".to_string(),
        };
        let request =
            ApiRequest::post_json(&self.config.endpoints.xsts_authorize, &body, ErrorShape::Xbox)?;

        self.call::<XstsToken>(request).await
    }

    /// Login to Minecraft with an XSTS token
    #[instrument(skip_all)]
    pub async fn acquire_minecraft_account(
        &self,
        result: &mut AuthResult,
        user_hash: &str,
        xsts_token: &str,
    ) -> Result<Option<MinecraftAccount>> {
        self.phase.advance(Phase::AcquiringMinecraftAccount);

        let body = McLoginRequest::new(user_hash, xsts_token);
        let request = ApiRequest::post_json(
            &self.config.endpoints.minecraft_login,
            &body,
            ErrorShape::Minecraft,
        )?;

        let account = self.call::<MinecraftAccount>(request).await?;
        result.minecraft_account = account.clone();
        Ok(account)
    }

    /// Fetch entitlements and make sure the account owns Minecraft Java
    /// Edition. The store is only recorded when the check passes.
    #[instrument(skip_all)]
    pub async fn acquire_minecraft_store(
        &self,
        result: &mut AuthResult,
        mc_access_token: &str,
    ) -> Result<Option<MinecraftStore>> {
        self.phase.advance(Phase::AcquiringMinecraftEntitlements);

        let request = ApiRequest::get(
            &self.config.endpoints.minecraft_store,
            mc_access_token,
            ErrorShape::Minecraft,
        );

        let store = self.call::<MinecraftStore>(request).await?;
        if let Some(store) = &store {
            if !store.owns(MINECRAFT_OWNERSHIP_ITEM) {
                return Err(AuthError::NotOwned);
            }
        }
        result.minecraft_store = store.clone();
        Ok(store)
    }

    /// Fetch the Minecraft profile
    #[instrument(skip_all)]
    pub async fn acquire_minecraft_profile(
        &self,
        result: &mut AuthResult,
        mc_access_token: &str,
    ) -> Result<Option<MinecraftProfile>> {
        self.phase.advance(Phase::AcquiringMinecraftProfile);

        let request = ApiRequest::get(
            &self.config.endpoints.minecraft_profile,
            mc_access_token,
            ErrorShape::Minecraft,
        );

        let profile = self.call::<MinecraftProfile>(request).await?;
        result.minecraft_profile = profile.clone();
        Ok(profile)
    }

    async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Option<T>> {
        match self.transport.send(request).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthClient")
            .field("config", &self.config)
            .field("phase", &self.phase.current())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::official;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AuthClient {
        AuthClient::new(AuthConfig::with_base_url(&server.uri())).unwrap()
    }

    #[test]
    fn test_authorize_url() {
        let client = AuthClient::new(AuthConfig::default()).unwrap();
        let url = client.build_authorize_url().unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert!(url
            .as_str()
            .starts_with("https://login.microsoftonline.com/consumers/oauth2/v2.0/authorize?"));
        assert_eq!(params["client_id"], official::CLIENT_ID);
        assert_eq!(params["redirect_uri"], official::REDIRECT_URI);
        assert_eq!(params["scope"], "service::user.auth.xboxlive.com::MBI_SSL");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["prompt"], "login");
    }

    #[tokio::test]
    async fn test_code_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth20_token.srf"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=M.C123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "bearer",
                "expires_in": 86400,
                "scope": "service::user.auth.xboxlive.com::MBI_SSL",
                "access_token": "ms_access",
                "refresh_token": "ms_refresh",
                "user_id": "abc"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut result = AuthResult::new();
        let account = client
            .acquire_microsoft_account(&mut result, "M.C123")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(account.access_token, "ms_access");
        assert_eq!(result.refresh_token(), Some("ms_refresh"));
        assert_eq!(client.phase().current(), Some(Phase::AcquiringMicrosoftAccount));
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth20_token.srf"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "The provided value for the 'refresh_token' is not valid.",
                "correlation_id": "c0ffee"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut result = AuthResult::new();
        let error = client
            .refresh_microsoft_account(&mut result, "stale")
            .await
            .unwrap_err();

        match error {
            AuthError::MicrosoftRefresh(e) => assert_eq!(e.correlation_id.as_deref(), Some("c0ffee")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(result.microsoft_account.is_none());
        assert_eq!(client.phase().current(), Some(Phase::RefreshingMicrosoftAccount));
    }

    #[tokio::test]
    async fn test_xbl_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/authenticate"))
            .and(header("X-Xbl-Contract-Version", "2"))
            .and(body_json(json!({
                "Properties": {
                    "AuthMethod": "RPS",
                    "SiteName": "user.auth.xboxlive.com",
                    "RpsTicket": "ms_access"
                },
                "RelyingParty": "http://auth.xboxlive.com",
                "TokenType": "JWT"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "IssueInstant": "2024-01-01T00:00:00Z",
                "NotAfter": "2024-01-15T00:00:00Z",
                "Token": "xbl",
                "DisplayClaims": {"xui": [{"uhs": "hash"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut result = AuthResult::new();
        let token = client
            .acquire_xbl_token(&mut result, "ms_access")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(token.token, "xbl");
        assert_eq!(result.xbl_token.unwrap().user_hash(), Some("hash"));
    }

    #[tokio::test]
    async fn test_xsts_relying_parties_fill_separate_slots() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xsts/authorize"))
            .and(body_string_contains("rp://api.minecraftservices.com/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Token": "xsts_mc",
                "DisplayClaims": {"xui": [{"uhs": "hash"}]}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/xsts/authorize"))
            .and(body_string_contains("http://xboxlive.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Token": "xsts_xbox",
                "DisplayClaims": {"xui": [{"uhs": "hash", "xid": "2535", "gtg": "Steve"}]}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut result = AuthResult::new();
        client.acquire_xsts_token(&mut result, "xbl").await.unwrap();
        client
            .acquire_xbox_live_xsts_token(&mut result, "xbl")
            .await
            .unwrap();

        assert_eq!(result.xsts_token.as_ref().unwrap().token, "xsts_mc");
        assert_eq!(result.xbox_live_xsts_token.as_ref().unwrap().token, "xsts_xbox");
        assert_eq!(result.gamertag(), Some("Steve"));
    }

    #[tokio::test]
    async fn test_xsts_denied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xsts/authorize"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "Identity": "0",
                "XErr": 2148916235u64,
                "Message": "",
                "Redirect": "https://www.xbox.com/en-US/Shell/Error"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut result = AuthResult::new();
        let error = client.acquire_xsts_token(&mut result, "xbl").await.unwrap_err();

        assert_eq!(
            error.message(),
            "The account is from a country where Xbox Live is not available/banned"
        );
        assert!(result.xsts_token.is_none());
    }

    #[tokio::test]
    async fn test_minecraft_login_identity_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/login_with_xbox"))
            .and(body_json(json!({"identityToken": "XBL3.0 x=hash;xsts"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "username": "0b7a1c-uuid",
                "roles": [],
                "access_token": "mc_token",
                "token_type": "Bearer",
                "expires_in": 86400
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut result = AuthResult::new();
        let account = client
            .acquire_minecraft_account(&mut result, "hash", "xsts")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(account.access_token, "mc_token");
        assert!(result.minecraft_account.is_some());
    }

    #[tokio::test]
    async fn test_store_without_game_is_not_owned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/entitlements/mcstore"))
            .and(header("Authorization", "Bearer mc_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [],
                "signature": "sig",
                "keyId": "1"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut result = AuthResult::new();
        let error = client
            .acquire_minecraft_store(&mut result, "mc_token")
            .await
            .unwrap_err();

        assert!(matches!(error, AuthError::NotOwned));
        assert!(result.minecraft_store.is_none());
    }

    #[tokio::test]
    async fn test_profile_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/minecraft/profile"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "path": "/minecraft/profile",
                "errorType": "NOT_FOUND",
                "error": "NOT_FOUND",
                "errorMessage": "The server has not found anything matching the request URI",
                "developerMessage": "The server has not found anything matching the request URI"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut result = AuthResult::new();
        let error = client
            .acquire_minecraft_profile(&mut result, "mc_token")
            .await
            .unwrap_err();

        assert_eq!(
            error.message(),
            "The server has not found anything matching the request URI"
        );
        assert_eq!(client.phase().current(), Some(Phase::AcquiringMinecraftProfile));
    }
}
