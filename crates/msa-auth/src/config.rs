use std::time::Duration;

/// Remote endpoints used by the pipeline
pub mod endpoints {
    pub const MS_AUTHORIZE: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/authorize";
    pub const MS_TOKEN: &str = "https://login.live.com/oauth20_token.srf";
    pub const XBL_AUTHENTICATE: &str = "https://user.auth.xboxlive.com/user/authenticate";
    pub const XSTS_AUTHORIZE: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
    pub const MC_LOGIN: &str = "https://api.minecraftservices.com/authentication/login_with_xbox";
    pub const MC_STORE: &str = "https://api.minecraftservices.com/entitlements/mcstore";
    pub const MC_PROFILE: &str = "https://api.minecraftservices.com/minecraft/profile";
}

/// Official Minecraft launcher OAuth configuration
pub mod official {
    pub const CLIENT_ID: &str = "00000000402B5328";
    pub const REDIRECT_URI: &str = "https://login.live.com/oauth20_desktop.srf";
    pub const SCOPE: &str = "service::user.auth.xboxlive.com::MBI_SSL";
}

/// Relying parties
pub const RP_XBL_AUTH: &str = "http://auth.xboxlive.com";
pub const RP_MINECRAFT: &str = "rp://api.minecraftservices.com/";
pub const RP_XBOXLIVE: &str = "http://xboxlive.com";

/// Entitlement name proving ownership of Minecraft Java Edition
pub const MINECRAFT_OWNERSHIP_ITEM: &str = "game_minecraft";

/// Endpoint set, overridable so the pipeline can be pointed at another host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize: String,
    pub token: String,
    pub xbl_authenticate: String,
    pub xsts_authorize: String,
    pub minecraft_login: String,
    pub minecraft_store: String,
    pub minecraft_profile: String,
}

impl Endpoints {
    /// Every endpoint rooted at `base`, keeping the real paths.
    ///
    /// Mostly useful for tests running against a local mock server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorize: format!("{base}/consumers/oauth2/v2.0/authorize"),
            token: format!("{base}/oauth20_token.srf"),
            xbl_authenticate: format!("{base}/user/authenticate"),
            xsts_authorize: format!("{base}/xsts/authorize"),
            minecraft_login: format!("{base}/authentication/login_with_xbox"),
            minecraft_store: format!("{base}/entitlements/mcstore"),
            minecraft_profile: format!("{base}/minecraft/profile"),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize: endpoints::MS_AUTHORIZE.to_string(),
            token: endpoints::MS_TOKEN.to_string(),
            xbl_authenticate: endpoints::XBL_AUTHENTICATE.to_string(),
            xsts_authorize: endpoints::XSTS_AUTHORIZE.to_string(),
            minecraft_login: endpoints::MC_LOGIN.to_string(),
            minecraft_store: endpoints::MC_STORE.to_string(),
            minecraft_profile: endpoints::MC_PROFILE.to_string(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            request: Duration::from_secs(30),
        }
    }
}

/// Retry policy for the stored-token entry point
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt, each preceded by a token refresh
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Configuration for the authenticator
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth redirect URI the login page navigates to once done
    pub redirect_uri: String,

    /// OAuth scope requested for the Microsoft token
    pub scope: String,

    pub endpoints: Endpoints,

    /// HTTP client timeouts
    pub http_timeouts: HttpTimeouts,

    /// Custom user agent (optional)
    pub user_agent: Option<String>,

    pub retry: RetryPolicy,
}

impl AuthConfig {
    /// Config for the official Minecraft launcher desktop flow
    pub fn official_desktop() -> Self {
        Self {
            client_id: official::CLIENT_ID.to_string(),
            redirect_uri: official::REDIRECT_URI.to_string(),
            scope: official::SCOPE.to_string(),
            endpoints: Endpoints::default(),
            http_timeouts: HttpTimeouts::default(),
            user_agent: Some("msa-authenticator".to_string()),
            retry: RetryPolicy::default(),
        }
    }

    /// Same flow with every endpoint rooted at `base`
    pub fn with_base_url(base: &str) -> Self {
        Self {
            endpoints: Endpoints::with_base(base),
            ..Self::official_desktop()
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::official_desktop()
    }
}
