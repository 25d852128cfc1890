use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Microsoft OAuth token response (from both code and refresh_token grants)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MicrosoftAccount {
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Defaults to the moment of decoding when absent, as it is on the wire
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl MicrosoftAccount {
    /// Epoch second at which the access token stops being valid
    pub fn expires_at(&self) -> i64 {
        self.received_at.timestamp() + self.expires_in
    }
}

/// Token issued by the XBL user.authenticate and XSTS authorize endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct XboxToken {
    #[serde(default)]
    pub issue_instant: Option<String>,
    #[serde(default)]
    pub not_after: Option<String>,
    pub token: String,
    #[serde(default)]
    pub display_claims: XboxDisplayClaims,
}

pub type XblToken = XboxToken;
pub type XstsToken = XboxToken;

impl XboxToken {
    /// User hash of the first user entry in the claims
    pub fn user_hash(&self) -> Option<&str> {
        self.display_claims.xui.first().map(|info| info.uhs.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct XboxDisplayClaims {
    #[serde(default)]
    pub xui: Vec<XboxUserInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct XboxUserInfo {
    pub uhs: String,
    /// XUID, only present on tokens issued for `http://xboxlive.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xid: Option<String>,
    /// Gamertag, only present on tokens issued for `http://xboxlive.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gtg: Option<String>,
}

/// Xbox Live user.authenticate request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XblAuthRequest {
    pub properties: XblAuthProperties,
    pub relying_party: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XblAuthProperties {
    pub auth_method: String,
    pub site_name: String,
    pub rps_ticket: String,
}

/// XSTS authorize request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XstsAuthRequest {
    pub properties: XstsAuthProperties,
    pub relying_party: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XstsAuthProperties {
    pub sandbox_id: String,
    pub user_tokens: Vec<String>,
}

/// Minecraft login_with_xbox request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McLoginRequest {
    pub identity_token: String,
}

impl McLoginRequest {
    pub fn new(user_hash: &str, xsts_token: &str) -> Self {
        Self {
            identity_token: format!("XBL3.0 x={};{}", user_hash, xsts_token),
        }
    }
}

/// Minecraft login_with_xbox response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MinecraftAccount {
    pub username: String,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl MinecraftAccount {
    pub fn expires_at(&self) -> i64 {
        self.received_at.timestamp() + self.expires_in
    }
}

/// Entitlements of the logged in account
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MinecraftStore {
    #[serde(default)]
    pub items: Vec<StoreProduct>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub key_id: Option<String>,
}

impl MinecraftStore {
    pub fn owns(&self, product: &str) -> bool {
        self.items.iter().any(|item| item.name == product)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreProduct {
    pub name: String,
    #[serde(default)]
    pub signature: Option<String>,
}

/// Minecraft profile response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MinecraftProfile {
    /// UUID without dashes
    pub id: String,
    /// Player name
    pub name: String,
    #[serde(default)]
    pub skins: Vec<MinecraftSkin>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MinecraftSkin {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub texture_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xbox_token_user_hash() {
        let token: XboxToken = serde_json::from_str(
            r#"{
                "IssueInstant": "2024-01-01T00:00:00.0000000Z",
                "NotAfter": "2024-01-15T00:00:00.0000000Z",
                "Token": "xsts",
                "DisplayClaims": {"xui": [{"uhs": "1234"}, {"uhs": "5678"}]}
            }"#,
        )
        .unwrap();
        assert_eq!(token.user_hash(), Some("1234"));
        assert_eq!(token.not_after.as_deref(), Some("2024-01-15T00:00:00.0000000Z"));
    }

    #[test]
    fn test_xbox_token_without_claims() {
        let token: XboxToken =
            serde_json::from_str(r#"{"Token": "xsts", "DisplayClaims": {}}"#).unwrap();
        assert_eq!(token.user_hash(), None);
    }

    #[test]
    fn test_xbox_token_without_display_claims() {
        let token: XboxToken = serde_json::from_str(r#"{"Token": "xsts"}"#).unwrap();
        assert_eq!(token.user_hash(), None);
    }

    #[test]
    fn test_skin_with_missing_fields() {
        let profile: MinecraftProfile = serde_json::from_str(
            r#"{"id":"069a79f444e94726a5befca90e38aaf5","name":"Notch","skins":[{"id":"skin","state":null,"variant":"CLASSIC"}]}"#,
        )
        .unwrap();
        assert_eq!(profile.skins[0].state, None);
        assert_eq!(profile.skins[0].url, None);
    }

    #[test]
    fn test_identity_token_format() {
        let request = McLoginRequest::new("uhs", "xsts");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"identityToken": "XBL3.0 x=uhs;xsts"})
        );
    }

    #[test]
    fn test_store_ownership() {
        let store: MinecraftStore = serde_json::from_str(
            r#"{"items":[{"name":"product_minecraft","signature":"a"},{"name":"game_minecraft","signature":"b"}],"signature":"s","keyId":"1"}"#,
        )
        .unwrap();
        assert!(store.owns("game_minecraft"));
        assert!(!MinecraftStore::default().owns("game_minecraft"));
    }

    #[test]
    fn test_microsoft_account_expiry() {
        let account: MicrosoftAccount = serde_json::from_str(
            r#"{"token_type":"bearer","expires_in":86400,"scope":"service::user.auth.xboxlive.com::MBI_SSL","access_token":"at","refresh_token":"rt","user_id":"u"}"#,
        )
        .unwrap();
        assert_eq!(account.expires_at(), account.received_at.timestamp() + 86400);
        assert_eq!(account.refresh_token.as_deref(), Some("rt"));
    }
}
