use serde::{Deserialize, Serialize};

use crate::models::{
    MicrosoftAccount, MinecraftAccount, MinecraftProfile, MinecraftStore, XblToken, XboxUserInfo,
    XstsToken,
};

/// Everything a pipeline run obtained, in pipeline order.
///
/// Every slot starts empty and each stage fills exactly one of them on
/// success. A failed run still hands this back, so check which slots are
/// populated before using them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResult {
    pub microsoft_account: Option<MicrosoftAccount>,
    pub xbl_token: Option<XblToken>,
    /// XSTS token for the Minecraft services relying party
    pub xsts_token: Option<XstsToken>,
    pub minecraft_account: Option<MinecraftAccount>,
    pub minecraft_store: Option<MinecraftStore>,
    /// XSTS token for `http://xboxlive.com`, carrying XUID and gamertag claims
    pub xbox_live_xsts_token: Option<XstsToken>,
    pub minecraft_profile: Option<MinecraftProfile>,
}

impl AuthResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the profile, the last artifact of the chain, is present
    pub fn is_complete(&self) -> bool {
        self.minecraft_profile.is_some()
    }

    /// Refresh token to persist for the next session, if Microsoft issued one
    pub fn refresh_token(&self) -> Option<&str> {
        self.microsoft_account
            .as_ref()
            .and_then(|account| account.refresh_token.as_deref())
    }

    pub fn xuid(&self) -> Option<&str> {
        self.xbox_live_claim(|info| info.xid.as_deref())
    }

    pub fn gamertag(&self) -> Option<&str> {
        self.xbox_live_claim(|info| info.gtg.as_deref())
    }

    fn xbox_live_claim<'a>(
        &'a self,
        pick: impl Fn(&'a XboxUserInfo) -> Option<&'a str>,
    ) -> Option<&'a str> {
        self.xbox_live_xsts_token
            .as_ref()?
            .display_claims
            .xui
            .first()
            .and_then(pick)
    }

    /// Drop every artifact downstream of the Microsoft account
    pub(crate) fn clear_downstream(&mut self) {
        self.xbl_token = None;
        self.xsts_token = None;
        self.minecraft_account = None;
        self.minecraft_store = None;
        self.xbox_live_xsts_token = None;
        self.minecraft_profile = None;
    }
}
