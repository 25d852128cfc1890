//! Microsoft account → Xbox Live → Minecraft services token exchange
//!
//! This crate turns either a one-time authorization code or a stored
//! Microsoft refresh token into a Minecraft access token and profile.
//!
//! # Authentication Flow
//!
//! 1. Microsoft token (authorization code exchange or refresh)
//! 2. Xbox Live (XBL) authentication
//! 3. XSTS authorization for `rp://api.minecraftservices.com/`
//! 4. Minecraft Services login
//! 5. Entitlement check (the account must own Minecraft Java Edition)
//! 6. XSTS authorization for `http://xboxlive.com` (XUID and gamertag)
//! 7. Profile retrieval
//!
//! Every artifact is collected into an [`AuthResult`]. When a stage fails the
//! run stops and the error comes back as an [`AuthFailure`] that still holds
//! everything obtained so far.
//!
//! # Example
//!
//! ```no_run
//! use msa_auth::{AuthConfig, ConsoleCapture, MicrosoftAuthenticator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let authenticator = MicrosoftAuthenticator::new(AuthConfig::official_desktop())?;
//!
//!     // Print the login URL and read the redirect back from stdin
//!     let result = authenticator.run_interactive(&ConsoleCapture).await?;
//!     if let Some(profile) = &result.minecraft_profile {
//!         println!("Logged in as: {}", profile.name);
//!     }
//!
//!     // Persist these yourself, then later resume the session
//!     let refresh_token = result.refresh_token().unwrap_or_default().to_string();
//!     let account = result.microsoft_account.as_ref().unwrap();
//!     let resumed = authenticator
//!         .run_from_stored_token(&refresh_token, &account.access_token, account.expires_at(), || false)
//!         .await?;
//!     if resumed.is_none() {
//!         println!("Tokens still valid");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Progress
//!
//! ```
//! use msa_auth::{AuthConfig, MicrosoftAuthenticator};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let authenticator = MicrosoftAuthenticator::new(AuthConfig::default())?;
//! let mut phases = authenticator.subscribe_phase();
//!
//! tokio::spawn(async move {
//!     while phases.changed().await.is_ok() {
//!         if let Some(phase) = *phases.borrow_and_update() {
//!             println!("{}", phase);
//!         }
//!     }
//! });
//! # Ok(())
//! # }
//! # tokio_test::block_on(example()).unwrap();
//! ```
//!
//! # Important Notes
//!
//! - Persisting the refresh token is up to the caller
//! - Tokens should never be logged
//! - The Minecraft access token expires after 24 hours

pub mod authenticator;
pub mod capture;
pub mod client;
pub mod config;
pub mod errors;
pub mod expiry;
pub mod models;
pub mod phase;
pub mod result;
pub mod transport;

// Re-export main types
pub use authenticator::MicrosoftAuthenticator;
pub use capture::{parse_redirect, ConsoleCapture, LoginCapture, LoginOutcome};
pub use client::AuthClient;
pub use config::{AuthConfig, Endpoints, HttpTimeouts, RetryPolicy};
pub use errors::{
    AuthError, AuthFailure, ErrorCategory, MicrosoftRefreshError, MinecraftError, Result, UrlError,
    XboxError, XboxErrorKind,
};
pub use expiry::{expired, to_expires_at};
pub use models::{
    MicrosoftAccount, MinecraftAccount, MinecraftProfile, MinecraftSkin, MinecraftStore,
    StoreProduct, XblToken, XboxToken, XstsToken,
};
pub use phase::{Phase, PhaseTracker};
pub use result::AuthResult;
pub use transport::{ApiRequest, ErrorShape, HttpTransport, Method, RequestBody, Transport};
