use anyhow::Context;
use msa_auth::{AuthConfig, ConsoleCapture, MicrosoftAuthenticator};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let authenticator = MicrosoftAuthenticator::new(AuthConfig::default())
        .context("Failed to build the HTTP client")?;

    let mut phases = authenticator.subscribe_phase();
    tokio::spawn(async move {
        while phases.changed().await.is_ok() {
            if let Some(phase) = *phases.borrow_and_update() {
                info!("{}", phase);
            }
        }
    });

    let result = match authenticator.run_interactive(&ConsoleCapture).await {
        Ok(result) => result,
        Err(failure) => {
            error!(category = ?failure.error.category(), "Login failed: {}", failure.error.message());
            anyhow::bail!("{}", failure.error.message());
        }
    };

    match &result.minecraft_profile {
        Some(profile) => {
            println!("Logged in as {} ({})", profile.name, profile.id);
            if let Some(gamertag) = result.gamertag() {
                println!("Xbox gamertag: {}", gamertag);
            }
            if result.refresh_token().is_some() {
                println!("Store the refresh token securely to resume this session later");
            }
        }
        None => println!("Login ended before a Minecraft profile was obtained"),
    }

    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
