#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use petsnap_api::{ApiClient, ClientSettings, VERSION};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = ClientSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    let client = ApiClient::from_settings(&settings)
        .map_err(|e| std::io::Error::other(format!("Failed to build API client: {e}")))?;

    print_startup_info(&settings);

    // Restore the stored session, if any, the way the app does before routing
    let restored = client.bootstrap().await;
    let state = client.session().snapshot();

    println!("✓ Session restored: {restored}");
    println!("  Authenticated: {}", state.is_authenticated());
    if let Some(user_id) = state.user_id() {
        println!("  User: {user_id}");
    }
    if let Some(email) = state.email() {
        println!("  Email: {email}");
    }
    if let Some(error) = state.last_error() {
        println!("  Last error: {error}");
    }
    Ok(())
}

fn print_startup_info(settings: &ClientSettings) {
    println!("🚀 petsnap-api {VERSION}");
    println!("📡 Endpoint: {}", settings.api.endpoint);
    println!("⏱️  Timeout: {}s", settings.api.timeout_seconds);
    println!("🔐 Credential storage: {:?}", settings.storage.backend);
}
