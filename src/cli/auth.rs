//! CLI command handlers for login, status, and logout.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::HttpAuthorizationServer;
use crate::config::DeviceAuthConfig;
use crate::flow::FlowState;
use crate::service::DeviceAuthService;
use crate::session::{FileSessionStore, SessionId, SessionState};
use crate::util::clock::SystemClock;

fn build_service(
    config_path: Option<&Path>,
) -> Result<DeviceAuthService, Box<dyn std::error::Error>> {
    let config = DeviceAuthConfig::load(config_path)?;
    Ok(DeviceAuthService::new(
        &config,
        Arc::new(HttpAuthorizationServer::from_config(&config)),
        Arc::new(FileSessionStore::new_default()),
        Arc::new(SystemClock),
    ))
}

/// Handle `devauth login`.
pub async fn handle_login(
    config_path: Option<&Path>,
    session: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = build_service(config_path)?;
    let session = SessionId::from(session);

    let view = service.initiate_flow(&session).await?;

    println!("🔗 Visit: {}", view.verification_uri);
    println!("📋 Enter code: {}", view.user_code);
    if let Some(complete) = &view.verification_uri_complete {
        println!("📱 Or open: {complete}");
    }
    println!("⏳ Code expires in {} seconds. Waiting for authorization...", view.expires_in);

    loop {
        tokio::time::sleep(Duration::from_secs(view.interval.max(1))).await;
        let poll = service.poll_flow(&view.device_code).await?;
        match poll.status {
            FlowState::Pending => continue,
            FlowState::Succeeded => {
                let name = match service.get_session(&session)? {
                    SessionState::Authenticated { profile, .. } => profile
                        .display_name()
                        .map(str::to_string)
                        .unwrap_or_else(|| "User".to_string()),
                    SessionState::Unauthenticated => "User".to_string(),
                };
                println!("✅ Welcome, {name}! Your device is now linked.");
                return Ok(());
            }
            other => {
                let message = poll.message.unwrap_or_else(|| other.to_string());
                eprintln!("❌ Authorization {other}: {message}. Please start over.");
                std::process::exit(1);
            }
        }
    }
}

/// Handle `devauth status`.
pub async fn handle_status(
    config_path: Option<&Path>,
    session: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = build_service(config_path)?;
    match service.get_session(&SessionId::from(session))? {
        SessionState::Authenticated { profile, .. } => {
            println!("✅ Signed in as {}", profile.display_name().unwrap_or("User"));
            println!("   {}", profile.email().unwrap_or("No email provided"));
        }
        SessionState::Unauthenticated => println!("❌ Not signed in"),
    }
    Ok(())
}

/// Handle `devauth logout`.
pub async fn handle_logout(
    config_path: Option<&Path>,
    session: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = build_service(config_path)?;
    let redirect = service.end_session(&SessionId::from(session))?;
    println!("✅ Signed out");
    if let Some(url) = redirect {
        println!("🔗 Finish signing out at: {url}");
    }
    Ok(())
}
