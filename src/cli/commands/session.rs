//! Session commands.

use chrono::Utc;
use console::style;

use vidacquire::config::Settings;
use vidacquire::scrapers::BrowserFetcher;
use vidacquire::services::SessionStore;

use super::pipeline::obtain_session;

/// Log in unless a usable session is already saved.
pub async fn cmd_login(settings: &Settings, url: Option<String>) -> anyhow::Result<()> {
    let login_url = url
        .or_else(|| settings.login.url.clone())
        .ok_or_else(|| anyhow::anyhow!("No login page: set login.url in the config or pass a URL"))?;

    let mut fetcher = BrowserFetcher::new(
        settings.browser.clone(),
        settings.listing.clone(),
        settings.login.clone(),
    );
    let result = obtain_session(settings, &mut fetcher, &login_url).await;
    fetcher.close().await;

    let session = result?;
    println!(
        "{} Session with {} cookies in {}",
        style("✓").green(),
        session.cookies.len(),
        settings.session_file.display()
    );
    Ok(())
}

/// Show whether a session is saved and when it expires.
pub async fn cmd_session(settings: &Settings) -> anyhow::Result<()> {
    let store = SessionStore::new(&settings.session_file);

    let Some(session) = store.load().await? else {
        println!(
            "{} No session saved in {}",
            style("!").yellow(),
            store.path().display()
        );
        return Ok(());
    };

    println!("\n{}", style("Session").bold());
    println!("  File:     {}", store.path().display());
    println!("  Cookies:  {}", session.cookies.len());
    println!("  Captured: {}", session.captured_at.format("%Y-%m-%d %H:%M:%S UTC"));

    match session.expires_at() {
        Some(at) if session.is_expired(Utc::now()) => println!(
            "  Expires:  {} ({})",
            at.format("%Y-%m-%d %H:%M:%S UTC"),
            style("expired").red()
        ),
        Some(at) => println!("  Expires:  {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("  Expires:  {}", style("end of browser session").dim()),
    }

    if !settings.check_expiry {
        println!(
            "  {}",
            style("Expiry is not checked (session.check_expiry = false)").dim()
        );
    }
    Ok(())
}
