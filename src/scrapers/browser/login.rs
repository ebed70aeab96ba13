//! Login protocol: fill the site's login form and capture the cookie set.

use std::time::Duration;

use anyhow::{anyhow, Result};
use chromiumoxide::cdp::browser_protocol::network::GetCookiesParams;
use chromiumoxide::Page;
use tracing::{debug, info, warn};

use super::cookies::from_cdp;
use super::fetch::{navigate, prepare_page, wait_for_element, wait_for_page_ready};
use super::BrowserFetcher;
use crate::config::LoginConfig;
use crate::models::SessionCookie;
use crate::scrapers::LoginCredentials;

impl BrowserFetcher {
    /// Log in on a dedicated page and return the cookies it leaves behind.
    ///
    /// The page is closed on every exit path.
    pub(crate) async fn login(&mut self, credentials: &LoginCredentials) -> Result<Vec<SessionCookie>> {
        let browser = self.ensure_browser().await?;
        let page = browser.lock().await.new_page("about:blank").await?;
        let timeout = Duration::from_secs(self.config.timeout);

        let result = Self::login_inner(&page, &self.login, credentials, timeout).await;

        let _ = page.close().await;
        result
    }

    async fn login_inner(
        page: &Page,
        login: &LoginConfig,
        credentials: &LoginCredentials,
        timeout: Duration,
    ) -> Result<Vec<SessionCookie>> {
        prepare_page(page).await?;
        navigate(page, &credentials.login_url, timeout).await?;
        wait_for_page_ready(page, timeout).await;

        if let Some(ref open) = login.open_control {
            let control = wait_for_element(page, open, timeout)
                .await
                .ok_or_else(|| anyhow!("Login control '{}' not found", open))?;
            control.click().await?;
            debug!("Opened login form");
        }

        let email = wait_for_element(page, &login.email_input, timeout)
            .await
            .ok_or_else(|| anyhow!("Login input '{}' not found", login.email_input))?;
        email.click().await?.type_str(&credentials.email).await?;

        let password = page.find_element(&login.password_input).await?;
        password.click().await?.type_str(&credentials.password).await?;

        page.find_element(&login.submit).await?.click().await?;
        debug!("Submitted login form for {}", credentials.email);

        let confirm_timeout = Duration::from_secs(login.timeout_secs);
        if wait_for_element(page, &login.logged_in, confirm_timeout)
            .await
            .is_none()
        {
            return Err(anyhow!(
                "post-login control '{}' did not appear within {}s",
                login.logged_in,
                login.timeout_secs
            ));
        }

        let cookies = capture_cookies(page).await?;
        info!("Logged in, captured {} cookies", cookies.len());
        Ok(cookies)
    }
}

/// Read every cookie visible to the page's current URL.
async fn capture_cookies(page: &Page) -> Result<Vec<SessionCookie>> {
    let url = page.url().await?.unwrap_or_default();
    let params = GetCookiesParams::builder().urls(vec![url]).build();

    let browser_cookies = match page.execute(params).await {
        Ok(result) => result.result.cookies.clone(),
        Err(e) => {
            warn!(
                "Failed to get cookies via CDP: {}, trying page.get_cookies()",
                e
            );
            page.get_cookies().await.unwrap_or_default()
        }
    };

    debug!("Got {} cookies from browser", browser_cookies.len());
    Ok(browser_cookies.iter().map(from_cdp).collect())
}
