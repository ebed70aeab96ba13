//! Browser, login and resolver configuration.
//!
//! These types live here (always compiled) rather than behind
//! `#[cfg(feature = "browser")]` so that config parsing works without the
//! browser feature.

use serde::{Deserialize, Serialize};

/// Browser engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Navigation and wait timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,
}

fn default_headless() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            proxy: None,
            timeout: default_timeout(),
            chrome_args: Vec::new(),
            remote_url: None,
        }
    }
}

/// Login form description for the listing site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginConfig {
    /// Page holding the login form.
    #[serde(default)]
    pub url: Option<String>,
    /// Control that reveals the login form (clicked first when set).
    #[serde(default)]
    pub open_control: Option<String>,
    #[serde(default = "default_email_input")]
    pub email_input: String,
    #[serde(default = "default_password_input")]
    pub password_input: String,
    #[serde(default = "default_login_submit")]
    pub submit: String,
    /// Element that only exists once logged in.
    #[serde(default = "default_logged_in")]
    pub logged_in: String,
    /// How long to wait for `logged_in` after submitting.
    #[serde(default = "default_login_timeout")]
    pub timeout_secs: u64,
}

fn default_email_input() -> String {
    "input[name=\"username\"]".to_string()
}

fn default_password_input() -> String {
    "input[name=\"pass\"]".to_string()
}

fn default_login_submit() -> String {
    "#login_form [type=\"submit\"]".to_string()
}

fn default_logged_in() -> String {
    "a[href*=\"logout\"]".to_string()
}

fn default_login_timeout() -> u64 {
    30
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            url: None,
            open_control: None,
            email_input: default_email_input(),
            password_input: default_password_input(),
            submit: default_login_submit(),
            logged_in: default_logged_in(),
            timeout_secs: default_login_timeout(),
        }
    }
}

/// Link resolution service description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Submission page of the resolver service.
    #[serde(default)]
    pub url: Option<String>,
    /// Input receiving the source URL.
    #[serde(default = "default_resolver_input")]
    pub input: String,
    #[serde(default = "default_resolver_submit")]
    pub submit: String,
    /// Control that appears once the direct link is ready.
    #[serde(default = "default_resolver_ready")]
    pub ready: String,
    /// Attribute of `ready` holding the direct link.
    #[serde(default = "default_resolver_attribute")]
    pub attribute: String,
}

fn default_resolver_input() -> String {
    "input[name=\"url\"]".to_string()
}

fn default_resolver_submit() -> String {
    "button[type=\"submit\"]".to_string()
}

fn default_resolver_ready() -> String {
    "a.download-link".to_string()
}

fn default_resolver_attribute() -> String {
    "href".to_string()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            url: None,
            input: default_resolver_input(),
            submit: default_resolver_submit(),
            ready: default_resolver_ready(),
            attribute: default_resolver_attribute(),
        }
    }
}
