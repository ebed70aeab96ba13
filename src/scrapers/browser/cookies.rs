//! Conversion between session cookies and CDP cookie types.

use chromiumoxide::cdp::browser_protocol::network::{Cookie, CookieParam, TimeSinceEpoch};
use tracing::warn;

use crate::models::{Session, SessionCookie};

/// Convert a cookie read from the browser. Session cookies carry no expiry.
pub(crate) fn from_cdp(cookie: &Cookie) -> SessionCookie {
    let expires = (!cookie.session && cookie.expires > 0.0).then_some(cookie.expires);
    SessionCookie {
        name: cookie.name.clone(),
        value: cookie.value.clone(),
        domain: cookie.domain.clone(),
        path: cookie.path.clone(),
        expires,
    }
}

/// Build the cookie parameters that seed a fresh browsing context.
pub(crate) fn to_cookie_params(session: &Session) -> Vec<CookieParam> {
    session
        .cookies
        .iter()
        .filter(|c| !c.name.is_empty() && !c.domain.is_empty())
        .filter_map(|c| {
            let mut builder = CookieParam::builder()
                .name(c.name.clone())
                .value(c.value.clone())
                .domain(c.domain.clone())
                .path(c.path.clone());
            if let Some(expires) = c.expires {
                builder = builder.expires(TimeSinceEpoch::new(expires));
            }
            match builder.build() {
                Ok(param) => Some(param),
                Err(e) => {
                    warn!("Failed to build cookie {}: {}", c.name, e);
                    None
                }
            }
        })
        .collect()
}
