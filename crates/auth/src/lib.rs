//! # litsafe-auth
//!
//! Builds the identity gateway login URL and reads the Google identity token back out of the
//! redirect callback.
//!
//! The gateway performs the OAuth exchange and redirects the user agent to the application's
//! redirect URI with `provider=google&id_token=<jwt>` appended, either as the query string or as
//! the URL fragment.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

use litsafe_common::IdToken;
use std::borrow::Cow;
use url::Url;

mod error;
pub use error::RedirectError;

/// The public identity gateway.
pub const DEFAULT_LOGIN_GATEWAY: &str = "https://login.litgateway.com";

/// The only identity provider the callback is accepted from.
pub const GOOGLE_PROVIDER: &str = "google";

const PROVIDER_PARAM: &str = "provider";
const ID_TOKEN_PARAM: &str = "id_token";
const APP_REDIRECT_PARAM: &str = "app_redirect";

/// The identity gateway that runs the Google OAuth flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginGateway {
    base: Url,
}

impl LoginGateway {
    /// Creates a gateway rooted at `base`.
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// Returns the gateway base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Returns the URL that starts a Google login and redirects back to `redirect`.
    ///
    /// ```
    /// use litsafe_auth::LoginGateway;
    /// use url::Url;
    ///
    /// let gateway = LoginGateway::default();
    /// let redirect = Url::parse("http://localhost:3000").unwrap();
    /// assert_eq!(
    ///     gateway.login_url(&redirect).as_str(),
    ///     "https://login.litgateway.com/auth/google?app_redirect=http%3A%2F%2Flocalhost%3A3000%2F"
    /// );
    /// ```
    pub fn login_url(&self, redirect: &Url) -> Url {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map(|mut segments| {
                segments.pop_if_empty().push("auth").push(GOOGLE_PROVIDER);
            })
            .ok();
        url.set_query(None);
        url.query_pairs_mut().append_pair(APP_REDIRECT_PARAM, redirect.as_str());
        url
    }
}

impl Default for LoginGateway {
    fn default() -> Self {
        Self::new(Url::parse(DEFAULT_LOGIN_GATEWAY).expect("valid gateway url"))
    }
}

/// A successfully parsed redirect callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Callback {
    /// The Google identity token.
    pub id_token: IdToken,
    /// The callback URL with every query and fragment parameter removed.
    pub cleaned_url: Url,
}

/// Returns `true` if `current` is a login callback for `redirect` carrying a Google identity
/// token.
pub fn is_redirect_callback(redirect: &Url, current: &Url) -> bool {
    extract_token(redirect, current).is_ok()
}

/// Returns `true` if `current` is under `redirect` and carries any callback parameter, valid or
/// not. Such a location is a login attempt whose failure should be reported rather than
/// ignored.
pub fn has_callback_params(redirect: &Url, current: &Url) -> bool {
    let params = CallbackParams::from_url(current);
    is_under(redirect, current) && (params.provider.is_some() || params.id_token.is_some())
}

/// Extracts the identity token from the callback URL `current`.
///
/// The token is looked up in the query string first and in the fragment second.
pub fn extract_token(redirect: &Url, current: &Url) -> Result<Callback, RedirectError> {
    if !is_under(redirect, current) {
        return Err(RedirectError::UnexpectedLocation {
            expected: redirect.to_string(),
            actual: without_params(current).to_string(),
        });
    }

    let params = CallbackParams::from_url(current);
    match params.provider.as_deref() {
        Some(GOOGLE_PROVIDER) => {}
        Some(other) => return Err(RedirectError::UnsupportedProvider(other.to_string())),
        None => return Err(RedirectError::MissingParam(PROVIDER_PARAM)),
    }
    let id_token = match params.id_token {
        Some(token) if !token.is_empty() => IdToken::new(token),
        _ => return Err(RedirectError::MissingParam(ID_TOKEN_PARAM)),
    };

    let cleaned_url = without_params(current);
    debug!(url = %cleaned_url, "extracted identity token from redirect callback");
    Ok(Callback { id_token, cleaned_url })
}

/// Returns `true` if `current` has the origin of `redirect` and a path under its path.
fn is_under(redirect: &Url, current: &Url) -> bool {
    if redirect.origin() != current.origin() {
        return false;
    }
    let base = redirect.path().trim_end_matches('/');
    let path = current.path();
    path == base || path.strip_prefix(base).is_some_and(|rest| rest.starts_with('/'))
}

fn without_params(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url
}

#[derive(Default)]
struct CallbackParams {
    provider: Option<String>,
    id_token: Option<String>,
}

impl CallbackParams {
    fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        params.read(url.query_pairs());
        if let Some(fragment) = url.fragment() {
            params.read(url::form_urlencoded::parse(fragment.trim_start_matches('?').as_bytes()));
        }
        params
    }

    fn read<'a>(&mut self, pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) {
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                PROVIDER_PARAM => &mut self.provider,
                ID_TOKEN_PARAM => &mut self.id_token,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
    }
}
