//! # Google OAuth 2.0 sign-in
//!
//! Authorization-code flow with PKCE using the `oauth2` crate.
//!
//! 1. [`GoogleOAuth::authorize`] builds the provider URL (scopes `openid`,
//!    `email`, `profile`) and returns the CSRF state and PKCE verifier as
//!    [`OAuthStateClaims`]. The caller signs them into the short-lived
//!    `vendor_desk.oauth` cookie, so nothing is stored server-side.
//! 2. On the callback, [`verify_callback`] checks the provider response
//!    against that cookie, and [`GoogleOAuth::exchange_code`] trades the code
//!    for an access token and fetches the userinfo profile.
//!
//! The resulting [`Profile`] then goes through the sign-in gate.

use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{now_secs, AuthErrorKind};
use crate::error::AuthError;
use crate::models::Profile;

pub const OAUTH_STATE_COOKIE: &str = "vendor_desk.oauth";
pub const CALLBACK_PATH: &str = "/auth/callback/google";
pub const STATE_TTL_SECS: usize = 10 * 60;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// CSRF state and PKCE verifier carried between `/auth/signin` and the callback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuthStateClaims {
    pub state: String,
    pub verifier: String,
    pub exp: usize,
}

/// Query string the provider sends back to the callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("profile fetch failed: {0}")]
    Profile(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub auth_url: AuthUrl,
    pub token_url: TokenUrl,
    pub redirect_url: RedirectUrl,
    pub userinfo_url: String,
}

impl OAuthConfig {
    /// Google endpoints; the redirect URI is derived from the public base URL.
    pub fn google(
        client_id: &str,
        client_secret: &str,
        public_url: &str,
    ) -> Result<Self, AuthError> {
        let redirect = format!("{}{}", public_url.trim_end_matches('/'), CALLBACK_PATH);
        Ok(Self {
            client_id: ClientId::new(client_id.to_string()),
            client_secret: ClientSecret::new(client_secret.to_string()),
            auth_url: AuthUrl::new(GOOGLE_AUTH_URL.to_string()).map_err(config_err)?,
            token_url: TokenUrl::new(GOOGLE_TOKEN_URL.to_string()).map_err(config_err)?,
            redirect_url: RedirectUrl::new(redirect).map_err(config_err)?,
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        })
    }

    /// Points the token and userinfo endpoints somewhere else (a local provider stub).
    pub fn with_endpoints(
        mut self,
        token_url: &str,
        userinfo_url: &str,
    ) -> Result<Self, AuthError> {
        self.token_url = TokenUrl::new(token_url.to_string()).map_err(config_err)?;
        self.userinfo_url = userinfo_url.to_string();
        Ok(self)
    }
}

fn config_err(err: impl std::fmt::Display) -> AuthError {
    AuthError::Configuration(err.to_string())
}

/// Google user info from API.
#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl From<GoogleUser> for Profile {
    fn from(user: GoogleUser) -> Self {
        Profile {
            id: user.id,
            email: user.email,
            name: user.name,
            image: user.picture,
        }
    }
}

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

pub struct GoogleOAuth {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(config: OAuthConfig) -> Result<Self, AuthError> {
        // Token endpoints must not be followed through redirects.
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(config_err)?;
        Ok(Self { config, http })
    }

    fn create_client(&self) -> ConfiguredClient {
        BasicClient::new(self.config.client_id.clone())
            .set_client_secret(self.config.client_secret.clone())
            .set_auth_uri(self.config.auth_url.clone())
            .set_token_uri(self.config.token_url.clone())
            .set_redirect_uri(self.config.redirect_url.clone())
    }

    /// Provider URL to redirect the browser to, plus the state to remember.
    pub fn authorize(&self) -> (String, OAuthStateClaims) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf_state) = self
            .create_client()
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        let claims = OAuthStateClaims {
            state: csrf_state.secret().clone(),
            verifier: pkce_verifier.secret().clone(),
            exp: now_secs() + STATE_TTL_SECS,
        };
        (auth_url.to_string(), claims)
    }

    /// Exchange the authorization code and fetch the user's profile.
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<Profile, OAuthError> {
        let token = self
            .create_client()
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(verifier.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| OAuthError::Exchange(e.to_string()))?;

        let user: GoogleUser = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(token.access_token().secret())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(user.into())
    }
}

/// Checks the callback against the remembered state and returns the authorization code.
pub fn verify_callback<'a>(
    params: &'a CallbackParams,
    remembered: Option<&OAuthStateClaims>,
) -> Result<&'a str, AuthErrorKind> {
    if let Some(error) = &params.error {
        tracing::info!(provider_error = %error, "provider returned an error to the callback");
        return Err(AuthErrorKind::OAuthCallback);
    }
    let (Some(code), Some(state), Some(remembered)) = (&params.code, &params.state, remembered)
    else {
        return Err(AuthErrorKind::Verification);
    };
    if state != &remembered.state {
        tracing::warn!("oauth state mismatch");
        return Err(AuthErrorKind::Verification);
    }
    Ok(code.as_str())
}
