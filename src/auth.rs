use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::authz;
use crate::error::AuthError;
use crate::models::{Profile, SessionClaims};
use crate::storage::DataService;

pub const SESSION_COOKIE: &str = "vendor_desk.session";

/// Signing material for session tokens (and the short-lived OAuth state token).
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Configuration("session secret is empty".to_string()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        })
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Claims for a profile that passed the sign-in gate.
    pub fn claims_for(&self, profile: &Profile, email: &str) -> SessionClaims {
        let now = now_secs();
        SessionClaims {
            id: profile.id.clone(),
            email: email.to_string(),
            name: profile.name.clone(),
            image: profile.image.clone(),
            iat: now,
            exp: now.saturating_add(usize::try_from(self.ttl_secs).unwrap_or(usize::MAX)),
        }
    }

    pub fn issue(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        self.sign(claims)
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.verify(token)
    }

    pub(crate) fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        Ok(encode(&Header::default(), claims, &self.encoding)?)
    }

    pub(crate) fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        let token_data = decode::<T>(token, &self.decoding, &Validation::new(Algorithm::HS256))?;
        Ok(token_data.claims)
    }
}

pub(crate) fn now_secs() -> usize {
    Utc::now().timestamp().max(0) as usize
}

/// Reason a sign-in ended on the error page, passed as `?error=<kind>`.
///
/// The set is provider-defined and open: unknown kinds are carried as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthErrorKind {
    AccessDenied,
    Configuration,
    Verification,
    OAuthCallback,
    Other(String),
}

impl AuthErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            AuthErrorKind::AccessDenied => "AccessDenied",
            AuthErrorKind::Configuration => "Configuration",
            AuthErrorKind::Verification => "Verification",
            AuthErrorKind::OAuthCallback => "OAuthCallback",
            AuthErrorKind::Other(kind) => kind,
        }
    }

    pub fn parse(kind: &str) -> Self {
        match kind {
            "AccessDenied" => AuthErrorKind::AccessDenied,
            "Configuration" => AuthErrorKind::Configuration,
            "Verification" => AuthErrorKind::Verification,
            "OAuthCallback" => AuthErrorKind::OAuthCallback,
            other => AuthErrorKind::Other(other.to_string()),
        }
    }

    /// Location of the error page for this kind.
    pub fn error_page(&self) -> String {
        format!("/error?error={}", self.as_str())
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("sign-in rejected: {kind}")]
pub struct SignInError {
    pub kind: AuthErrorKind,
}

impl SignInError {
    pub fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }
}

/// Decides whether a provider identity may receive a session.
///
/// Returns the accepted email. A profile without an email is rejected
/// without consulting the allow-list.
pub async fn sign_in_gate(
    store: &dyn DataService,
    profile: &Profile,
) -> Result<String, SignInError> {
    let Some(email) = profile.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) else {
        tracing::info!(provider_id = %profile.id, "sign-in rejected: profile has no email");
        return Err(SignInError::new(AuthErrorKind::AccessDenied));
    };

    if !authz::is_authorized(store, email).await {
        tracing::info!(email, "sign-in rejected");
        return Err(SignInError::new(AuthErrorKind::AccessDenied));
    }

    tracing::info!(email, "sign-in accepted");
    Ok(email.to_string())
}
