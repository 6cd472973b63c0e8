//! Allow-list authorization check.
//!
//! The lookup result is kept as a tagged [`AuthzOutcome`] so callers and tests
//! can tell "not on the list" from "could not ask the list". Both collapse to
//! `false` in [`is_authorized`]: the check fails closed.

use crate::storage::DataService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzOutcome {
    Authorized,
    Denied,
    LookupFailed,
}

impl AuthzOutcome {
    pub fn is_authorized(self) -> bool {
        matches!(self, AuthzOutcome::Authorized)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthzOutcome::Authorized => "authorized",
            AuthzOutcome::Denied => "denied",
            AuthzOutcome::LookupFailed => "lookup_failed",
        }
    }
}

/// Exact-match lookup of `email` in the allow-list. Only a single matching row authorizes.
pub async fn check_authorization(store: &dyn DataService, email: &str) -> AuthzOutcome {
    let outcome = match store.find_authorized_users(email).await {
        Ok(rows) if rows.len() == 1 => AuthzOutcome::Authorized,
        Ok(rows) => {
            if rows.len() > 1 {
                tracing::warn!(email, rows = rows.len(), "duplicate allow-list rows");
            }
            AuthzOutcome::Denied
        }
        Err(err) => {
            tracing::warn!(email, error = %err, "allow-list lookup failed");
            AuthzOutcome::LookupFailed
        }
    };
    tracing::info!(email, outcome = outcome.as_str(), "authorization check");
    outcome
}

pub async fn is_authorized(store: &dyn DataService, email: &str) -> bool {
    check_authorization(store, email).await.is_authorized()
}
