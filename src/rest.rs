//! HTTP layer: router, sign-in flow and the JSON vendor API.
//!
//! Every route sits behind the route guard, which only acts on the
//! configured protected prefixes. HTML pages live in [`crate::views`].

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{sign_in_gate, AuthErrorKind, SessionKeys, SESSION_COOKIE};
use crate::error::ApiError;
use crate::guard::{
    clear_cookie, read_cookie, route_guard, set_cookie, ProtectedPaths, RouteGuard, ENTRY_PATH,
};
use crate::models::{SessionClaims, Vendor, VendorInput};
use crate::oauth::{
    verify_callback, CallbackParams, GoogleOAuth, OAuthStateClaims, OAUTH_STATE_COOKIE,
    STATE_TTL_SECS,
};
use crate::storage::DataService;
use crate::telemetry::request_tracing;
use crate::vendors;
use crate::views;

pub const SIGNED_IN_PATH: &str = "/dashboard";

/// Shared app state for handlers (Arc-wrapped for concurrency)
pub struct AppState {
    pub store: Arc<dyn DataService>,
    pub keys: SessionKeys,
    pub oauth: Option<Arc<GoogleOAuth>>,
    pub page_size: usize,
    pub secure_cookies: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// One page of the JSON vendor list.
#[derive(Serialize)]
pub struct VendorPage {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub vendors: Vec<Vendor>,
}

pub fn create_router(state: AppState, protected: ProtectedPaths) -> Router {
    let guard = RouteGuard::new(state.keys.clone(), protected);
    let state = Arc::new(state);

    let pages = Router::new()
        .route("/", get(views::entry_page))
        .route("/error", get(views::error_page))
        .route("/dashboard", get(views::dashboard))
        .route("/vendors", post(views::create_vendor))
        .route("/vendors/new", get(views::new_vendor_form))
        .route("/vendors/:id", get(views::show_vendor).post(views::update_vendor))
        .route("/vendors/:id/edit", get(views::edit_vendor_form))
        .route(
            "/vendors/:id/delete",
            get(views::confirm_delete).post(views::delete_vendor),
        );

    let api = Router::new()
        .route("/api/session", get(session_handler))
        .route("/api/vendors", get(list_vendors_handler).post(create_vendor_handler))
        .route(
            "/api/vendors/:id",
            get(get_vendor_handler)
                .put(update_vendor_handler)
                .delete(delete_vendor_handler),
        );

    Router::new()
        .route("/health", get(health_handler))
        .route("/auth/signin", get(signin_handler))
        .route("/auth/callback/google", get(callback_handler))
        .route("/auth/signout", post(signout_handler))
        .merge(pages)
        .merge(api)
        .layer(middleware::from_fn_with_state(guard, route_guard))
        .layer(middleware::from_fn(request_tracing))
        .with_state(state)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Redirect to the error page, dropping any half-finished OAuth state.
fn auth_failure(kind: AuthErrorKind) -> Response {
    tracing::info!(kind = %kind, "sign-in failed");
    (
        AppendHeaders([(header::SET_COOKIE, clear_cookie(OAUTH_STATE_COOKIE))]),
        Redirect::to(&kind.error_page()),
    )
        .into_response()
}

async fn signin_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(oauth) = state.oauth.as_ref() else {
        tracing::error!("google sign-in requested but no client credentials are configured");
        return auth_failure(AuthErrorKind::Configuration);
    };

    let (url, remembered) = oauth.authorize();
    let token = match state.keys.sign(&remembered) {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(error = %err, "failed to sign oauth state");
            return auth_failure(AuthErrorKind::Configuration);
        }
    };
    let cookie = set_cookie(
        OAUTH_STATE_COOKIE,
        &token,
        STATE_TTL_SECS as u64,
        state.secure_cookies,
    );
    (AppendHeaders([(header::SET_COOKIE, cookie)]), Redirect::to(&url)).into_response()
}

async fn callback_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Response {
    let remembered = read_cookie(&headers, OAUTH_STATE_COOKIE)
        .and_then(|token| state.keys.verify::<OAuthStateClaims>(&token).ok());
    let code = match verify_callback(&params, remembered.as_ref()) {
        Ok(code) => code,
        Err(kind) => return auth_failure(kind),
    };
    let Some(remembered) = remembered else {
        return auth_failure(AuthErrorKind::Verification);
    };
    let Some(oauth) = state.oauth.as_ref() else {
        return auth_failure(AuthErrorKind::Configuration);
    };

    let profile = match oauth.exchange_code(code, &remembered.verifier).await {
        Ok(profile) => profile,
        Err(err) => {
            tracing::warn!(error = %err, "oauth code exchange failed");
            return auth_failure(AuthErrorKind::OAuthCallback);
        }
    };

    let email = match sign_in_gate(state.store.as_ref(), &profile).await {
        Ok(email) => email,
        Err(rejected) => return auth_failure(rejected.kind),
    };

    let claims = state.keys.claims_for(&profile, &email);
    let token = match state.keys.issue(&claims) {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(error = %err, "failed to issue session token");
            return auth_failure(AuthErrorKind::Configuration);
        }
    };

    let session = set_cookie(SESSION_COOKIE, &token, state.keys.ttl_secs(), state.secure_cookies);
    (
        AppendHeaders([
            (header::SET_COOKIE, session),
            (header::SET_COOKIE, clear_cookie(OAUTH_STATE_COOKIE)),
        ]),
        Redirect::to(SIGNED_IN_PATH),
    )
        .into_response()
}

async fn signout_handler() -> impl IntoResponse {
    let cleared: HeaderValue = clear_cookie(SESSION_COOKIE);
    (AppendHeaders([(header::SET_COOKIE, cleared)]), Redirect::to(ENTRY_PATH))
}

async fn session_handler(Extension(claims): Extension<SessionClaims>) -> Json<SessionClaims> {
    Json(claims)
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
}

async fn list_vendors_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Json<VendorPage>, ApiError> {
    let view = vendors::load_page(state.store.as_ref(), params.page.unwrap_or(1), state.page_size)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to load vendors");
            ApiError::from_data(&err, views::LOAD_FAILED)
        })?;
    Ok(Json(VendorPage {
        page: view.info.page,
        page_size: view.info.page_size,
        total: view.info.total,
        total_pages: view.info.total_pages(),
        vendors: view.vendors,
    }))
}

async fn create_vendor_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Json(input): Json<VendorInput>,
) -> Result<(StatusCode, Json<Vendor>), ApiError> {
    let valid = vendors::validate(&input).map_err(ApiError::validation)?;
    let vendor = state.store.insert_vendor(valid).await.map_err(|err| {
        tracing::error!(error = %err, "failed to create vendor");
        ApiError::from_data(&err, views::CREATE_FAILED)
    })?;
    tracing::info!(vendor_id = %vendor.id, user = %claims.email, "vendor created");
    Ok((StatusCode::CREATED, Json(vendor)))
}

async fn get_vendor_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vendor>, ApiError> {
    let vendor = state.store.get_vendor(&id).await.map_err(|err| {
        tracing::warn!(vendor_id = %id, error = %err, "failed to load vendor");
        ApiError::from_data(&err, views::DETAIL_FAILED)
    })?;
    Ok(Json(vendor))
}

async fn update_vendor_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
    Json(input): Json<VendorInput>,
) -> Result<Json<Vendor>, ApiError> {
    let valid = vendors::validate(&input).map_err(ApiError::validation)?;
    let vendor = state.store.update_vendor(&id, valid).await.map_err(|err| {
        tracing::error!(vendor_id = %id, error = %err, "failed to update vendor");
        ApiError::from_data(&err, views::UPDATE_FAILED)
    })?;
    tracing::info!(vendor_id = %id, user = %claims.email, "vendor updated");
    Ok(Json(vendor))
}

async fn delete_vendor_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_vendor(&id).await.map_err(|err| {
        tracing::error!(vendor_id = %id, error = %err, "failed to delete vendor");
        ApiError::from_data(&err, views::DELETE_FAILED)
    })?;
    tracing::info!(vendor_id = %id, user = %claims.email, "vendor deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use crate::models::{AuthorizedUser, Profile};
    use crate::oauth::OAuthConfig;
    use crate::storage::tests::sample_input;
    use crate::storage::SledStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use httpmock::prelude::*;
    use oauth2::url::Url;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt; // For .oneshot()

    const SECRET: &[u8] = b"router-test-secret";

    fn keys() -> SessionKeys {
        SessionKeys::new(SECRET, 3600).unwrap()
    }

    fn protected() -> ProtectedPaths {
        ProtectedPaths::new(["/dashboard", "/vendors", "/api/vendors", "/api/session"])
    }

    fn app_with(
        store: Arc<dyn DataService>,
        oauth: Option<GoogleOAuth>,
        page_size: usize,
    ) -> Router {
        let state = AppState {
            store,
            keys: keys(),
            oauth: oauth.map(Arc::new),
            page_size,
            secure_cookies: false,
        };
        create_router(state, protected())
    }

    fn session_cookie() -> String {
        let profile = Profile {
            id: "g-1".to_string(),
            email: Some("alice@example.com".to_string()),
            name: Some("Alice".to_string()),
            image: None,
        };
        let keys = keys();
        let token = keys.issue(&keys.claims_for(&profile, "alice@example.com")).unwrap();
        format!("{SESSION_COOKIE}={token}")
    }

    fn request(method: &str, uri: &str, cookie: Option<&str>) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    fn form(uri: &str, cookie: &str, body: &str) -> Request<Body> {
        request("POST", uri, Some(cookie))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(resp: &Response) -> &str {
        resp.headers()[header::LOCATION].to_str().unwrap()
    }

    fn set_cookies(resp: &Response) -> Vec<String> {
        resp.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn temp_store() -> (tempfile::TempDir, Arc<SledStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open(dir.path().join("db")).unwrap();
        (dir, Arc::new(store))
    }

    /// Counts vendor calls on top of a real store.
    struct CountingStore {
        inner: SledStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DataService for CountingStore {
        async fn find_authorized_users(
            &self,
            email: &str,
        ) -> Result<Vec<AuthorizedUser>, DataError> {
            self.inner.find_authorized_users(email).await
        }
        async fn count_vendors(&self) -> Result<usize, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.count_vendors().await
        }
        async fn list_vendors(
            &self,
            offset: usize,
            limit: usize,
        ) -> Result<Vec<Vendor>, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list_vendors(offset, limit).await
        }
        async fn get_vendor(&self, id: &str) -> Result<Vendor, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_vendor(id).await
        }
        async fn insert_vendor(&self, input: VendorInput) -> Result<Vendor, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.insert_vendor(input).await
        }
        async fn update_vendor(&self, id: &str, input: VendorInput) -> Result<Vendor, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.update_vendor(id, input).await
        }
        async fn delete_vendor(&self, id: &str) -> Result<(), DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.delete_vendor(id).await
        }
    }

    /// Provider stub answering the token and userinfo calls for `email`.
    fn provider(server: &MockServer, email: &str) -> GoogleOAuth {
        server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "access_token": "at-1",
                    "token_type": "bearer",
                    "expires_in": 3600
                }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/userinfo");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "id": "g-42", "email": email, "name": "Test User" }));
        });
        let cfg = OAuthConfig::google("client-id", "client-secret", "http://localhost:3000")
            .unwrap()
            .with_endpoints(&server.url("/token"), &server.url("/userinfo"))
            .unwrap();
        GoogleOAuth::new(cfg).unwrap()
    }

    /// Runs `/auth/signin` then the callback the provider would send back.
    async fn sign_in(app: &Router) -> Response {
        let start = app
            .clone()
            .oneshot(request("GET", "/auth/signin", None).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(start.status(), StatusCode::SEE_OTHER);
        let provider_url = Url::parse(location(&start)).unwrap();
        let state = provider_url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        let state_cookie = set_cookies(&start)
            .into_iter()
            .find(|c| c.starts_with(OAUTH_STATE_COOKIE))
            .unwrap();
        let state_cookie = state_cookie.split(';').next().unwrap().to_string();

        let callback = format!("/auth/callback/google?code=auth-code&state={state}");
        app.clone()
            .oneshot(
                request("GET", &callback, Some(&state_cookie))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, store) = temp_store();
        let resp = app_with(store, None, 10)
            .oneshot(request("GET", "/health", None).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn allowed_user_gets_session_and_lands_on_dashboard() {
        let (_dir, store) = temp_store();
        store.allow_email("alice@example.com", None).unwrap();
        let server = MockServer::start();
        let app = app_with(store, Some(provider(&server, "alice@example.com")), 10);

        let resp = sign_in(&app).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/dashboard");
        let session = set_cookies(&resp)
            .into_iter()
            .find(|c| c.starts_with(SESSION_COOKIE))
            .unwrap();
        let session = session.split(';').next().unwrap().to_string();

        let dashboard = app
            .oneshot(request("GET", "/dashboard", Some(&session)).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(dashboard.status(), StatusCode::OK);
        assert!(body_text(dashboard).await.contains("No vendors found"));
    }

    #[tokio::test]
    async fn unlisted_user_is_sent_to_access_denied_without_session() {
        let (_dir, store) = temp_store();
        store.allow_email("alice@example.com", None).unwrap();
        let server = MockServer::start();
        let app = app_with(store, Some(provider(&server, "mallory@example.com")), 10);

        let resp = sign_in(&app).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/error?error=AccessDenied");
        assert!(!set_cookies(&resp).iter().any(|c| c.starts_with(SESSION_COOKIE)));

        let page = app
            .oneshot(request("GET", "/error?error=AccessDenied", None).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(body_text(page).await.contains(views::ACCESS_DENIED_MESSAGE));
    }

    #[tokio::test]
    async fn unreachable_allow_list_denies_sign_in() {
        let server = MockServer::start();
        let store = Arc::new(crate::authz::tests::FixedAllowList::unreachable());
        let app = app_with(store, Some(provider(&server, "alice@example.com")), 10);

        let resp = sign_in(&app).await;
        assert_eq!(location(&resp), "/error?error=AccessDenied");
    }

    #[tokio::test]
    async fn callback_without_state_cookie_is_a_verification_error() {
        let (_dir, store) = temp_store();
        let server = MockServer::start();
        let app = app_with(store, Some(provider(&server, "alice@example.com")), 10);

        let resp = app
            .oneshot(
                request("GET", "/auth/callback/google?code=c&state=s", None)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(location(&resp), "/error?error=Verification");
    }

    #[tokio::test]
    async fn signin_without_credentials_is_a_configuration_error() {
        let (_dir, store) = temp_store();
        let resp = app_with(store, None, 10)
            .oneshot(request("GET", "/auth/signin", None).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(location(&resp), "/error?error=Configuration");
    }

    #[tokio::test]
    async fn signout_clears_session_cookie() {
        let (_dir, store) = temp_store();
        let resp = app_with(store, None, 10)
            .oneshot(
                request("POST", "/auth/signout", Some(&session_cookie()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(location(&resp), "/");
        assert!(set_cookies(&resp)[0].contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn protected_pages_redirect_without_session() {
        let (_dir, store) = temp_store();
        let app = app_with(store, None, 10);
        for uri in ["/dashboard", "/vendors/new", "/api/vendors", "/api/session"] {
            let resp = app
                .clone()
                .oneshot(request("GET", uri, None).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(location(&resp), "/", "{uri}");
        }
    }

    fn counting_store() -> (tempfile::TempDir, Arc<CountingStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CountingStore {
            inner: SledStore::open(dir.path().join("db")).unwrap(),
            calls: AtomicUsize::new(0),
        });
        (dir, store)
    }

    #[tokio::test]
    async fn blank_vendor_name_never_reaches_the_store() {
        let (_dir, store) = counting_store();
        let app = app_with(store.clone(), None, 10);

        let body = "vendor_name=&bank_account_no=1&bank_name=B&address_line_1=A\
                    &city=C&country=US&zip_code=1";
        let resp = app.oneshot(form("/vendors", &session_cookie(), body)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(resp).await;
        assert!(html.contains("id=\"vendor_name-error\">This field is required"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_field_on_update_never_reaches_the_store() {
        let (_dir, store) = counting_store();
        let app = app_with(store.clone(), None, 10);
        let cookie = session_cookie();

        let body = "vendor_name=Acme&bank_account_no=1&bank_name=B&address_line_1=A\
                    &city=+++&country=US&zip_code=1";
        let resp = app
            .clone()
            .oneshot(form("/vendors/v-1", &cookie, body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(resp).await;
        assert!(html.contains("id=\"city-error\">This field is required"));
        assert!(html.contains("action=\"/vendors/v-1\""));

        let mut input = sample_input("Acme");
        input.zip_code = "  ".to_string();
        let resp = app
            .oneshot(
                request("PUT", "/api/vendors/v-1", Some(&cookie))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_string(&input).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body["fields"]["zip_code"], "This field is required");

        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_update_redirects_to_read_view() {
        let (_dir, store) = temp_store();
        let created = store.insert_vendor(sample_input("Acme")).await.unwrap();
        let app = app_with(store.clone(), None, 10);

        let body = "vendor_name=Acme+Holdings&bank_account_no=999&bank_name=First+Bank\
                    &address_line_1=2+Side+St&city=Springfield&country=US&zip_code=12345";
        let resp = app
            .oneshot(form(&format!("/vendors/{}", created.id), &session_cookie(), body))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), format!("/vendors/{}", created.id));
        let saved = store.get_vendor(&created.id).await.unwrap();
        assert_eq!(saved.vendor_name, "Acme Holdings");
        assert_eq!(saved.bank_account_no, "999");
        assert_eq!(saved.created_at, created.created_at);
    }

    #[tokio::test]
    async fn huge_page_number_lands_on_last_page() {
        let (_dir, store) = temp_store();
        for name in ["a", "b", "c"] {
            store.insert_vendor(sample_input(name)).await.unwrap();
        }
        let app = app_with(store, None, 2);
        let cookie = session_cookie();
        let max = usize::MAX;

        let resp = app
            .clone()
            .oneshot(
                request("GET", &format!("/dashboard?page={max}"), Some(&cookie))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Showing 3 to 3 of 3 vendors"));

        let resp = app
            .oneshot(
                request("GET", &format!("/api/vendors?page={max}"), Some(&cookie))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let page: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(page["page"], 2);
        assert_eq!(page["vendors"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_without_address_line_2_then_read() {
        let (_dir, store) = temp_store();
        let app = app_with(store.clone(), None, 10);
        let cookie = session_cookie();

        let body = "vendor_name=Acme&bank_account_no=123&bank_name=First+Bank\
                    &address_line_1=1+Main+St&address_line_2=\
                    &city=Springfield&country=US&zip_code=12345";
        let resp = app.clone().oneshot(form("/vendors", &cookie, body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/dashboard");

        let saved = store.list_vendors(0, 10).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].address_line_2, None);

        let page = app
            .oneshot(
                request("GET", &format!("/vendors/{}", saved[0].id), Some(&cookie))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(page.status(), StatusCode::OK);
        let html = body_text(page).await;
        assert!(html.contains("Acme"));
        assert!(!html.contains("address_line_2"));
    }

    #[tokio::test]
    async fn deleting_last_row_of_page_two_returns_to_page_one() {
        let (_dir, store) = temp_store();
        for name in ["a", "b", "c"] {
            store.insert_vendor(sample_input(name)).await.unwrap();
        }
        let oldest = store.list_vendors(2, 1).await.unwrap().remove(0);
        let app = app_with(store.clone(), None, 2);

        let resp = app
            .oneshot(form(
                &format!("/vendors/{}/delete", oldest.id),
                &session_cookie(),
                "page=2&rows_on_page=1",
            ))
            .await
            .unwrap();
        assert_eq!(location(&resp), "/dashboard?page=1");
        assert_eq!(store.count_vendors().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn failed_delete_keeps_page_and_flashes() {
        let (_dir, store) = temp_store();
        let app = app_with(store, None, 10);
        let cookie = session_cookie();

        let resp = app
            .clone()
            .oneshot(form("/vendors/missing/delete", &cookie, "page=3&rows_on_page=2"))
            .await
            .unwrap();
        assert_eq!(location(&resp), "/dashboard?page=3&flash=delete_failed");

        let page = app
            .oneshot(
                request("GET", "/dashboard?page=3&flash=delete_failed", Some(&cookie))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(body_text(page).await.contains(views::DELETE_FAILED));
    }

    #[tokio::test]
    async fn dashboard_load_failure_shows_flash() {
        let store = Arc::new(crate::authz::tests::FixedAllowList::with(&[]));
        let resp = app_with(store, None, 10)
            .oneshot(
                request("GET", "/dashboard", Some(&session_cookie()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert!(body_text(resp).await.contains(views::LOAD_FAILED));
    }

    #[tokio::test]
    async fn api_round_trip_with_bearer_token() {
        let (_dir, store) = temp_store();
        let app = app_with(store, None, 10);
        let cookie = session_cookie();
        let token = cookie.trim_start_matches(&format!("{SESSION_COOKIE}=")).to_string();
        let bearer = format!("Bearer {token}");

        let created = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/vendors")
                    .header(header::AUTHORIZATION, &bearer)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_string(&sample_input("Acme")).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let vendor: Vendor = serde_json::from_str(&body_text(created).await).unwrap();

        let listed = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/vendors?page=1")
                    .header(header::AUTHORIZATION, &bearer)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let page: Value = serde_json::from_str(&body_text(listed).await).unwrap();
        assert_eq!(page["total"], 1);
        assert_eq!(page["vendors"][0]["id"], vendor.id.as_str());

        let deleted = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/vendors/{}", vendor.id))
                    .header(header::AUTHORIZATION, &bearer)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let missing = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/vendors/{}", vendor.id))
                    .header(header::AUTHORIZATION, &bearer)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        let body: Value = serde_json::from_str(&body_text(missing).await).unwrap();
        assert_eq!(body["error"], views::DETAIL_FAILED);
    }

    #[tokio::test]
    async fn api_rejects_invalid_input_with_field_errors() {
        let (_dir, store) = temp_store();
        let resp = app_with(store, None, 10)
            .oneshot(
                request("POST", "/api/vendors", Some(&session_cookie()))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"vendor_name":"  "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body["fields"]["vendor_name"], "This field is required");
        assert_eq!(body["fields"].as_object().unwrap().len(), 7);
    }
}
