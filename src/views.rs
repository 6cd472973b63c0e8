//! Server-rendered pages: entry, error, dashboard list, vendor form, read view
//! and delete confirmation.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form};
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::auth::AuthErrorKind;
use crate::error::DataError;
use crate::guard::session_from_headers;
use crate::models::{SessionClaims, Vendor, VendorInput};
use crate::rest::AppState;
use crate::vendors::{self, FieldErrors, ListView};

pub const LOAD_FAILED: &str = "Failed to load vendors. Please try again later.";
pub const CREATE_FAILED: &str = "Failed to create vendor. Please try again.";
pub const UPDATE_FAILED: &str = "Failed to update vendor. Please try again.";
pub const DELETE_FAILED: &str = "Failed to delete vendor. Please try again.";
pub const DETAIL_FAILED: &str = "Failed to load vendor details. Please try again later.";

pub const ACCESS_DENIED_MESSAGE: &str =
    "You are not authorized to access this application. Only pre-registered users can log in.";
pub const ACCESS_DENIED_HINT: &str =
    "Please contact the administrator if you believe you should have access.";
pub const GENERIC_AUTH_MESSAGE: &str =
    "An error occurred during authentication. Please try again later.";

const DELETE_FAILED_FLASH: &str = "delete_failed";

const STYLE: &str = "<style>\
body{font-family:sans-serif;margin:0;background:#f7f7f8;color:#1f2328}\
nav{display:flex;justify-content:space-between;align-items:center;padding:12px 24px;\
background:#fff;border-bottom:1px solid #ddd}\
nav img{width:28px;height:28px;border-radius:50%;vertical-align:middle}\
main{max-width:960px;margin:24px auto;padding:0 24px}\
table{width:100%;border-collapse:collapse;background:#fff}\
th,td{padding:8px;border-bottom:1px solid #eee;text-align:left}\
.flash{padding:12px;background:#fdecea;color:#8a1c1c;border-radius:4px}\
.field-error{color:#b42318;font-size:0.9em}\
.pager a,.pager span{margin-right:8px}\
</style>";

/// Minimal HTML escaping for text and attribute values.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, user: Option<&SessionClaims>, body: &str) -> Html<String> {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>{}</title>",
        escape(title)
    );
    html.push_str(STYLE);
    html.push_str("</head><body>");
    html.push_str(&navbar(user));
    html.push_str("<main>");
    html.push_str(body);
    html.push_str("</main></body></html>");
    Html(html)
}

fn navbar(user: Option<&SessionClaims>) -> String {
    let Some(user) = user else {
        return "<nav><a href=\"/\">Vendor Management</a></nav>".to_string();
    };
    let avatar = user
        .image
        .as_deref()
        .map(|src| format!("<img src=\"{}\" alt=\"\"> ", escape(src)))
        .unwrap_or_default();
    format!(
        "<nav><a href=\"/dashboard\">Vendor Management</a>\
         <div>{avatar}<span title=\"{email}\">{name}</span> \
         <form method=\"post\" action=\"/auth/signout\" style=\"display:inline\">\
         <button type=\"submit\">Sign out</button></form></div></nav>",
        email = escape(&user.email),
        name = escape(user.display_name()),
    )
}

fn flash_block(flash: Option<&str>) -> String {
    flash
        .map(|msg| format!("<p class=\"flash\" role=\"alert\">{}</p>", escape(msg)))
        .unwrap_or_default()
}

pub async fn entry_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Html<String> {
    let session = session_from_headers(&headers, &state.keys);
    render_entry(session.as_ref())
}

pub fn render_entry(session: Option<&SessionClaims>) -> Html<String> {
    let body = match session {
        Some(user) => format!(
            "<h1>Vendor Management System</h1><p>Signed in as {}.</p>\
             <p><a href=\"/dashboard\">Go to dashboard</a></p>",
            escape(user.display_name())
        ),
        None => "<h1>Vendor Management System</h1>\
                 <p>Sign in with your Google account to manage vendors.</p>\
                 <p><a href=\"/auth/signin\">Sign in with Google</a></p>"
            .to_string(),
    };
    layout("Vendor Management System", session, &body)
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorQuery {
    pub error: Option<String>,
}

pub async fn error_page(Query(query): Query<ErrorQuery>) -> Html<String> {
    let kind = query.error.as_deref().map(AuthErrorKind::parse);
    render_error(kind.as_ref())
}

/// Message lines for an error kind. Anything but `AccessDenied`, including
/// kinds this build has never heard of, gets the generic message.
pub fn error_messages(kind: Option<&AuthErrorKind>) -> (&'static str, Option<&'static str>) {
    match kind {
        Some(AuthErrorKind::AccessDenied) => (ACCESS_DENIED_MESSAGE, Some(ACCESS_DENIED_HINT)),
        _ => (GENERIC_AUTH_MESSAGE, None),
    }
}

pub fn render_error(kind: Option<&AuthErrorKind>) -> Html<String> {
    let (message, hint) = error_messages(kind);
    let mut body = format!("<h1>Authentication Error</h1><p>{}</p>", escape(message));
    if let Some(hint) = hint {
        let _ = write!(body, "<p>{}</p>", escape(hint));
    }
    body.push_str("<p><a href=\"/\">Return to Home</a></p>");
    layout("Authentication Error", None, &body)
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub page: Option<usize>,
    pub flash: Option<String>,
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let page = query.page.unwrap_or(1);
    let flash = match query.flash.as_deref() {
        Some(DELETE_FAILED_FLASH) => Some(DELETE_FAILED),
        _ => None,
    };
    match vendors::load_page(state.store.as_ref(), page, state.page_size).await {
        Ok(view) => render_dashboard(&claims, Some(&view), flash).into_response(),
        Err(err) => {
            tracing::error!(error = %err, page, "failed to load vendors");
            let page = render_dashboard(&claims, None, Some(LOAD_FAILED));
            (StatusCode::BAD_GATEWAY, page).into_response()
        }
    }
}

pub fn render_dashboard(
    user: &SessionClaims,
    view: Option<&ListView>,
    flash: Option<&str>,
) -> Html<String> {
    let mut body = String::from(
        "<h1>Vendors</h1><p><a href=\"/vendors/new\">Add Vendor</a></p>",
    );
    body.push_str(&flash_block(flash));

    if let Some(view) = view {
        if view.is_empty_state() {
            body.push_str(
                "<div class=\"empty\"><p>No vendors found.</p>\
                 <p><a href=\"/vendors/new\">Add your first vendor</a></p></div>",
            );
        } else {
            body.push_str(&vendor_table(view));
            body.push_str(&pager(view));
        }
    }
    layout("Vendors", Some(user), &body)
}

fn vendor_table(view: &ListView) -> String {
    if view.vendors.is_empty() {
        return "<p>No vendors on this page.</p>".to_string();
    }
    let rows_on_page = view.vendors.len();
    let mut table = String::from(
        "<table><thead><tr><th>Vendor Name</th><th>Bank Account No.</th><th>Bank Name</th>\
         <th>City</th><th>Country</th><th>Actions</th></tr></thead><tbody>",
    );
    for v in &view.vendors {
        let id = escape(&v.id);
        let _ = write!(
            table,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td><a href=\"/vendors/{id}\">View</a> <a href=\"/vendors/{id}/edit\">Edit</a> \
             <a href=\"/vendors/{id}/delete?page={page}&amp;rows={rows_on_page}\">Delete</a>\
             </td></tr>",
            escape(&v.vendor_name),
            escape(&v.bank_account_no),
            escape(&v.bank_name),
            escape(&v.city),
            escape(&v.country),
            page = view.info.page,
        );
    }
    table.push_str("</tbody></table>");
    table
}

fn pager(view: &ListView) -> String {
    let info = &view.info;
    let mut html = format!(
        "<div class=\"pager\"><p>Showing {} to {} of {} vendors</p>",
        info.showing_from(view.vendors.len()),
        info.showing_to(),
        info.total
    );
    if info.total_pages() > 1 {
        if info.has_previous() {
            let _ = write!(html, "<a href=\"/dashboard?page={}\">Previous</a>", info.page - 1);
        }
        for n in info.page_window() {
            if n == info.page {
                let _ = write!(html, "<span aria-current=\"page\">{n}</span>");
            } else {
                let _ = write!(html, "<a href=\"/dashboard?page={n}\">{n}</a>");
            }
        }
        if info.has_next() {
            let _ = write!(html, "<a href=\"/dashboard?page={}\">Next</a>", info.page + 1);
        }
    }
    html.push_str("</div>");
    html
}

/// Which form is being shown: a new vendor or an edit of an existing one.
#[derive(Debug, Clone, PartialEq)]
pub enum FormMode {
    Create,
    Edit { id: String },
}

const FORM_FIELDS: [(&str, &str); 8] = [
    ("vendor_name", "Vendor Name"),
    ("bank_account_no", "Bank Account No."),
    ("bank_name", "Bank Name"),
    ("address_line_1", "Address Line 1"),
    ("address_line_2", "Address Line 2 (optional)"),
    ("city", "City"),
    ("country", "Country"),
    ("zip_code", "Zip Code"),
];

fn field_value<'a>(input: &'a VendorInput, field: &str) -> &'a str {
    match field {
        "vendor_name" => &input.vendor_name,
        "bank_account_no" => &input.bank_account_no,
        "bank_name" => &input.bank_name,
        "address_line_1" => &input.address_line_1,
        "address_line_2" => input.address_line_2.as_deref().unwrap_or(""),
        "city" => &input.city,
        "country" => &input.country,
        "zip_code" => &input.zip_code,
        _ => "",
    }
}

pub fn render_form(
    user: &SessionClaims,
    mode: &FormMode,
    input: &VendorInput,
    errors: &FieldErrors,
    flash: Option<&str>,
) -> Html<String> {
    let (title, action, submit, cancel) = match mode {
        FormMode::Create => (
            "Add Vendor",
            "/vendors".to_string(),
            "Create Vendor",
            "/dashboard".to_string(),
        ),
        FormMode::Edit { id } => {
            let id = escape(id);
            let target = format!("/vendors/{id}");
            ("Edit Vendor", target.clone(), "Update Vendor", target)
        }
    };

    let mut body = format!("<h1>{title}</h1>");
    body.push_str(&flash_block(flash));
    let _ = write!(body, "<form method=\"post\" action=\"{action}\">");
    for (field, label) in FORM_FIELDS {
        let _ = write!(
            body,
            "<p><label for=\"{field}\">{label}</label><br>\
             <input id=\"{field}\" name=\"{field}\" value=\"{}\"></p>",
            escape(field_value(input, field))
        );
        if let Some(message) = errors.get(field) {
            let _ = write!(body, "<p class=\"field-error\" id=\"{field}-error\">{message}</p>");
        }
    }
    let _ = write!(
        body,
        "<p><button type=\"submit\">{submit}</button> <a href=\"{cancel}\">Cancel</a></p></form>"
    );
    layout(title, Some(user), &body)
}

pub async fn new_vendor_form(Extension(claims): Extension<SessionClaims>) -> Html<String> {
    render_form(&claims, &FormMode::Create, &VendorInput::default(), &FieldErrors::new(), None)
}

pub async fn create_vendor(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Form(input): Form<VendorInput>,
) -> Response {
    let valid = match vendors::validate(&input) {
        Ok(valid) => valid,
        Err(errors) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                render_form(&claims, &FormMode::Create, &input, &errors, None),
            )
                .into_response()
        }
    };

    match state.store.insert_vendor(valid).await {
        Ok(vendor) => {
            tracing::info!(vendor_id = %vendor.id, user = %claims.email, "vendor created");
            Redirect::to("/dashboard").into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to create vendor");
            (
                StatusCode::BAD_GATEWAY,
                render_form(
                    &claims,
                    &FormMode::Create,
                    &input,
                    &FieldErrors::new(),
                    Some(CREATE_FAILED),
                ),
            )
                .into_response()
        }
    }
}

fn detail_failure(user: &SessionClaims, id: &str, err: &DataError) -> Response {
    tracing::error!(vendor_id = id, error = %err, "failed to load vendor");
    let status = match err {
        DataError::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    };
    let body = format!(
        "<h1>Vendor</h1>{}<p><a href=\"/dashboard\">Back to vendors</a></p>",
        flash_block(Some(DETAIL_FAILED))
    );
    (status, layout("Vendor", Some(user), &body)).into_response()
}

pub async fn show_vendor(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get_vendor(&id).await {
        Ok(vendor) => render_vendor(&claims, &vendor).into_response(),
        Err(err) => detail_failure(&claims, &id, &err),
    }
}

pub fn render_vendor(user: &SessionClaims, vendor: &Vendor) -> Html<String> {
    let id = escape(&vendor.id);
    let mut body = format!(
        "<h1>{}</h1><dl>\
         <dt>Bank Account No.</dt><dd>{}</dd>\
         <dt>Bank Name</dt><dd>{}</dd>\
         <dt>Address</dt><dd id=\"address_line_1\">{}</dd>",
        escape(&vendor.vendor_name),
        escape(&vendor.bank_account_no),
        escape(&vendor.bank_name),
        escape(&vendor.address_line_1),
    );
    if let Some(line_2) = vendor.address_line_2.as_deref().filter(|l| !l.is_empty()) {
        let _ = write!(body, "<dd id=\"address_line_2\">{}</dd>", escape(line_2));
    }
    let _ = write!(
        body,
        "<dd>{}, {} {}</dd><dt>Created</dt><dd>{}</dd></dl>\
         <p><a href=\"/vendors/{id}/edit\">Edit</a> <a href=\"/vendors/{id}/delete\">Delete</a> \
         <a href=\"/dashboard\">Back to vendors</a></p>",
        escape(&vendor.city),
        escape(&vendor.country),
        escape(&vendor.zip_code),
        vendor.created_at.format("%Y-%m-%d %H:%M UTC"),
    );
    layout(&vendor.vendor_name, Some(user), &body)
}

pub async fn edit_vendor_form(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
) -> Response {
    let loaded = state.store.get_vendor(&id).await;
    match loaded {
        Ok(vendor) => render_form(
            &claims,
            &FormMode::Edit { id },
            &VendorInput::from(&vendor),
            &FieldErrors::new(),
            None,
        )
        .into_response(),
        Err(err) => detail_failure(&claims, &id, &err),
    }
}

pub async fn update_vendor(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
    Form(input): Form<VendorInput>,
) -> Response {
    let mode = FormMode::Edit { id: id.clone() };
    let valid = match vendors::validate(&input) {
        Ok(valid) => valid,
        Err(errors) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                render_form(&claims, &mode, &input, &errors, None),
            )
                .into_response()
        }
    };

    match state.store.update_vendor(&id, valid).await {
        Ok(_) => {
            tracing::info!(vendor_id = %id, user = %claims.email, "vendor updated");
            Redirect::to(&format!("/vendors/{id}")).into_response()
        }
        Err(err) => {
            tracing::error!(vendor_id = %id, error = %err, "failed to update vendor");
            (
                StatusCode::BAD_GATEWAY,
                render_form(&claims, &mode, &input, &FieldErrors::new(), Some(UPDATE_FAILED)),
            )
                .into_response()
        }
    }
}

/// Where the delete was started from: the list page and how many rows it held.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    pub page: Option<usize>,
    pub rows: Option<usize>,
}

pub async fn confirm_delete(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
    Query(origin): Query<DeleteQuery>,
) -> Response {
    match state.store.get_vendor(&id).await {
        Ok(vendor) => render_confirm_delete(
            &claims,
            &vendor,
            origin.page.unwrap_or(1),
            origin.rows.unwrap_or(0),
        )
        .into_response(),
        Err(err) => detail_failure(&claims, &id, &err),
    }
}

pub fn render_confirm_delete(
    user: &SessionClaims,
    vendor: &Vendor,
    page: usize,
    rows_on_page: usize,
) -> Html<String> {
    let id = escape(&vendor.id);
    let body = format!(
        "<h1>Delete Vendor</h1>\
         <p>Are you sure you want to delete <strong>{name}</strong>? \
         This action cannot be undone.</p>\
         <form method=\"post\" action=\"/vendors/{id}/delete\">\
         <input type=\"hidden\" name=\"page\" value=\"{page}\">\
         <input type=\"hidden\" name=\"rows_on_page\" value=\"{rows_on_page}\">\
         <button type=\"submit\">Delete</button> \
         <a href=\"/dashboard?page={page}\">Cancel</a></form>",
        name = escape(&vendor.vendor_name),
    );
    layout("Delete Vendor", Some(user), &body)
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteForm {
    pub page: Option<usize>,
    pub rows_on_page: Option<usize>,
}

pub async fn delete_vendor(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
    Path(id): Path<String>,
    Form(form): Form<DeleteForm>,
) -> Redirect {
    let page = form.page.unwrap_or(1).max(1);
    match state.store.delete_vendor(&id).await {
        Ok(()) => {
            tracing::info!(vendor_id = %id, user = %claims.email, "vendor deleted");
            let next = vendors::page_after_delete(page, form.rows_on_page.unwrap_or(0));
            Redirect::to(&format!("/dashboard?page={next}"))
        }
        Err(err) => {
            tracing::error!(vendor_id = %id, error = %err, "failed to delete vendor");
            Redirect::to(&format!("/dashboard?page={page}&flash={DELETE_FAILED_FLASH}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::sample_input;
    use crate::vendors::PageInfo;
    use chrono::Utc;

    fn user() -> SessionClaims {
        SessionClaims {
            id: "g-1".to_string(),
            email: "alice@example.com".to_string(),
            name: Some("Alice".to_string()),
            image: Some("https://example.com/a.png".to_string()),
            iat: 0,
            exp: 0,
        }
    }

    fn vendor(name: &str) -> Vendor {
        sample_input(name).into_vendor(format!("id-{name}"), Utc::now())
    }

    #[test]
    fn escape_neutralises_markup() {
        assert_eq!(
            escape("<script>\"x\" & 'y'</script>"),
            "&lt;script&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn access_denied_gets_specific_message() {
        let Html(page) = render_error(Some(&AuthErrorKind::AccessDenied));
        assert!(page.contains(ACCESS_DENIED_MESSAGE));
        assert!(page.contains(ACCESS_DENIED_HINT));
    }

    #[test]
    fn unknown_or_missing_kinds_get_generic_message() {
        for kind in [
            None,
            Some(AuthErrorKind::Verification),
            Some(AuthErrorKind::parse("SomethingNew")),
        ] {
            let Html(page) = render_error(kind.as_ref());
            assert!(page.contains(GENERIC_AUTH_MESSAGE));
            assert!(!page.contains(ACCESS_DENIED_MESSAGE));
        }
    }

    #[test]
    fn entry_page_offers_sign_in_or_dashboard() {
        let Html(anon) = render_entry(None);
        assert!(anon.contains("/auth/signin"));
        let Html(signed_in) = render_entry(Some(&user()));
        assert!(signed_in.contains("/dashboard"));
        assert!(signed_in.contains("Sign out"));
    }

    #[test]
    fn empty_dashboard_shows_empty_state() {
        let view = ListView::new(PageInfo::new(1, 10, 0), vec![]);
        let Html(page) = render_dashboard(&user(), Some(&view), None);
        assert!(page.contains("No vendors found"));
        assert!(!page.contains("<table>"));
    }

    #[test]
    fn dashboard_lists_rows_with_pager() {
        let view = ListView::new(PageInfo::new(2, 2, 5), vec![vendor("Acme"), vendor("Globex")]);
        let Html(page) = render_dashboard(&user(), Some(&view), None);
        assert!(page.contains("Showing 3 to 4 of 5 vendors"));
        assert!(page.contains("/vendors/id-Acme/delete?page=2&amp;rows=2"));
        assert!(page.contains("/dashboard?page=1\">Previous"));
        assert!(page.contains("/dashboard?page=3\">Next"));
    }

    #[test]
    fn load_failure_shows_flash_without_table() {
        let Html(page) = render_dashboard(&user(), None, Some(LOAD_FAILED));
        assert!(page.contains(LOAD_FAILED));
        assert!(!page.contains("No vendors found"));
    }

    #[test]
    fn form_shows_field_errors_and_keeps_input() {
        let mut input = sample_input("Acme <b>");
        input.city = String::new();
        let errors = vendors::validate(&input).unwrap_err();
        let Html(page) = render_form(&user(), &FormMode::Create, &input, &errors, None);
        assert!(page.contains("id=\"city-error\">This field is required"));
        assert!(!page.contains("vendor_name-error"));
        assert!(page.contains("value=\"Acme &lt;b&gt;\""));
    }

    #[test]
    fn read_view_omits_missing_address_line_2() {
        let Html(without) = render_vendor(&user(), &vendor("Acme"));
        assert!(!without.contains("address_line_2"));

        let mut with = vendor("Acme");
        with.address_line_2 = Some("Suite 4".to_string());
        let Html(page) = render_vendor(&user(), &with);
        assert!(page.contains("Suite 4"));
    }

    #[test]
    fn confirm_delete_carries_origin_page() {
        let Html(page) = render_confirm_delete(&user(), &vendor("Acme"), 3, 1);
        assert!(page.contains("name=\"page\" value=\"3\""));
        assert!(page.contains("name=\"rows_on_page\" value=\"1\""));
    }
}
