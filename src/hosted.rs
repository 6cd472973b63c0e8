//! Hosted data service client (PostgREST-style table API over HTTPS).
//!
//! Every operation is one request against `{base}/rest/v1/{table}`,
//! authenticated with the service key in both `apikey` and bearer headers.

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::DataError;
use crate::models::{AuthorizedUser, Vendor, VendorInput};
use crate::storage::DataService;

const AUTHORIZED_USERS: &str = "authorized_users";
const VENDORS: &str = "vendors";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Clone)]
pub struct HostedStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HostedStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, DataError> {
        let client = Client::builder()
            .user_agent(concat!("vendor_desk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn rows<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Vec<T>, DataError> {
        let resp = check(req.send().await?).await?;
        Ok(resp.json().await?)
    }
}

async fn check(resp: Response) -> Result<Response, DataError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(DataError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Total from a `Content-Range` header such as `0-9/42` or `*/0`.
fn parse_content_range_total(value: &str) -> Option<usize> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl DataService for HostedStore {
    async fn find_authorized_users(&self, email: &str) -> Result<Vec<AuthorizedUser>, DataError> {
        let req = self
            .request(Method::GET, AUTHORIZED_USERS)
            .query(&[("select", "*".to_string()), ("email", eq(email))]);
        self.rows(req).await
    }

    async fn count_vendors(&self) -> Result<usize, DataError> {
        let resp = self
            .request(Method::HEAD, VENDORS)
            .query(&[("select", "*")])
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let resp = check(resp).await?;
        let range = resp
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| DataError::Decode("missing Content-Range header".to_string()))?;
        parse_content_range_total(range)
            .ok_or_else(|| DataError::Decode(format!("unparseable Content-Range: {range}")))
    }

    async fn list_vendors(&self, offset: usize, limit: usize) -> Result<Vec<Vendor>, DataError> {
        let req = self.request(Method::GET, VENDORS).query(&[
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
        ]);
        self.rows(req).await
    }

    async fn get_vendor(&self, id: &str) -> Result<Vendor, DataError> {
        let resp = self
            .request(Method::GET, VENDORS)
            .query(&[("select", "*".to_string()), ("id", eq(id))])
            .header(header::ACCEPT, SINGLE_OBJECT)
            .send()
            .await?;
        // The single-object media type answers 406 unless exactly one row matched.
        if resp.status() == StatusCode::NOT_ACCEPTABLE {
            return Err(DataError::NotFound);
        }
        Ok(check(resp).await?.json().await?)
    }

    async fn insert_vendor(&self, input: VendorInput) -> Result<Vendor, DataError> {
        let req = self
            .request(Method::POST, VENDORS)
            .header("Prefer", "return=representation")
            .json(&[input]);
        self.rows::<Vendor>(req)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DataError::Decode("insert returned no rows".to_string()))
    }

    async fn update_vendor(&self, id: &str, input: VendorInput) -> Result<Vendor, DataError> {
        let req = self
            .request(Method::PATCH, VENDORS)
            .query(&[("id", eq(id))])
            .header("Prefer", "return=representation")
            .json(&input);
        self.rows::<Vendor>(req)
            .await?
            .into_iter()
            .next()
            .ok_or(DataError::NotFound)
    }

    async fn delete_vendor(&self, id: &str) -> Result<(), DataError> {
        let req = self
            .request(Method::DELETE, VENDORS)
            .query(&[("id", eq(id))])
            .header("Prefer", "return=representation");
        let deleted: Vec<serde_json::Value> = self.rows(req).await?;
        if deleted.is_empty() {
            return Err(DataError::NotFound);
        }
        Ok(())
    }
}
