use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Allow-list row. Any extra columns the store carries are ignored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AuthorizedUser {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Vendor {
    pub id: String,
    pub vendor_name: String,
    pub bank_account_no: String,
    pub bank_name: String,
    pub address_line_1: String,
    #[serde(default)]
    pub address_line_2: Option<String>,
    pub city: String,
    pub country: String,
    pub zip_code: String,
    pub created_at: DateTime<Utc>,
}

/// The user-editable part of a vendor, as submitted by a form or the API.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct VendorInput {
    #[serde(default)]
    pub vendor_name: String,
    #[serde(default)]
    pub bank_account_no: String,
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub address_line_1: String,
    #[serde(default)]
    pub address_line_2: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub zip_code: String,
}

impl VendorInput {
    /// Builds the full record for an insert. Id and timestamp are server-generated.
    pub fn into_vendor(self, id: String, created_at: DateTime<Utc>) -> Vendor {
        Vendor {
            id,
            vendor_name: self.vendor_name,
            bank_account_no: self.bank_account_no,
            bank_name: self.bank_name,
            address_line_1: self.address_line_1,
            address_line_2: self.address_line_2,
            city: self.city,
            country: self.country,
            zip_code: self.zip_code,
            created_at,
        }
    }
}

impl From<&Vendor> for VendorInput {
    fn from(vendor: &Vendor) -> Self {
        Self {
            vendor_name: vendor.vendor_name.clone(),
            bank_account_no: vendor.bank_account_no.clone(),
            bank_name: vendor.bank_name.clone(),
            address_line_1: vendor.address_line_1.clone(),
            address_line_2: vendor.address_line_2.clone(),
            city: vendor.city.clone(),
            country: vendor.country.clone(),
            zip_code: vendor.zip_code.clone(),
        }
    }
}

/// Identity returned by the provider after a successful OAuth exchange.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Claims carried by the signed session token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionClaims {
    pub id: String, // provider user id
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub iat: usize,
    pub exp: usize,
}

impl SessionClaims {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}
