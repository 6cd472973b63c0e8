//! Data service seam and the embedded Sled backend.
//!
//! [`DataService`] is the table-oriented surface the rest of the app talks to:
//! an allow-list lookup plus single-round-trip CRUD on `vendors`. Production
//! points it at the hosted REST service ([`crate::hosted::HostedStore`]);
//! local development and tests use [`SledStore`].

use async_trait::async_trait;
use chrono::Utc;
use sled::Db;
use std::path::Path;
use uuid::Uuid;

use crate::error::DataError;
use crate::models::{AuthorizedUser, Vendor, VendorInput};

#[async_trait]
pub trait DataService: Send + Sync {
    /// Exact-match select on `authorized_users.email`. Returns every matching row.
    async fn find_authorized_users(&self, email: &str) -> Result<Vec<AuthorizedUser>, DataError>;

    async fn count_vendors(&self) -> Result<usize, DataError>;

    /// One page of vendors, newest first.
    async fn list_vendors(&self, offset: usize, limit: usize) -> Result<Vec<Vendor>, DataError>;

    async fn get_vendor(&self, id: &str) -> Result<Vendor, DataError>;

    async fn insert_vendor(&self, input: VendorInput) -> Result<Vendor, DataError>;

    /// Full-row overwrite; `id` and `created_at` are kept.
    async fn update_vendor(&self, id: &str, input: VendorInput) -> Result<Vendor, DataError>;

    async fn delete_vendor(&self, id: &str) -> Result<(), DataError>;
}

#[derive(Clone)] // Sled handles are cheap to clone and thread-safe
pub struct SledStore {
    db: Db,
    allow_tree: sled::Tree,
    vendor_tree: sled::Tree,
}

impl SledStore {
    /// Open or create the Sled database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let db = sled::open(path)?;
        let allow_tree = db.open_tree("authorized_users")?;
        let vendor_tree = db.open_tree("vendors")?;
        Ok(Self {
            db,
            allow_tree,
            vendor_tree,
        })
    }

    // --- Allow-list administration (the hosted table is managed out of band) ---

    pub fn allow_email(
        &self,
        email: &str,
        name: Option<String>,
    ) -> Result<AuthorizedUser, DataError> {
        let user = AuthorizedUser {
            email: email.to_string(),
            name,
            created_at: Some(Utc::now()),
        };
        self.allow_tree
            .insert(email.as_bytes(), serde_json::to_vec(&user)?)?;
        Ok(user)
    }

    /// Returns whether a row was removed.
    pub fn revoke_email(&self, email: &str) -> Result<bool, DataError> {
        Ok(self.allow_tree.remove(email.as_bytes())?.is_some())
    }

    pub fn authorized_users(&self) -> Result<Vec<AuthorizedUser>, DataError> {
        let mut users = vec![];
        for item in self.allow_tree.iter() {
            let (_, value) = item?;
            users.push(serde_json::from_slice(&value)?);
        }
        Ok(users)
    }

    pub fn flush(&self) -> Result<(), DataError> {
        self.db.flush()?;
        Ok(())
    }

    fn put_vendor(&self, vendor: &Vendor) -> Result<(), DataError> {
        self.vendor_tree
            .insert(vendor.id.as_bytes(), serde_json::to_vec(vendor)?)?;
        Ok(())
    }

    fn all_vendors(&self) -> Result<Vec<Vendor>, DataError> {
        let mut vendors = vec![];
        for item in self.vendor_tree.iter() {
            let (_, value) = item?;
            vendors.push(serde_json::from_slice::<Vendor>(&value)?);
        }
        vendors.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(vendors)
    }
}

#[async_trait]
impl DataService for SledStore {
    async fn find_authorized_users(&self, email: &str) -> Result<Vec<AuthorizedUser>, DataError> {
        match self.allow_tree.get(email.as_bytes())? {
            Some(bytes) => Ok(vec![serde_json::from_slice(&bytes)?]),
            None => Ok(vec![]),
        }
    }

    async fn count_vendors(&self) -> Result<usize, DataError> {
        Ok(self.vendor_tree.len())
    }

    async fn list_vendors(&self, offset: usize, limit: usize) -> Result<Vec<Vendor>, DataError> {
        Ok(self
            .all_vendors()?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn get_vendor(&self, id: &str) -> Result<Vendor, DataError> {
        match self.vendor_tree.get(id.as_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Err(DataError::NotFound),
        }
    }

    async fn insert_vendor(&self, input: VendorInput) -> Result<Vendor, DataError> {
        let vendor = input.into_vendor(Uuid::new_v4().to_string(), Utc::now());
        self.put_vendor(&vendor)?;
        Ok(vendor)
    }

    async fn update_vendor(&self, id: &str, input: VendorInput) -> Result<Vendor, DataError> {
        let existing = self.get_vendor(id).await?;
        let vendor = input.into_vendor(existing.id, existing.created_at);
        self.put_vendor(&vendor)?;
        Ok(vendor)
    }

    async fn delete_vendor(&self, id: &str) -> Result<(), DataError> {
        match self.vendor_tree.remove(id.as_bytes())? {
            Some(_) => Ok(()),
            None => Err(DataError::NotFound),
        }
    }
}
