//! Vendor form validation and list-view page arithmetic.

use std::collections::BTreeMap;

use crate::error::DataError;
use crate::models::{Vendor, VendorInput};
use crate::storage::DataService;

pub const REQUIRED_MESSAGE: &str = "This field is required";

/// Field names that must be non-empty after trimming, in form order.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "vendor_name",
    "bank_account_no",
    "bank_name",
    "address_line_1",
    "city",
    "country",
    "zip_code",
];

/// Per-field validation messages keyed by field name.
pub type FieldErrors = BTreeMap<&'static str, &'static str>;

/// Trims every field and checks the required ones.
///
/// On success the returned input is what gets submitted: trimmed values, and a
/// blank `address_line_2` turned into `None`.
pub fn validate(input: &VendorInput) -> Result<VendorInput, FieldErrors> {
    let trimmed = VendorInput {
        vendor_name: input.vendor_name.trim().to_string(),
        bank_account_no: input.bank_account_no.trim().to_string(),
        bank_name: input.bank_name.trim().to_string(),
        address_line_1: input.address_line_1.trim().to_string(),
        address_line_2: input
            .address_line_2
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string),
        city: input.city.trim().to_string(),
        country: input.country.trim().to_string(),
        zip_code: input.zip_code.trim().to_string(),
    };

    let errors: FieldErrors = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| required_value(&trimmed, field).is_empty())
        .map(|field| (field, REQUIRED_MESSAGE))
        .collect();

    if errors.is_empty() {
        Ok(trimmed)
    } else {
        Err(errors)
    }
}

fn required_value<'a>(input: &'a VendorInput, field: &str) -> &'a str {
    match field {
        "vendor_name" => &input.vendor_name,
        "bank_account_no" => &input.bank_account_no,
        "bank_name" => &input.bank_name,
        "address_line_1" => &input.address_line_1,
        "city" => &input.city,
        "country" => &input.country,
        "zip_code" => &input.zip_code,
        _ => "",
    }
}

/// Position in a paginated list. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

impl PageInfo {
    /// The requested page is clamped into `1..=total_pages` (page 1 when empty).
    pub fn new(page: usize, page_size: usize, total: usize) -> Self {
        let page_size = page_size.max(1);
        let last = total.div_ceil(page_size).max(1);
        Self {
            page: page.clamp(1, last),
            page_size,
            total,
        }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Only moves to pages that exist.
    pub fn go_to(&mut self, page: usize) -> bool {
        if page >= 1 && page <= self.total_pages() {
            self.page = page;
            true
        } else {
            false
        }
    }

    /// 1-based index of the first row shown, or 0 when the page is empty.
    pub fn showing_from(&self, rows_on_page: usize) -> usize {
        if rows_on_page > 0 {
            self.offset() + 1
        } else {
            0
        }
    }

    pub fn showing_to(&self) -> usize {
        self.page.saturating_mul(self.page_size).min(self.total)
    }

    /// Up to five page numbers centred on the current page where possible.
    pub fn page_window(&self) -> Vec<usize> {
        let total_pages = self.total_pages();
        let len = total_pages.min(5);
        let start = if total_pages <= 5 || self.page <= 3 {
            1
        } else if self.page.saturating_add(2) >= total_pages {
            total_pages - 4
        } else {
            self.page - 2
        };
        (start..start + len).collect()
    }
}

/// One fetched page of vendors plus where it sits in the list.
#[derive(Debug, Clone)]
pub struct ListView {
    pub info: PageInfo,
    pub vendors: Vec<Vendor>,
}

impl ListView {
    pub fn new(info: PageInfo, vendors: Vec<Vendor>) -> Self {
        Self { info, vendors }
    }

    /// Nothing at all to show, as opposed to a page emptied by a concurrent delete.
    pub fn is_empty_state(&self) -> bool {
        self.vendors.is_empty() && self.info.total == 0
    }
}

/// Fetches the total and then the rows of one page, newest first.
pub async fn load_page(
    store: &dyn DataService,
    page: usize,
    page_size: usize,
) -> Result<ListView, DataError> {
    let total = store.count_vendors().await?;
    let info = PageInfo::new(page, page_size, total);
    let vendors = store.list_vendors(info.offset(), info.page_size).await?;
    Ok(ListView::new(info, vendors))
}

/// Page to land on after deleting one row from a page that held `rows_on_page` rows.
pub fn page_after_delete(page: usize, rows_on_page: usize) -> usize {
    if rows_on_page == 1 && page > 1 {
        page - 1
    } else {
        page.max(1)
    }
}
