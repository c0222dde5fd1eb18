//! Catalog resolution: products and their sellable variants.
//!
//! Issues a single read request for the full product catalog and builds a
//! mapping from product id to its variant ids, preserving the API's variant
//! ordering per product. No pagination is attempted beyond what one request
//! returns.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{info, warn};

use crate::commerce::CommerceClient;
use crate::error::AppError;

/// API path for the full product catalog.
const PRODUCTS_PATH: &str = "/admin/products.json";

// ─────────────────────────────────────────────────────────────────────────────
// CatalogMap
// ─────────────────────────────────────────────────────────────────────────────

/// Mapping from product id to the ordered variant ids it resolves to.
///
/// Built once per run from a single catalog read; read-only thereafter and
/// never persisted.
#[derive(Debug, Clone, Default)]
pub struct CatalogMap {
    products: HashMap<u64, Vec<u64>>,
}

impl CatalogMap {
    /// The variant ids mapped to a product, if the catalog carries it.
    pub fn variants_for(&self, product_ref: u64) -> Option<&[u64]> {
        self.products.get(&product_ref).map(|v| v.as_slice())
    }

    /// Number of distinct products in the catalog.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<(u64, Vec<u64>)> for CatalogMap {
    fn from_iter<I: IntoIterator<Item = (u64, Vec<u64>)>>(iter: I) -> Self {
        Self {
            products: iter.into_iter().collect(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ProductListResponse {
    products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
struct Product {
    id: u64,
    #[serde(default)]
    variants: Vec<Variant>,
}

#[derive(Debug, Deserialize)]
struct Variant {
    id: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Fetches the full product catalog for the client's store.
///
/// # Errors
///
/// Returns [`AppError::CatalogFetchFailed`] on any non-success response.
/// Callers must treat an empty map as "nothing resolvable" and abort the run
/// before scheduling.
pub async fn fetch_catalog(client: &CommerceClient) -> Result<CatalogMap, AppError> {
    let response = client.get(PRODUCTS_PATH).await?;
    let status = response.status();

    if !status.is_success() {
        warn!(
            "[CATALOG] Fetch for account {} returned status {}",
            client.account(),
            status.as_u16()
        );
        return Err(AppError::CatalogFetchFailed {
            message: format!("catalog request returned status {}", status.as_u16()),
        });
    }

    let body: ProductListResponse = response.json().await.map_err(|e| {
        AppError::CatalogFetchFailed {
            message: format!("unreadable catalog response: {e}"),
        }
    })?;

    let catalog = build_catalog(body);
    info!(
        "[CATALOG] Resolved {} products for account {}",
        catalog.len(),
        client.account()
    );
    Ok(catalog)
}

/// Groups every variant under its parent product id, preserving the API's
/// variant ordering per product.
fn build_catalog(body: ProductListResponse) -> CatalogMap {
    body.products
        .into_iter()
        .map(|p| (p.id, p.variants.into_iter().map(|v| v.id).collect()))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_variants_under_parent_product() {
        let body: ProductListResponse = serde_json::from_value(serde_json::json!({
            "products": [
                { "id": 100, "variants": [{ "id": 9 }, { "id": 10 }] },
                { "id": 200, "variants": [{ "id": 31 }] },
            ]
        }))
        .unwrap();

        let catalog = build_catalog(body);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.variants_for(100), Some(&[9, 10][..]));
        assert_eq!(catalog.variants_for(200), Some(&[31][..]));
        assert_eq!(catalog.variants_for(300), None);
    }

    #[test]
    fn product_without_variants_yields_empty_entry() {
        let body: ProductListResponse = serde_json::from_value(serde_json::json!({
            "products": [{ "id": 100 }]
        }))
        .unwrap();

        let catalog = build_catalog(body);

        assert_eq!(catalog.variants_for(100), Some(&[][..]));
    }

    #[test]
    fn variant_ordering_is_preserved() {
        let body: ProductListResponse = serde_json::from_value(serde_json::json!({
            "products": [
                { "id": 1, "variants": [{ "id": 5 }, { "id": 3 }, { "id": 8 }] },
            ]
        }))
        .unwrap();

        let catalog = build_catalog(body);

        assert_eq!(catalog.variants_for(1), Some(&[5, 3, 8][..]));
    }

    #[test]
    fn empty_product_list_yields_empty_catalog() {
        let body: ProductListResponse =
            serde_json::from_value(serde_json::json!({ "products": [] })).unwrap();

        let catalog = build_catalog(body);

        assert!(catalog.is_empty());
    }
}
