//! The API endpoints URIs.
//!
//! For endpoints that take a category ID, e.g., '/api/categories/{category_id}',
//! use [format_endpoint].

use crate::category::CategoryId;

/// The route to create a category or list/search categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route for the assembled category tree.
pub const CATEGORY_TREE: &str = "/api/categories/tree";
/// The route for category name autocomplete.
pub const CATEGORY_AUTOCOMPLETE: &str = "/api/categories/autocomplete";
/// The route for looking up a category by its dot-joined path.
pub const CATEGORY_BY_PATH: &str = "/api/categories/by_path";
/// The route to get, update or delete a single category.
pub const CATEGORY: &str = "/api/categories/{category_id}";
/// The route for a category's materialized path.
pub const CATEGORY_PATH: &str = "/api/categories/{category_id}/path";
/// The route to move a category to a new parent.
pub const CATEGORY_PARENT: &str = "/api/categories/{category_id}/parent";

/// Fill the category ID into a parameterized endpoint URI.
pub fn format_endpoint(endpoint: &str, category_id: CategoryId) -> String {
    endpoint.replace("{category_id}", &category_id.to_string())
}
