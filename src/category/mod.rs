//! Category tree maintenance for the job-category taxonomy.
//!
//! Categories form a forest stored as a flat collection with parent
//! pointers and materialized paths. The operations here keep the derived
//! fields (`path`, `path_string`, `level`, `child_count`) in sync across
//! create, rename, move and delete.

mod create;
pub mod db;
mod delete;
mod domain;
mod move_to;
mod search;
mod tree;
mod update;

pub use create::{create_category, create_category_endpoint};
pub use delete::{DeleteCategoryParams, delete_category, delete_category_endpoint};
pub use domain::{
    Category, CategoryId, CategoryName, CategoryNode, CategoryUpdate, DeletionStrategy,
    MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH, MoveCategoryData, NewCategoryData, join_path,
    validate_description,
};
pub use move_to::{move_category, move_category_endpoint, validate_parent_child};
pub use search::{
    CategoryFilter, autocomplete_categories, autocomplete_categories_endpoint,
    list_categories_endpoint, search_categories,
};
pub use tree::{
    build_category_tree, category_by_path_endpoint, category_path_endpoint,
    category_tree_endpoint, find_by_path, get_category_endpoint, get_category_path,
};
pub use update::{update_category, update_category_endpoint};
