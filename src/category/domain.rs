//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;

use crate::Error;

/// The maximum length of a category name in grapheme clusters.
pub const MAX_NAME_LENGTH: usize = 100;

/// The maximum length of a category description in grapheme clusters.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Database identifier for a category.
pub type CategoryId = i64;

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// The name is trimmed before validation.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is
    /// empty or whitespace-only, or an [Error::CategoryNameTooLong] if it is
    /// longer than [MAX_NAME_LENGTH] grapheme clusters.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            return Err(Error::EmptyCategoryName);
        }

        if name.graphemes(true).count() > MAX_NAME_LENGTH {
            return Err(Error::CategoryNameTooLong(MAX_NAME_LENGTH));
        }

        Ok(Self(name.to_string()))
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the non-empty invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate an optional category description.
///
/// # Errors
///
/// Returns [Error::DescriptionTooLong] if the description is longer than
/// [MAX_DESCRIPTION_LENGTH] grapheme clusters.
pub fn validate_description(description: Option<String>) -> Result<Option<String>, Error> {
    match description {
        Some(text) if text.graphemes(true).count() > MAX_DESCRIPTION_LENGTH => {
            Err(Error::DescriptionTooLong(MAX_DESCRIPTION_LENGTH))
        }
        other => Ok(other),
    }
}

/// Join path segments into the denormalized, dot-separated path string.
pub fn join_path(path: &[String]) -> String {
    path.join(".")
}

/// A node in the job-category taxonomy, e.g., 'Engineering', 'Engineering.Backend'.
///
/// The materialized `path` always satisfies `path.len() == level + 1` and is
/// the parent's path followed by this category's own name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,

    /// The display name of the category.
    pub name: CategoryName,

    /// An optional free-text description.
    pub description: Option<String>,

    /// The ID of the parent category, or `None` for a root category.
    pub parent_id: Option<CategoryId>,

    /// The names of the categories from the root down to this one, inclusive.
    pub path: Vec<String>,

    /// [Category::path] joined by `.`, kept in sync with it.
    pub path_string: String,

    /// The depth of this category, where a root category has level 0.
    pub level: i64,

    /// Whether this category is visible to job seekers.
    pub is_active: bool,

    /// The primary sort key among siblings.
    pub display_order: i64,

    /// The number of direct child categories.
    pub child_count: i64,

    /// The number of vacancies assigned directly to this category.
    ///
    /// Maintained by the vacancy subsystem; never written by tree operations.
    pub vacancy_count: i64,

    /// [Category::vacancy_count] plus the sum over all descendants.
    ///
    /// Maintained by the vacancy subsystem; never written by tree operations.
    pub total_vacancy_count: i64,

    /// When the category was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the category was last modified.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A category with its children, assembled on demand from the flat table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryNode {
    /// The category at this position in the tree.
    pub category: Category,

    /// The child nodes, sorted by `(display_order, name)`.
    pub children: Vec<CategoryNode>,

    /// The number of vacancies assigned directly to this category.
    pub vacancy_count: i64,
}

/// What happens to a deleted category's direct children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStrategy {
    /// Recursively delete the whole subtree, children before parents.
    Cascade,

    /// Reparent each direct child to the deleted category's own parent,
    /// or to the root if the deleted category was itself a root.
    #[default]
    MoveToParent,

    /// Make each direct child a root category.
    MoveToRoot,
}

/// The data needed to create a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategoryData {
    /// The display name of the new category.
    pub name: String,

    /// An optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The parent to attach the new category to, or `None` for a root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,

    /// The sort key among siblings. Defaults to 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,

    /// Whether the category is visible. Defaults to `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// A partial update of a category.
///
/// A field that is absent from the JSON body leaves the stored value
/// unchanged. For [CategoryUpdate::description] the outer `Option` records
/// whether the field was present at all, so `"description": null` clears the
/// description while an absent field preserves it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryUpdate {
    /// The new name, if the category should be renamed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The new description: absent to preserve, `null` to clear, or a value to replace.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,

    /// The new sort key among siblings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,

    /// The new visibility flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Deserialize a field that was present in the input, keeping `null` as
/// `Some(None)`. Combined with `#[serde(default)]`, an absent field stays `None`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// The data needed to move a category to a new parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveCategoryData {
    /// The new parent, or `None` to make the category a root.
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}


#[cfg(test)]
mod category_update_tests {
    use super::CategoryUpdate;

    #[test]
    fn absent_description_deserializes_to_unset() {
        let update: CategoryUpdate = serde_json::from_str(r#"{ "name": "Sales" }"#).unwrap();

        assert_eq!(update.name, Some("Sales".to_owned()));
        assert_eq!(update.description, None);
    }

    #[test]
    fn null_description_deserializes_to_clear() {
        let update: CategoryUpdate =
            serde_json::from_str(r#"{ "description": null }"#).unwrap();

        assert_eq!(update.description, Some(None));
    }

    #[test]
    fn provided_description_deserializes_to_replace() {
        let update: CategoryUpdate =
            serde_json::from_str(r#"{ "description": "All sales roles" }"#).unwrap();

        assert_eq!(update.description, Some(Some("All sales roles".to_owned())));
    }
}
