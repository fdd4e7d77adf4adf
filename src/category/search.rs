//! Predicate-based search and autocomplete over the flat category collection.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    category::{Category, CategoryId, db::get_all_categories},
};

/// The default number of autocomplete suggestions.
const DEFAULT_AUTOCOMPLETE_LIMIT: usize = 10;

/// Filter criteria for category search.
///
/// Criteria combine with AND semantics; a field left as `None` does not
/// constrain the result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryFilter {
    /// Case-insensitive substring match against name, description and path.
    pub text: Option<String>,

    /// Match only categories with this visibility.
    pub is_active: Option<bool>,

    /// Match only categories at this depth.
    pub level: Option<i64>,

    /// Match only direct children of this category.
    pub parent_id: Option<CategoryId>,

    /// Lower bound (inclusive) on the direct-child count.
    pub min_child_count: Option<i64>,

    /// Upper bound (inclusive) on the direct-child count.
    pub max_child_count: Option<i64>,

    /// Lower bound (inclusive) on the direct vacancy count.
    pub min_vacancy_count: Option<i64>,

    /// Upper bound (inclusive) on the direct vacancy count.
    pub max_vacancy_count: Option<i64>,
}

/// Scan the flat collection for categories matching every supplied criterion.
///
/// Results keep the `(display_order, name)` ordering of the flat list.
pub fn search_categories(
    filter: &CategoryFilter,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    let categories = get_all_categories(connection)?;

    Ok(categories
        .into_iter()
        .filter(|category| matches_filter(category, filter))
        .collect())
}

fn matches_filter(category: &Category, filter: &CategoryFilter) -> bool {
    if let Some(text) = &filter.text {
        let needle = text.to_lowercase();
        let name_matches = category.name.as_ref().to_lowercase().contains(&needle);
        let description_matches = category
            .description
            .as_deref()
            .is_some_and(|description| description.to_lowercase().contains(&needle));
        let path_matches = category.path_string.to_lowercase().contains(&needle);

        if !(name_matches || description_matches || path_matches) {
            return false;
        }
    }

    if let Some(is_active) = filter.is_active
        && category.is_active != is_active
    {
        return false;
    }

    if let Some(level) = filter.level
        && category.level != level
    {
        return false;
    }

    if let Some(parent_id) = filter.parent_id
        && category.parent_id != Some(parent_id)
    {
        return false;
    }

    if let Some(min) = filter.min_child_count
        && category.child_count < min
    {
        return false;
    }

    if let Some(max) = filter.max_child_count
        && category.child_count > max
    {
        return false;
    }

    if let Some(min) = filter.min_vacancy_count
        && category.vacancy_count < min
    {
        return false;
    }

    if let Some(max) = filter.max_vacancy_count
        && category.vacancy_count > max
    {
        return false;
    }

    true
}

/// Suggest active categories whose name contains `query`, case-insensitively.
pub fn autocomplete_categories(
    query: &str,
    limit: usize,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    let needle = query.to_lowercase();

    Ok(get_all_categories(connection)?
        .into_iter()
        .filter(|category| {
            category.is_active && category.name.as_ref().to_lowercase().contains(&needle)
        })
        .take(limit)
        .collect())
}

/// The state needed for the category search endpoints.
#[derive(Debug, Clone)]
pub struct SearchCategoryEndpointState {
    /// The database connection shared across endpoints.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SearchCategoryEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List categories, optionally narrowed by filter query parameters.
pub async fn list_categories_endpoint(
    Query(filter): Query<CategoryFilter>,
    State(state): State<SearchCategoryEndpointState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match search_categories(&filter, &connection) {
        Ok(categories) => Json(categories).into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while searching categories: {error}");
            error.into_response()
        }
    }
}

/// Query parameters for category autocomplete.
#[derive(Debug, Deserialize)]
pub struct AutocompleteParams {
    /// The partial name typed by the user.
    pub q: String,

    /// The maximum number of suggestions to return.
    pub limit: Option<usize>,
}

/// Suggest categories for an autocomplete widget.
pub async fn autocomplete_categories_endpoint(
    Query(params): Query<AutocompleteParams>,
    State(state): State<SearchCategoryEndpointState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    let limit = params.limit.unwrap_or(DEFAULT_AUTOCOMPLETE_LIMIT);

    match autocomplete_categories(&params.q, limit, &connection) {
        Ok(categories) => Json(categories).into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred during autocomplete: {error}");
            error.into_response()
        }
    }
}
