//! Category partial-update operation and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    category::{
        Category, CategoryId, CategoryName, CategoryUpdate,
        db::{get_category, rewrite_descendant_paths, save_category},
        domain::{join_path, validate_description},
    },
};

/// Apply a partial update to a category and return the merged result.
///
/// Fields absent from `update` keep their stored values; a present
/// `description: null` clears the description. A name change replaces the
/// last segment of the category's materialized path and rewrites the path
/// prefix of every descendant, preserving each descendant's trailing
/// segments and level. The rewrites are separate statements without a
/// rollback, so a mid-loop failure leaves some descendants on the old prefix.
///
/// # Errors
///
/// Returns [Error::UpdateMissingCategory] if `id` does not resolve, or a
/// validation error for the name or description.
pub fn update_category(
    id: CategoryId,
    update: CategoryUpdate,
    connection: &Connection,
) -> Result<Category, Error> {
    let mut category = get_category(id, connection).map_err(|error| match error {
        Error::NotFound => Error::UpdateMissingCategory,
        other => other,
    })?;

    let renamed = match update.name {
        Some(raw_name) => {
            let name = CategoryName::new(&raw_name)?;
            let changed = name != category.name;
            category.name = name;
            changed
        }
        None => false,
    };

    if let Some(description) = update.description {
        category.description = validate_description(description)?;
    }

    if let Some(display_order) = update.display_order {
        category.display_order = display_order;
    }

    if let Some(is_active) = update.is_active {
        category.is_active = is_active;
    }

    category.updated_at = OffsetDateTime::now_utc();

    if renamed {
        let prefix_length = category.path.len();
        if let Some(own_segment) = category.path.last_mut() {
            *own_segment = category.name.to_string();
        }
        category.path_string = join_path(&category.path);

        save_category(&category, connection)?;
        rewrite_descendant_paths(&category, prefix_length, 0, connection)?;
    } else {
        save_category(&category, connection)?;
    }

    Ok(category)
}

/// The state needed for updating a category.
#[derive(Debug, Clone)]
pub struct UpdateCategoryEndpointState {
    /// The database connection shared across endpoints.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UpdateCategoryEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle a partial category update. Returns the updated category as JSON.
pub async fn update_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<UpdateCategoryEndpointState>,
    Json(update): Json<CategoryUpdate>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match update_category(category_id, update, &connection) {
        Ok(category) => Json(category).into_response(),
        Err(
            error @ (Error::UpdateMissingCategory
            | Error::EmptyCategoryName
            | Error::CategoryNameTooLong(_)
            | Error::DescriptionTooLong(_)),
        ) => error.into_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while updating category {category_id}: {error}"
            );
            error.into_response()
        }
    }
}
