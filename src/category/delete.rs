//! Category deletion operation and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    category::{
        CategoryId, DeletionStrategy,
        db::{
            adjust_child_count, delete_category_row, get_category, get_children, get_descendants,
            subtree_vacancy_count,
        },
        move_to::move_category,
    },
};

/// Delete a category, resolving its direct children according to `strategy`.
///
/// `Cascade` removes the whole subtree, children before parents. The move
/// strategies reparent each direct child (with its own subtree) before the
/// category itself is removed, recomputing paths and levels as a move does.
/// Afterwards the deleted category's parent has its `child_count`
/// decremented. The writes are separate statements without a rollback.
///
/// Deletion is refused while it would orphan vacancy assignments: for
/// `Cascade` when any category in the subtree has vacancies, for the move
/// strategies when the deleted category itself does (moved children keep
/// their assignments). Cleaning up or reassigning the vacancies themselves
/// is the vacancy subsystem's responsibility.
///
/// # Errors
///
/// Returns [Error::DeleteMissingCategory] if `id` does not resolve, or
/// [Error::CategoryHasVacancies] if the deletion is blocked.
pub fn delete_category(
    id: CategoryId,
    strategy: DeletionStrategy,
    connection: &Connection,
) -> Result<(), Error> {
    let category = get_category(id, connection).map_err(|error| match error {
        Error::NotFound => Error::DeleteMissingCategory,
        other => other,
    })?;

    match strategy {
        DeletionStrategy::Cascade => {
            let assigned = subtree_vacancy_count(id, connection)?;
            if assigned > 0 {
                return Err(Error::CategoryHasVacancies(id, assigned));
            }

            let descendants = get_descendants(id, connection)?;
            for descendant in descendants.iter().rev() {
                delete_category_row(descendant.id, connection)?;
            }

            delete_category_row(id, connection)?;
        }
        DeletionStrategy::MoveToParent | DeletionStrategy::MoveToRoot => {
            if category.vacancy_count > 0 {
                return Err(Error::CategoryHasVacancies(id, category.vacancy_count));
            }

            let target = match strategy {
                DeletionStrategy::MoveToParent => category.parent_id,
                _ => None,
            };

            for child in get_children(id, connection)? {
                move_category(child.id, target, connection)?;
            }

            delete_category_row(id, connection)?;
        }
    }

    if let Some(parent_id) = category.parent_id {
        adjust_child_count(parent_id, -1, connection)?;
    }

    Ok(())
}

/// Query parameters for category deletion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteCategoryParams {
    /// What happens to the category's direct children. Defaults to `move_to_parent`.
    #[serde(default)]
    pub strategy: DeletionStrategy,
}

/// The state needed for deleting a category.
#[derive(Debug, Clone)]
pub struct DeleteCategoryEndpointState {
    /// The database connection shared across endpoints.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteCategoryEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle category deletion. Returns 204 on success.
pub async fn delete_category_endpoint(
    Path(category_id): Path<CategoryId>,
    Query(params): Query<DeleteCategoryParams>,
    State(state): State<DeleteCategoryEndpointState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match delete_category(category_id, params.strategy, &connection) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error @ (Error::DeleteMissingCategory | Error::CategoryHasVacancies(_, _))) => {
            error.into_response()
        }
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting category {category_id}: {error}"
            );
            error.into_response()
        }
    }
}
