//! Category reparenting operation and endpoint.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

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
        Category, CategoryId, MoveCategoryData,
        db::{adjust_child_count, get_category, rewrite_descendant_paths, save_category},
        domain::join_path,
    },
};

/// Move a category under a new parent, or to the root.
///
/// Moving a category onto its current parent is a no-op and performs no
/// writes. Otherwise the category's parent, path and level are recomputed,
/// every descendant's level is shifted by the same delta with its path
/// prefix replaced, and the old and new parents' `child_count`s are
/// adjusted. The writes are separate statements without a rollback; a
/// failure mid-operation leaves the subtree partially moved.
///
/// # Errors
///
/// Returns [Error::NotFound] if `id` does not resolve,
/// [Error::ParentNotFound] if `new_parent_id` does not,
/// [Error::SelfParent] if `new_parent_id == id`, and
/// [Error::CircularReference] if the new parent lies inside the moved
/// category's own subtree.
pub fn move_category(
    id: CategoryId,
    new_parent_id: Option<CategoryId>,
    connection: &Connection,
) -> Result<Category, Error> {
    let mut category = get_category(id, connection)?;

    if new_parent_id == category.parent_id {
        return Ok(category);
    }

    let (new_path, new_level) = match new_parent_id {
        Some(parent_id) => {
            if parent_id == id {
                return Err(Error::SelfParent);
            }

            let parent = get_category(parent_id, connection).map_err(|error| match error {
                Error::NotFound => Error::ParentNotFound(parent_id),
                other => other,
            })?;

            if !validate_parent_child(id, parent_id, connection)? {
                return Err(Error::CircularReference(id, parent_id));
            }

            let mut path = parent.path;
            path.push(category.name.to_string());
            (path, parent.level + 1)
        }
        None => (vec![category.name.to_string()], 0),
    };

    let old_parent_id = category.parent_id;
    let old_prefix_length = category.path.len();
    let level_delta = new_level - category.level;

    category.parent_id = new_parent_id;
    category.path = new_path;
    category.path_string = join_path(&category.path);
    category.level = new_level;
    category.updated_at = OffsetDateTime::now_utc();

    save_category(&category, connection)?;
    rewrite_descendant_paths(&category, old_prefix_length, level_delta, connection)?;

    if let Some(old_parent_id) = old_parent_id {
        adjust_child_count(old_parent_id, -1, connection)?;
    }
    if let Some(new_parent_id) = new_parent_id {
        adjust_child_count(new_parent_id, 1, connection)?;
    }

    Ok(category)
}

/// Check that `proposed_parent_id` may become the parent of `child_id`.
///
/// Walks the ancestor chain upwards from the proposed parent; the pairing is
/// rejected if `child_id` appears anywhere on the way to the root, since the
/// proposed parent would then sit inside the child's own subtree. Revisiting
/// a node ends the walk so that already-corrupt data cannot loop forever.
pub fn validate_parent_child(
    child_id: CategoryId,
    proposed_parent_id: CategoryId,
    connection: &Connection,
) -> Result<bool, Error> {
    let mut visited = HashSet::new();
    let mut current = Some(proposed_parent_id);

    while let Some(ancestor_id) = current {
        if ancestor_id == child_id {
            return Ok(false);
        }

        if !visited.insert(ancestor_id) {
            break;
        }

        current = get_category(ancestor_id, connection)?.parent_id;
    }

    Ok(true)
}

/// The state needed for moving a category.
#[derive(Debug, Clone)]
pub struct MoveCategoryEndpointState {
    /// The database connection shared across endpoints.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for MoveCategoryEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle category reparenting. Returns the moved category as JSON.
pub async fn move_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<MoveCategoryEndpointState>,
    Json(data): Json<MoveCategoryData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match move_category(category_id, data.parent_id, &connection) {
        Ok(category) => Json(category).into_response(),
        Err(
            error @ (Error::NotFound
            | Error::ParentNotFound(_)
            | Error::SelfParent
            | Error::CircularReference(_, _)),
        ) => error.into_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while moving category {category_id}: {error}"
            );
            error.into_response()
        }
    }
}

#[cfg(test)]
mod move_category_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        category::{
            NewCategoryData, create_category,
            db::{create_category_table, get_category},
        },
    };

    use super::{move_category, validate_parent_child};

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_category_table(&connection).expect("Could not create category table");
        connection
    }

    fn create_node(name: &str, parent_id: Option<i64>, connection: &Connection) -> i64 {
        create_category(
            NewCategoryData {
                name: name.to_string(),
                description: None,
                parent_id,
                display_order: None,
                is_active: None,
            },
            connection,
        )
        .expect("Could not create test category")
        .id
    }

    #[test]
    fn move_category_to_new_parent_recomputes_path_and_level() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, &connection);
        let backend = create_node("Backend", Some(engineering), &connection);
        let technology = create_node("Technology", None, &connection);

        let moved = move_category(backend, Some(technology), &connection).unwrap();

        assert_eq!(moved.parent_id, Some(technology));
        assert_eq!(moved.level, 1);
        assert_eq!(
            moved.path,
            vec!["Technology".to_string(), "Backend".to_string()]
        );
        assert_eq!(moved.path_string, "Technology.Backend");
    }

    #[test]
    fn move_category_shifts_descendant_levels_by_same_delta() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, &connection);
        let backend = create_node("Backend", Some(engineering), &connection);
        let rust = create_node("Rust", Some(backend), &connection);

        // Move the subtree one level deeper.
        let platform = create_node("Platform", Some(engineering), &connection);
        let moved = move_category(backend, Some(platform), &connection).unwrap();

        assert_eq!(moved.level, 2);
        let rust = get_category(rust, &connection).unwrap();
        assert_eq!(rust.level, 3);
        assert_eq!(rust.path_string, "Engineering.Platform.Backend.Rust");
        assert_eq!(rust.path.len() as i64, rust.level + 1);
    }

    #[test]
    fn move_category_to_root_resets_level() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, &connection);
        let backend = create_node("Backend", Some(engineering), &connection);
        let rust = create_node("Rust", Some(backend), &connection);

        let moved = move_category(backend, None, &connection).unwrap();

        assert_eq!(moved.parent_id, None);
        assert_eq!(moved.level, 0);
        assert_eq!(moved.path, vec!["Backend".to_string()]);
        let rust = get_category(rust, &connection).unwrap();
        assert_eq!(rust.level, 1);
        assert_eq!(rust.path_string, "Backend.Rust");
    }

    #[test]
    fn move_category_adjusts_both_parents_child_counts() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, &connection);
        let technology = create_node("Technology", None, &connection);
        let backend = create_node("Backend", Some(engineering), &connection);

        move_category(backend, Some(technology), &connection).unwrap();

        let engineering = get_category(engineering, &connection).unwrap();
        assert_eq!(engineering.child_count, 0);
        let technology = get_category(technology, &connection).unwrap();
        assert_eq!(technology.child_count, 1);
    }

    #[test]
    fn move_category_to_current_parent_is_a_no_op() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, &connection);
        let backend = create_node("Backend", Some(engineering), &connection);

        let before = get_category(backend, &connection).unwrap();
        let moved = move_category(backend, Some(engineering), &connection).unwrap();

        assert_eq!(moved, before);
        let engineering = get_category(engineering, &connection).unwrap();
        assert_eq!(engineering.child_count, 1);
    }

    #[test]
    fn move_root_category_to_root_is_a_no_op() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, &connection);

        let moved = move_category(engineering, None, &connection).unwrap();

        assert_eq!(moved.parent_id, None);
        assert_eq!(moved.level, 0);
    }

    #[test]
    fn move_category_under_itself_is_rejected() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, &connection);
        create_node("Backend", Some(engineering), &connection);

        let result = move_category(engineering, Some(engineering), &connection);

        assert_eq!(result, Err(Error::SelfParent));
    }

    #[test]
    fn move_category_under_descendant_is_rejected() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, &connection);
        let backend = create_node("Backend", Some(engineering), &connection);
        let rust = create_node("Rust", Some(backend), &connection);

        let result = move_category(engineering, Some(rust), &connection);

        assert_eq!(
            result,
            Err(Error::CircularReference(engineering, rust))
        );
    }

    #[test]
    fn move_category_with_missing_parent_returns_error() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, &connection);

        let result = move_category(engineering, Some(999999), &connection);

        assert_eq!(result, Err(Error::ParentNotFound(999999)));
    }

    #[test]
    fn validate_parent_child_accepts_unrelated_categories() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, &connection);
        let marketing = create_node("Marketing", None, &connection);

        let valid = validate_parent_child(engineering, marketing, &connection).unwrap();

        assert!(valid);
    }

    #[test]
    fn validate_parent_child_rejects_descendant_parent() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, &connection);
        let backend = create_node("Backend", Some(engineering), &connection);

        let valid = validate_parent_child(engineering, backend, &connection).unwrap();

        assert!(!valid);
    }
}
