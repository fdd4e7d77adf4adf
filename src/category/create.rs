//! Category creation operation and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    category::{
        Category, CategoryName, NewCategoryData,
        db::{InsertCategory, adjust_child_count, get_category, insert_category},
        domain::validate_description,
    },
};

/// Create a category and return it with its generated ID.
///
/// A category with a `parent_id` is attached below its parent: its path is
/// the parent's path plus its own name and its level is the parent's level
/// plus one. Without a `parent_id` the category becomes a root. The parent's
/// `child_count` is incremented after the insert; the two writes are separate
/// statements, so a failure in between leaves the counter stale.
///
/// # Errors
///
/// Returns [Error::ParentNotFound] if `parent_id` does not resolve, or a
/// validation error for the name or description.
pub fn create_category(
    data: NewCategoryData,
    connection: &Connection,
) -> Result<Category, Error> {
    let name = CategoryName::new(&data.name)?;
    let description = validate_description(data.description)?;

    let (path, level) = match data.parent_id {
        Some(parent_id) => {
            let parent = get_category(parent_id, connection).map_err(|error| match error {
                Error::NotFound => Error::ParentNotFound(parent_id),
                other => other,
            })?;

            let mut path = parent.path;
            path.push(name.to_string());
            (path, parent.level + 1)
        }
        None => (vec![name.to_string()], 0),
    };

    let category = insert_category(
        InsertCategory {
            name,
            description,
            parent_id: data.parent_id,
            path,
            level,
            is_active: data.is_active.unwrap_or(true),
            display_order: data.display_order.unwrap_or(0),
            created_at: OffsetDateTime::now_utc(),
        },
        connection,
    )?;

    if let Some(parent_id) = data.parent_id {
        adjust_child_count(parent_id, 1, connection)?;
    }

    Ok(category)
}

/// The state needed for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryEndpointState {
    /// The database connection shared across endpoints.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle category creation. Returns the created category as JSON.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryEndpointState>,
    Json(data): Json<NewCategoryData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_category(data, &connection) {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(
            error @ (Error::ParentNotFound(_)
            | Error::EmptyCategoryName
            | Error::CategoryNameTooLong(_)
            | Error::DescriptionTooLong(_)),
        ) => error.into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a category: {error}");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod create_category_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        category::{NewCategoryData, db::create_category_table, db::get_category},
    };

    use super::create_category;

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_category_table(&connection).expect("Could not create category table");
        connection
    }

    fn new_category(name: &str, parent_id: Option<i64>) -> NewCategoryData {
        NewCategoryData {
            name: name.to_string(),
            description: None,
            parent_id,
            display_order: None,
            is_active: None,
        }
    }

    #[test]
    fn create_root_category_succeeds() {
        let connection = get_test_db_connection();

        let category = create_category(new_category("Engineering", None), &connection)
            .expect("Could not create category");

        assert!(category.id > 0);
        assert_eq!(category.level, 0);
        assert_eq!(category.path, vec!["Engineering".to_string()]);
        assert_eq!(category.path_string, "Engineering");
        assert_eq!(category.parent_id, None);
        assert!(category.is_active);
        assert_eq!(category.display_order, 0);
        assert_eq!(category.child_count, 0);
        assert_eq!(category.vacancy_count, 0);
        assert_eq!(category.total_vacancy_count, 0);
    }

    #[test]
    fn create_child_category_extends_parent_path() {
        let connection = get_test_db_connection();
        let parent = create_category(new_category("Engineering", None), &connection).unwrap();

        let child =
            create_category(new_category("Backend", Some(parent.id)), &connection).unwrap();

        assert_eq!(child.level, parent.level + 1);
        assert_eq!(
            child.path,
            vec!["Engineering".to_string(), "Backend".to_string()]
        );
        assert_eq!(child.path_string, "Engineering.Backend");
        assert_eq!(child.parent_id, Some(parent.id));
        assert_eq!(child.path.len() as i64, child.level + 1);
    }

    #[test]
    fn create_child_category_increments_parent_child_count() {
        let connection = get_test_db_connection();
        let parent = create_category(new_category("Engineering", None), &connection).unwrap();

        create_category(new_category("Backend", Some(parent.id)), &connection).unwrap();
        create_category(new_category("Frontend", Some(parent.id)), &connection).unwrap();

        let reloaded = get_category(parent.id, &connection).unwrap();
        assert_eq!(reloaded.child_count, 2);
    }

    #[test]
    fn create_category_with_missing_parent_returns_error() {
        let connection = get_test_db_connection();

        let result = create_category(new_category("Backend", Some(999)), &connection);

        assert_eq!(result, Err(Error::ParentNotFound(999)));
    }

    #[test]
    fn create_category_with_empty_name_returns_error() {
        let connection = get_test_db_connection();

        let result = create_category(new_category("   ", None), &connection);

        assert_eq!(result, Err(Error::EmptyCategoryName));
    }

    #[test]
    fn create_category_applies_overrides() {
        let connection = get_test_db_connection();

        let category = create_category(
            NewCategoryData {
                name: "Archived".to_string(),
                description: Some("No longer hiring".to_string()),
                parent_id: None,
                display_order: Some(99),
                is_active: Some(false),
            },
            &connection,
        )
        .unwrap();

        assert_eq!(category.description, Some("No longer hiring".to_string()));
        assert_eq!(category.display_order, 99);
        assert!(!category.is_active);
    }
}
