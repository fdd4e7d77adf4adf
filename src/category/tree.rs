//! Tree assembly and path lookups over the flat category collection.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    category::{
        Category, CategoryId, CategoryNode,
        db::{find_by_path_string, get_all_categories, get_category},
        domain::join_path,
    },
};

/// Assemble the category forest from the flat table.
///
/// Roots are the categories without a parent. Siblings at every depth come
/// out sorted by `(display_order, name)`, which [get_all_categories] already
/// guarantees for the flat list; grouping by parent preserves it.
pub fn build_category_tree(connection: &Connection) -> Result<Vec<CategoryNode>, Error> {
    let categories = get_all_categories(connection)?;

    let mut children_of: HashMap<CategoryId, Vec<Category>> = HashMap::new();
    let mut roots = Vec::new();

    for category in categories {
        match category.parent_id {
            Some(parent_id) => children_of.entry(parent_id).or_default().push(category),
            None => roots.push(category),
        }
    }

    Ok(roots
        .into_iter()
        .map(|root| build_node(root, &mut children_of))
        .collect())
}

fn build_node(
    category: Category,
    children_of: &mut HashMap<CategoryId, Vec<Category>>,
) -> CategoryNode {
    let children = children_of
        .remove(&category.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| build_node(child, children_of))
        .collect();

    let vacancy_count = category.vacancy_count;

    CategoryNode {
        category,
        children,
        vacancy_count,
    }
}

/// Return the materialized path of a category.
///
/// # Errors
///
/// Returns [Error::NotFound] if `id` does not resolve.
pub fn get_category_path(id: CategoryId, connection: &Connection) -> Result<Vec<String>, Error> {
    Ok(get_category(id, connection)?.path)
}

/// Look up an active category by the exact sequence of ancestor names.
pub fn find_by_path(path: &[String], connection: &Connection) -> Result<Option<Category>, Error> {
    find_by_path_string(&join_path(path), connection)
}

/// The state needed for the category lookup endpoints.
#[derive(Debug, Clone)]
pub struct CategoryLookupEndpointState {
    /// The database connection shared across endpoints.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryLookupEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Return the assembled category forest as JSON.
pub async fn category_tree_endpoint(
    State(state): State<CategoryLookupEndpointState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match build_category_tree(&connection) {
        Ok(tree) => Json(tree).into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while building the category tree: {error}");
            error.into_response()
        }
    }
}

/// Return a single category as JSON.
pub async fn get_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<CategoryLookupEndpointState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match get_category(category_id, &connection) {
        Ok(category) => Json(category).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Return a category's materialized path as a JSON list of names.
pub async fn category_path_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<CategoryLookupEndpointState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match get_category_path(category_id, &connection) {
        Ok(path) => Json(path).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Query parameters for looking a category up by its path.
#[derive(Debug, Deserialize)]
pub struct ByPathParams {
    /// The dot-joined path string, e.g. `Engineering.Backend`.
    pub path: String,
}

/// Look up an active category by its dot-joined path string.
///
/// Responds with the category, or JSON `null` when no active category
/// matches the path exactly.
pub async fn category_by_path_endpoint(
    Query(params): Query<ByPathParams>,
    State(state): State<CategoryLookupEndpointState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    let segments: Vec<String> = params.path.split('.').map(str::to_string).collect();

    match find_by_path(&segments, &connection) {
        Ok(category) => Json(category).into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while looking up a path: {error}");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod category_tree_tests {
    use rusqlite::Connection;

    use crate::category::{NewCategoryData, create_category, db::create_category_table};

    use super::{build_category_tree, find_by_path, get_category_path};

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_category_table(&connection).expect("Could not create category table");
        connection
    }

    fn create_node(
        name: &str,
        parent_id: Option<i64>,
        display_order: i64,
        connection: &Connection,
    ) -> i64 {
        create_category(
            NewCategoryData {
                name: name.to_string(),
                description: None,
                parent_id,
                display_order: Some(display_order),
                is_active: None,
            },
            connection,
        )
        .expect("Could not create test category")
        .id
    }

    #[test]
    fn tree_sorts_roots_by_display_order_then_name() {
        let connection = get_test_db_connection();
        create_node("Beta", None, 1, &connection);
        create_node("Alpha", None, 1, &connection);
        create_node("Zebra", None, 2, &connection);

        let tree = build_category_tree(&connection).unwrap();

        let names: Vec<_> = tree
            .iter()
            .map(|node| node.category.name.as_ref().to_owned())
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Zebra"]);
    }

    #[test]
    fn tree_nests_children_under_their_parents() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, 0, &connection);
        let backend = create_node("Backend", Some(engineering), 1, &connection);
        create_node("Rust", Some(backend), 0, &connection);
        create_node("Frontend", Some(engineering), 0, &connection);

        let tree = build_category_tree(&connection).unwrap();

        assert_eq!(tree.len(), 1);
        let engineering_node = &tree[0];
        let child_names: Vec<_> = engineering_node
            .children
            .iter()
            .map(|node| node.category.name.as_ref().to_owned())
            .collect();
        assert_eq!(child_names, vec!["Frontend", "Backend"]);
        assert_eq!(engineering_node.children[1].children.len(), 1);
        assert_eq!(
            engineering_node.children[1].children[0].category.name.as_ref(),
            "Rust"
        );
    }

    #[test]
    fn tree_of_empty_collection_is_empty() {
        let connection = get_test_db_connection();

        let tree = build_category_tree(&connection).unwrap();

        assert!(tree.is_empty());
    }

    #[test]
    fn get_category_path_returns_names_from_root() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, 0, &connection);
        let backend = create_node("Backend", Some(engineering), 0, &connection);

        let path = get_category_path(backend, &connection).unwrap();

        assert_eq!(path, vec!["Engineering".to_string(), "Backend".to_string()]);
    }

    #[test]
    fn find_by_path_matches_exact_path() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, 0, &connection);
        let backend = create_node("Backend", Some(engineering), 0, &connection);

        let found = find_by_path(
            &["Engineering".to_string(), "Backend".to_string()],
            &connection,
        )
        .unwrap();

        assert_eq!(found.map(|category| category.id), Some(backend));
    }

    #[test]
    fn find_by_path_returns_none_for_partial_match() {
        let connection = get_test_db_connection();
        let engineering = create_node("Engineering", None, 0, &connection);
        create_node("Backend", Some(engineering), 0, &connection);

        let found = find_by_path(&["Backend".to_string()], &connection).unwrap();

        assert_eq!(found, None);
    }
}
