//! Application router configuration for the category API.

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::{
    AppState,
    category::{
        autocomplete_categories_endpoint, category_by_path_endpoint, category_path_endpoint,
        category_tree_endpoint, create_category_endpoint, delete_category_endpoint,
        get_category_endpoint, list_categories_endpoint, move_category_endpoint,
        update_category_endpoint,
    },
    endpoints,
    logging::logging_middleware,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::CATEGORIES,
            post(create_category_endpoint).get(list_categories_endpoint),
        )
        .route(endpoints::CATEGORY_TREE, get(category_tree_endpoint))
        .route(
            endpoints::CATEGORY_AUTOCOMPLETE,
            get(autocomplete_categories_endpoint),
        )
        .route(endpoints::CATEGORY_BY_PATH, get(category_by_path_endpoint))
        .route(
            endpoints::CATEGORY,
            get(get_category_endpoint)
                .put(update_category_endpoint)
                .delete(delete_category_endpoint),
        )
        .route(endpoints::CATEGORY_PATH, get(category_path_endpoint))
        .route(endpoints::CATEGORY_PARENT, put(move_category_endpoint))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

#[cfg(test)]
mod router_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        AppState,
        category::{Category, CategoryNode},
        endpoints::{self, format_endpoint},
    };

    use super::build_router;

    fn get_test_server() -> TestServer {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        let state = AppState::new(connection).expect("Could not create app state");

        TestServer::try_new(build_router(state)).expect("Could not create test server")
    }

    #[tokio::test]
    async fn create_and_fetch_category() {
        let server = get_test_server();

        let response = server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "Engineering" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: Category = response.json();

        let response = server
            .get(&format_endpoint(endpoints::CATEGORY, created.id))
            .await;
        response.assert_status_ok();
        let fetched: Category = response.json();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn move_category_and_read_tree() {
        let server = get_test_server();

        let engineering: Category = server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "Engineering" }))
            .await
            .json();
        let backend: Category = server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "Backend" }))
            .await
            .json();

        let response = server
            .put(&format_endpoint(endpoints::CATEGORY_PARENT, backend.id))
            .json(&json!({ "parent_id": engineering.id }))
            .await;
        response.assert_status_ok();

        let tree: Vec<CategoryNode> = server.get(endpoints::CATEGORY_TREE).await.json();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].category.id, engineering.id);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].category.id, backend.id);
    }

    #[tokio::test]
    async fn delete_category_with_strategy_query_param() {
        let server = get_test_server();

        let engineering: Category = server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "Engineering" }))
            .await
            .json();
        server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "Backend", "parent_id": engineering.id }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .delete(&format_endpoint(endpoints::CATEGORY, engineering.id))
            .add_query_param("strategy", "cascade")
            .await;
        response.assert_status(StatusCode::NO_CONTENT);

        let remaining: Vec<Category> = server.get(endpoints::CATEGORIES).await.json();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn lookup_category_by_path() {
        let server = get_test_server();

        let engineering: Category = server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "Engineering" }))
            .await
            .json();
        let backend: Category = server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "Backend", "parent_id": engineering.id }))
            .await
            .json();

        let response = server
            .get(endpoints::CATEGORY_BY_PATH)
            .add_query_param("path", "Engineering.Backend")
            .await;
        response.assert_status_ok();
        let found: Option<Category> = response.json();
        assert_eq!(found.map(|category| category.id), Some(backend.id));
    }

    #[tokio::test]
    async fn unknown_category_returns_404_with_json_error() {
        let server = get_test_server();

        let response = server
            .get(&format_endpoint(endpoints::CATEGORY, 999999))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json();
        assert!(body["error"].is_string());
    }
}
