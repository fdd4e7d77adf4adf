#![allow(missing_docs)]

use axum::response::Response;
use serde::de::DeserializeOwned;

/// Read a response body to completion and parse it as JSON.
pub(crate) async fn parse_json_body<T: DeserializeOwned>(response: Response) -> T {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not read response body");

    serde_json::from_slice(&body_bytes).expect("Could not parse response body as JSON")
}
