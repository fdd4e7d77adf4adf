//! Defines the app level error type and its conversion to JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::category::CategoryId;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested category was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the category has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested category could not be found")]
    NotFound,

    /// The parent category referenced by an operation does not exist.
    #[error("the parent category with ID {0} could not be found")]
    ParentNotFound(CategoryId),

    /// An empty or whitespace-only string was used as a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// A category name exceeded the maximum length.
    #[error("Category name cannot be longer than {0} characters")]
    CategoryNameTooLong(usize),

    /// A category description exceeded the maximum length.
    #[error("Category description cannot be longer than {0} characters")]
    DescriptionTooLong(usize),

    /// A category was asked to become its own parent.
    #[error("a category cannot be its own parent")]
    SelfParent,

    /// Moving a category under one of its own descendants was requested.
    #[error("moving category {0} under category {1} would create a circular reference")]
    CircularReference(CategoryId, CategoryId),

    /// Deleting the category would orphan vacancy assignments.
    ///
    /// The vacancy subsystem owns the assignments; callers must reassign or
    /// remove them before the category can be deleted.
    #[error("category {0} has {1} vacancies assigned and cannot be deleted")]
    CategoryHasVacancies(CategoryId, i64),

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// An error occurred while serializing or deserializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = match self {
            Error::NotFound
            | Error::ParentNotFound(_)
            | Error::UpdateMissingCategory
            | Error::DeleteMissingCategory => StatusCode::NOT_FOUND,
            Error::EmptyCategoryName
            | Error::CategoryNameTooLong(_)
            | Error::DescriptionTooLong(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::SelfParent
            | Error::CircularReference(_, _)
            | Error::CategoryHasVacancies(_, _) => StatusCode::CONFLICT,
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "an internal error occurred" })),
                )
                    .into_response();
            }
        };

        (status_code, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
