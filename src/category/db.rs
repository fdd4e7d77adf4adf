//! Database operations for categories.
//!
//! The category table is a flat collection with parent pointers and a
//! materialized path per row. Subtree queries walk `parent_id` with a
//! recursive CTE rather than matching on `path_string` prefixes, so names
//! containing `.` cannot cause a row to be mistaken for a descendant.

use rusqlite::{Connection, OptionalExtension, Row, types::Type};
use time::OffsetDateTime;

use crate::{
    Error,
    category::{Category, CategoryId, CategoryName, join_path},
};

/// The columns of the category table in [map_row] order.
const CATEGORY_COLUMNS: &str = "id, name, description, parent_id, path, path_string, level, \
    is_active, display_order, child_count, vacancy_count, total_vacancy_count, \
    created_at, updated_at";

/// The stored fields of a category row, minus the ID which SQLite assigns.
///
/// Tree operations compute the derived fields (`path`, `level`) before
/// insertion; the path string and the zeroed counters are filled in here.
pub struct InsertCategory {
    /// The validated display name.
    pub name: CategoryName,
    /// An optional free-text description.
    pub description: Option<String>,
    /// The parent category, or `None` for a root.
    pub parent_id: Option<CategoryId>,
    /// The names of the categories from the root down to this one.
    pub path: Vec<String>,
    /// The depth of the category, root = 0.
    pub level: i64,
    /// Whether the category is visible.
    pub is_active: bool,
    /// The sort key among siblings.
    pub display_order: i64,
    /// The creation timestamp, also used as the initial `updated_at`.
    pub created_at: OffsetDateTime,
}

/// Insert a category row and return the stored category with its generated ID.
pub fn insert_category(
    category: InsertCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    let path_json = encode_path(&category.path)?;
    let path_string = join_path(&category.path);

    connection.execute(
        "INSERT INTO category (name, description, parent_id, path, path_string, level, \
            is_active, display_order, child_count, vacancy_count, total_vacancy_count, \
            created_at, updated_at) \
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, 0, ?9, ?9);",
        (
            category.name.as_ref(),
            &category.description,
            category.parent_id,
            &path_json,
            &path_string,
            category.level,
            category.is_active,
            category.display_order,
            category.created_at,
        ),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        name: category.name,
        description: category.description,
        parent_id: category.parent_id,
        path: category.path,
        path_string,
        level: category.level,
        is_active: category.is_active,
        display_order: category.display_order,
        child_count: 0,
        vacancy_count: 0,
        total_vacancy_count: 0,
        created_at: category.created_at,
        updated_at: category.created_at,
    })
}

/// Retrieve a single category by ID.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category WHERE id = :id;"
        ))?
        .query_row(&[(":id", &category_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve all categories ordered by `(display_order, name)`.
///
/// The ordering makes siblings come out in display order when the flat list
/// is grouped by parent during tree assembly.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category ORDER BY display_order ASC, name ASC;"
        ))?
        .query_map([], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the direct children of a category ordered by `(display_order, name)`.
pub fn get_children(
    parent_id: CategoryId,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category WHERE parent_id = :parent_id \
                ORDER BY display_order ASC, name ASC;"
        ))?
        .query_map(&[(":parent_id", &parent_id)], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Retrieve every descendant of a category, parents before children.
///
/// The `level ASC` ordering guarantees that iterating forwards visits a node
/// before any of its descendants, and iterating backwards visits children
/// before their parents (post-order for cascade deletion).
pub fn get_descendants(
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(&format!(
            "WITH RECURSIVE subtree(id) AS ( \
                SELECT id FROM category WHERE parent_id = :id \
                UNION ALL \
                SELECT category.id FROM category \
                    JOIN subtree ON category.parent_id = subtree.id \
            ) \
            SELECT {CATEGORY_COLUMNS} FROM category \
                WHERE id IN (SELECT id FROM subtree) ORDER BY level ASC, id ASC;"
        ))?
        .query_map(&[(":id", &category_id)], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Persist the mutable fields of a category.
///
/// Writes name, description, parent, path, level, visibility, display order
/// and `updated_at` for the row with the category's ID. Counters are written
/// only through [adjust_child_count] and [set_vacancy_counts].
pub fn save_category(category: &Category, connection: &Connection) -> Result<(), Error> {
    let path_json = encode_path(&category.path)?;

    let rows_affected = connection.execute(
        "UPDATE category SET name = ?1, description = ?2, parent_id = ?3, path = ?4, \
            path_string = ?5, level = ?6, is_active = ?7, display_order = ?8, updated_at = ?9 \
            WHERE id = ?10;",
        (
            category.name.as_ref(),
            &category.description,
            category.parent_id,
            &path_json,
            &category.path_string,
            category.level,
            category.is_active,
            category.display_order,
            category.updated_at,
            category.id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(())
}

/// Rewrite the materialized paths of every descendant of `ancestor`.
///
/// `old_prefix_length` is the length of the ancestor's path before it
/// changed; each descendant keeps its trailing segments beyond that prefix
/// and has them re-rooted under the ancestor's new path. `level_delta` is
/// the amount the ancestor's own level shifted (zero for a rename).
///
/// Each descendant is persisted with a separate statement; a failure
/// mid-loop leaves the remaining descendants on the old prefix.
pub(crate) fn rewrite_descendant_paths(
    ancestor: &Category,
    old_prefix_length: usize,
    level_delta: i64,
    connection: &Connection,
) -> Result<(), Error> {
    for mut descendant in get_descendants(ancestor.id, connection)? {
        let trailing_segments = descendant.path.split_off(old_prefix_length);
        descendant.path = ancestor.path.clone();
        descendant.path.extend(trailing_segments);
        descendant.path_string = join_path(&descendant.path);
        descendant.level += level_delta;

        save_category(&descendant, connection)?;
    }

    Ok(())
}

/// Delete a category row by ID. Returns an error if the category doesn't exist.
pub fn delete_category_row(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM category WHERE id = ?1;", [category_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

/// Apply a delta to a category's direct-child counter.
///
/// This is the single write path for `child_count`: create, move and delete
/// call it explicitly instead of scattering counter side effects. The write
/// is a separate statement from the structural change it accompanies, so a
/// failure in between leaves the counter stale (there is no rollback).
pub fn adjust_child_count(
    category_id: CategoryId,
    delta: i64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE category SET child_count = child_count + ?1 WHERE id = ?2;",
        (delta, category_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Overwrite a category's vacancy counters.
///
/// This is the write-side hook for the vacancy subsystem, which owns both
/// counters; tree operations never call it.
pub fn set_vacancy_counts(
    category_id: CategoryId,
    vacancy_count: i64,
    total_vacancy_count: i64,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE category SET vacancy_count = ?1, total_vacancy_count = ?2 WHERE id = ?3;",
        (vacancy_count, total_vacancy_count, category_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Sum the direct vacancy counts over a category and all of its descendants.
pub fn subtree_vacancy_count(
    category_id: CategoryId,
    connection: &Connection,
) -> Result<i64, Error> {
    connection
        .prepare(
            "WITH RECURSIVE subtree(id) AS ( \
                SELECT :id \
                UNION ALL \
                SELECT category.id FROM category \
                    JOIN subtree ON category.parent_id = subtree.id \
            ) \
            SELECT COALESCE(SUM(vacancy_count), 0) FROM category \
                WHERE id IN (SELECT id FROM subtree);",
        )?
        .query_row(&[(":id", &category_id)], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Look up an active category by its exact path string, if one exists.
pub fn find_by_path_string(
    path_string: &str,
    connection: &Connection,
) -> Result<Option<Category>, Error> {
    connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category \
                WHERE path_string = :path_string AND is_active = 1;"
        ))?
        .query_row(&[(":path_string", &path_string)], map_row)
        .optional()
        .map_err(|error| error.into())
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            parent_id INTEGER REFERENCES category(id),
            path TEXT NOT NULL,
            path_string TEXT NOT NULL,
            level INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            display_order INTEGER NOT NULL DEFAULT 0,
            child_count INTEGER NOT NULL DEFAULT 0,
            vacancy_count INTEGER NOT NULL DEFAULT 0,
            total_vacancy_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_category_parent_id ON category(parent_id);
        CREATE INDEX IF NOT EXISTS idx_category_path_string ON category(path_string);",
    )?;

    Ok(())
}

fn encode_path(path: &[String]) -> Result<String, Error> {
    serde_json::to_string(path).map_err(|error| Error::JSONSerializationError(error.to_string()))
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(1)?;
    let raw_path: String = row.get(4)?;
    let path: Vec<String> = serde_json::from_str(&raw_path)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(error)))?;

    Ok(Category {
        id: row.get(0)?,
        name: CategoryName::new_unchecked(&raw_name),
        description: row.get(2)?,
        parent_id: row.get(3)?,
        path,
        path_string: row.get(5)?,
        level: row.get(6)?,
        is_active: row.get(7)?,
        display_order: row.get(8)?,
        child_count: row.get(9)?,
        vacancy_count: row.get(10)?,
        total_vacancy_count: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}
