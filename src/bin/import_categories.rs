use std::error::Error;
use std::fs::File;

use clap::Parser;
use rusqlite::Connection;
use serde::Deserialize;

use vacanteer::{
    category::{CategoryId, NewCategoryData, create_category, find_by_path},
    initialize_db,
};

/// A utility for importing a category hierarchy from a CSV file.
///
/// Each row names a category by its dot-joined path; missing ancestors are
/// created on the fly with default attributes. Rows whose path already
/// exists are skipped.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the CSV file with columns: path, description, display_order, is_active.
    #[arg(long)]
    csv_path: String,

    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,
}

/// One row of the import file.
#[derive(Debug, Deserialize)]
struct CategoryRecord {
    path: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    display_order: Option<i64>,
    #[serde(default)]
    is_active: Option<bool>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let connection = Connection::open(&args.db_path)?;
    initialize_db(&connection)?;

    let file = File::open(&args.csv_path)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut created = 0;
    let mut skipped = 0;

    for record in reader.deserialize() {
        let record: CategoryRecord = record?;

        let segments: Vec<String> = record.path.split('.').map(str::to_string).collect();

        if find_by_path(&segments, &connection)?.is_some() {
            skipped += 1;
            continue;
        }

        let (ancestors, leaf) = match segments.split_last() {
            Some((leaf, ancestors)) => (ancestors, leaf),
            None => continue,
        };

        let parent_id = ensure_ancestors(ancestors, &connection)?;

        create_category(
            NewCategoryData {
                name: leaf.to_string(),
                description: record.description,
                parent_id,
                display_order: record.display_order,
                is_active: record.is_active,
            },
            &connection,
        )?;
        created += 1;
    }

    println!("Imported {created} categories ({skipped} already present).");

    Ok(())
}

/// Walk the ancestor names from the root, creating any that do not exist,
/// and return the ID of the last one.
fn ensure_ancestors(
    ancestors: &[String],
    connection: &Connection,
) -> Result<Option<CategoryId>, vacanteer::Error> {
    let mut parent_id = None;
    let mut prefix = Vec::new();

    for name in ancestors {
        prefix.push(name.clone());

        parent_id = match find_by_path(&prefix, connection)? {
            Some(category) => Some(category.id),
            None => Some(
                create_category(
                    NewCategoryData {
                        name: name.clone(),
                        description: None,
                        parent_id,
                        display_order: None,
                        is_active: None,
                    },
                    connection,
                )?
                .id,
            ),
        };
    }

    Ok(parent_id)
}
