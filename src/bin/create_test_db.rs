use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use vacanteer::{
    category::{NewCategoryData, create_category, db::set_vacancy_counts},
    initialize_db,
};

/// A utility for creating a test database for the category API server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let connection = Connection::open(output_path)?;

    initialize_db(&connection)?;

    println!("Creating test taxonomy...");

    let engineering = create_root("Engineering", 0, &connection)?;
    let backend = create_child("Backend", engineering, 0, &connection)?;
    create_child("Rust", backend, 0, &connection)?;
    create_child("Go", backend, 1, &connection)?;
    create_child("Frontend", engineering, 1, &connection)?;

    let sales = create_root("Sales", 1, &connection)?;
    create_child("Account Management", sales, 0, &connection)?;

    // Fake counts so the demo tree is not all zeroes; in production the
    // vacancy subsystem maintains these.
    set_vacancy_counts(backend, 3, 5, &connection)?;
    set_vacancy_counts(sales, 1, 1, &connection)?;

    println!("Success!");

    Ok(())
}

fn create_root(
    name: &str,
    display_order: i64,
    connection: &Connection,
) -> Result<i64, vacanteer::Error> {
    Ok(create_category(
        NewCategoryData {
            name: name.to_string(),
            description: None,
            parent_id: None,
            display_order: Some(display_order),
            is_active: None,
        },
        connection,
    )?
    .id)
}

fn create_child(
    name: &str,
    parent_id: i64,
    display_order: i64,
    connection: &Connection,
) -> Result<i64, vacanteer::Error> {
    Ok(create_category(
        NewCategoryData {
            name: name.to_string(),
            description: None,
            parent_id: Some(parent_id),
            display_order: Some(display_order),
            is_active: None,
        },
        connection,
    )?
    .id)
}
