use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use pocket_ledger::db::{latest_version, migrate_to};

/// A utility for creating a ledger database at an older schema version.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The schema version to stop at.
    #[arg(long, short, default_value_t = 1)]
    schema_version: u32,
}

/// Create and populate a database for manual testing of schema upgrades.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'ledger.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'ledger.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    if args.schema_version == 0 || args.schema_version > latest_version() {
        eprintln!(
            "Schema version must be between 1 and {} (got {}).",
            latest_version(),
            args.schema_version
        );
        exit(1);
    }

    println!(
        "Creating database at {output_path:#?} with schema version {}",
        args.schema_version
    );
    let mut conn = Connection::open(output_path)?;

    migrate_to(&mut conn, args.schema_version)?;

    println!("Creating sample transactions...");

    let sample_transactions = [
        (
            3200.0,
            "Salary",
            1_735_725_600_000_i64,
            "January pay",
            "INCOME",
            "Bank transfer",
        ),
        (
            1500.0,
            "Rent",
            1_735_812_000_000,
            "",
            "EXPENSE",
            "Bank transfer",
        ),
        (
            54.2,
            "Food",
            1_735_898_400_000,
            "Groceries",
            "EXPENSE",
            "Card",
        ),
        (
            12.5,
            "Transport",
            1_735_898_400_000,
            "Bus pass top up",
            "EXPENSE",
            "Cash",
        ),
    ];

    for (amount, category, date, note, kind, payment_method) in sample_transactions {
        conn.execute(
            "INSERT INTO transactions (amount, category, date, note, type, paymentMethod)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (amount, category, date, note, kind, payment_method),
        )?;
    }

    if args.schema_version >= 3 {
        println!("Creating sample debts and savings goals...");

        conn.execute(
            "INSERT INTO debts (name, amount, dueDate, type) VALUES (?1, ?2, ?3, ?4)",
            ("Sam", 40.0, 1_738_360_800_000_i64, "OWED"),
        )?;
        conn.execute(
            "INSERT INTO savings_goals (name, targetAmount, currentAmount) VALUES (?1, ?2, ?3)",
            ("Holiday", 2000.0, 350.0),
        )?;
    }

    println!("Success!");

    Ok(())
}
