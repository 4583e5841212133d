use std::{error::Error, path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use time::{
    Date, OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};

use pocket_ledger::{
    Debt, DebtDirection, Frequency, LedgerConfig, LedgerFacade, LedgerStore, SavingsGoal,
    SessionToken, Tags, Transaction, TransactionKind,
    dashboard::Report,
    logging::setup_logging,
    mirror::{HttpRemoteLedger, InMemoryRemoteLedger, RemoteLedger, SyncMirror},
    settings::{Settings, SettingsStore},
};

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Record and review household finances from the command line.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the ledger SQLite database.
    #[arg(long, env = "LEDGER_DB_PATH")]
    db_path: PathBuf,

    /// URL of the remote collection new transactions are mirrored to.
    #[arg(long, env = "LEDGER_REMOTE_URL")]
    remote_url: Option<String>,

    /// Seconds to wait for the remote before abandoning a mirror attempt.
    #[arg(long, env = "LEDGER_MIRROR_TIMEOUT", default_value_t = 10)]
    mirror_timeout: u64,

    /// JSON file mapping categories to budget limits, e.g. {"Food": 500}.
    #[arg(long, env = "LEDGER_BUDGET_LIMITS")]
    budget_limits: Option<PathBuf>,

    /// JSON settings file, used for the currency symbol.
    #[arg(long, env = "LEDGER_SETTINGS")]
    settings: Option<PathBuf>,

    /// Also append debug logs to this file.
    #[arg(long, env = "LEDGER_DEBUG_LOG")]
    debug_log: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record an income or expense.
    AddTransaction {
        /// The amount, always positive.
        #[arg(long)]
        amount: f64,
        /// INCOME or EXPENSE.
        #[arg(long)]
        kind: TransactionKind,
        /// A label such as "Food" or "Salary".
        #[arg(long)]
        category: String,
        /// The date in YYYY-MM-DD format, defaults to now.
        #[arg(long)]
        date: Option<String>,
        /// A free text note.
        #[arg(long, default_value = "")]
        note: String,
        /// How the transaction was paid.
        #[arg(long, default_value = "")]
        payment_method: String,
        /// Comma separated tags.
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// WEEKLY or MONTHLY for a repeating transaction.
        #[arg(long)]
        recurrence: Option<Frequency>,
    },
    /// Record money owed by or to you.
    AddDebt {
        /// Who the debt is with.
        #[arg(long)]
        name: String,
        /// The amount owed.
        #[arg(long)]
        amount: f64,
        /// The due date in YYYY-MM-DD format.
        #[arg(long)]
        due: String,
        /// OWE if you owe the money, OWED if you are owed.
        #[arg(long)]
        direction: DebtDirection,
    },
    /// Start saving towards a goal.
    AddGoal {
        /// What you are saving for.
        #[arg(long)]
        name: String,
        /// The amount to save.
        #[arg(long)]
        target: f64,
        /// The amount already saved.
        #[arg(long, default_value_t = 0.0)]
        saved: f64,
    },
    /// Add to (or withdraw from) a savings goal.
    Contribute {
        /// The ID of the goal.
        #[arg(long)]
        id: i64,
        /// The amount to add, negative to withdraw.
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
    },
    /// List records.
    List {
        /// Which records to list.
        #[arg(value_enum, default_value_t = ListView::Transactions)]
        view: ListView,
    },
    /// Show totals, category shares and budget use.
    Report,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ListView {
    Transactions,
    Expenses,
    Income,
    Debts,
    Goals,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    setup_logging(args.debug_log.as_deref())?;

    let mut config = LedgerConfig::new(&args.db_path)
        .remote_url(args.remote_url.clone())
        .mirror_timeout(Duration::from_secs(args.mirror_timeout));
    if let Some(path) = &args.budget_limits {
        config = config.budget_limits_file(path)?;
    }

    let currency_symbol = match &args.settings {
        Some(path) => SettingsStore::open(path)?.current().currency_symbol,
        None => Settings::default().currency_symbol,
    };

    let store = LedgerStore::open(&config.db_path)?;

    match config.remote_url.clone() {
        Some(url) => {
            let mirror =
                SyncMirror::new(Arc::new(HttpRemoteLedger::new(url)), config.mirror_timeout);
            run(
                LedgerFacade::new(store, mirror),
                args.command,
                &config,
                &currency_symbol,
            )
            .await
        }
        None => {
            tracing::info!("no remote configured, new transactions will not be mirrored");
            let mirror =
                SyncMirror::new(Arc::new(InMemoryRemoteLedger::new()), config.mirror_timeout);
            run(
                LedgerFacade::new(store, mirror),
                args.command,
                &config,
                &currency_symbol,
            )
            .await
        }
    }
}

async fn run<R: RemoteLedger>(
    facade: LedgerFacade<R>,
    command: Command,
    config: &LedgerConfig,
    currency_symbol: &str,
) -> Result<(), Box<dyn Error>> {
    // The person at the terminal owns the database file.
    let session = SessionToken::valid_for("ledger-cli", time::Duration::minutes(5));

    match command {
        Command::AddTransaction {
            amount,
            kind,
            category,
            date,
            note,
            payment_method,
            tags,
            recurrence,
        } => {
            let occurred_at = match date {
                Some(date) => parse_date(&date)?,
                None => now(),
            };
            let builder = Transaction::build(amount, kind, &category, occurred_at)
                .note(&note)
                .payment_method(&payment_method)
                .tags(Tags::new(&tags)?)
                .recurrence(recurrence);

            let transaction = facade.add_transaction(&session, builder).await?;
            println!("Added transaction {}", transaction.id);
        }
        Command::AddDebt {
            name,
            amount,
            due,
            direction,
        } => {
            let debt = facade
                .add_debt(
                    &session,
                    Debt::build(&name, amount, parse_date(&due)?, direction),
                )
                .await?;
            println!("Added debt {}", debt.id);
        }
        Command::AddGoal {
            name,
            target,
            saved,
        } => {
            let goal = facade
                .add_savings_goal(
                    &session,
                    SavingsGoal::build(&name, target).current_amount(saved),
                )
                .await?;
            println!("Added savings goal {}", goal.id);
        }
        Command::Contribute { id, amount } => {
            let goal = facade
                .savings_goals()
                .next()
                .await?
                .iter()
                .find(|goal| goal.id == id)
                .cloned()
                .ok_or(pocket_ledger::Error::NotFound)?;

            let goal = facade
                .update_savings_goal(&session, goal.contribute(amount))
                .await?;
            println!(
                "{}: {currency_symbol}{:.2} of {currency_symbol}{:.2} ({:.0}%)",
                goal.name,
                goal.current_amount,
                goal.target_amount,
                goal.progress() * 100.0
            );
        }
        Command::List { view } => match view {
            ListView::Transactions => {
                print_transactions(&facade.all_transactions().next().await?, currency_symbol)
            }
            ListView::Expenses => {
                print_transactions(&facade.expenses().next().await?, currency_symbol)
            }
            ListView::Income => print_transactions(&facade.income().next().await?, currency_symbol),
            ListView::Debts => {
                for debt in facade.debts().next().await?.iter() {
                    println!(
                        "{:>4}  {}  {:<4}  {:<16} {currency_symbol}{:.2}",
                        debt.id,
                        debt.due_date.date(),
                        debt.direction,
                        debt.name,
                        debt.amount
                    );
                }
            }
            ListView::Goals => {
                for goal in facade.savings_goals().next().await?.iter() {
                    println!(
                        "{:>4}  {:<16} {currency_symbol}{:.2} / {currency_symbol}{:.2}  {:.0}%",
                        goal.id,
                        goal.name,
                        goal.current_amount,
                        goal.target_amount,
                        goal.progress() * 100.0
                    );
                }
            }
        },
        Command::Report => {
            let expenses = facade.expenses().next().await?;
            let income = facade.income().next().await?;

            print_report(
                &Report::from_snapshots(&expenses, &income, &config.budget_limits),
                currency_symbol,
            );
        }
    }

    facade.mirror().idle().await;

    Ok(())
}

fn print_transactions(transactions: &[Transaction], currency_symbol: &str) {
    for transaction in transactions {
        let tags: Vec<_> = transaction.tags.iter().collect();
        let recurrence = transaction
            .recurrence
            .map(|frequency| format!(" ({frequency})"))
            .unwrap_or_default();

        println!(
            "{:>4}  {}  {:<7}  {:<14} {currency_symbol}{:.2}{recurrence}  {}  [{}]  {}",
            transaction.id,
            transaction.occurred_at.date(),
            transaction.kind,
            transaction.category,
            transaction.amount,
            transaction.payment_method,
            tags.join(", "),
            transaction.note
        );
    }
}

fn print_report(report: &Report, currency_symbol: &str) {
    println!("Income:   {currency_symbol}{:.2}", report.total_income);
    println!("Expenses: {currency_symbol}{:.2}", report.total_expenses);
    println!("Balance:  {currency_symbol}{:.2}", report.net_balance);

    if !report.expense_shares.is_empty() {
        println!("\nExpenses by category:");
        for share in &report.expense_shares {
            let total = report.expense_totals.get(&share.category).unwrap_or(0.0);
            println!(
                "  {:<14} {currency_symbol}{total:.2}  {:.1}%",
                share.category, share.percentage
            );
        }
    }

    if !report.budget.is_empty() {
        println!("\nBudget:");
        for usage in &report.budget {
            let over = if usage.over_by > 0.0 {
                format!("  over by {currency_symbol}{:.2}", usage.over_by)
            } else {
                String::new()
            };
            println!(
                "  {:<14} {currency_symbol}{:.2} / {currency_symbol}{:.2}  {:.0}%{over}",
                usage.category,
                usage.spent,
                usage.limit,
                usage.ratio * 100.0
            );
        }
    }
}

fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(local_offset())
}

fn parse_date(text: &str) -> Result<OffsetDateTime, time::error::Parse> {
    Ok(Date::parse(text, DATE_FORMAT)?
        .midnight()
        .assume_offset(local_offset()))
}
