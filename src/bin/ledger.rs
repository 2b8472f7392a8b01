use std::{fs::OpenOptions, io, path::PathBuf, process::exit, sync::Arc, time::Duration};

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use time::{Date, Month, macros::format_description};
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use pocket_ledger::{
    BudgetStatus, Category, CategoryData, CategoryName, Color, Error, HttpLedgerClient, Ledger,
    LedgerConfig, ListQuery, ListingState, LoginCredentials, NewUser, PageSize,
    SqliteSessionStore, Transaction, TransactionData, TransactionFilter, TransactionType,
    currency, login, logout, register,
};

/// A command line client for a Pocket Ledger server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The base URL of the ledger API.
    #[arg(long, env = "LEDGER_BASE_URL", default_value = "http://localhost:8000/api/")]
    base_url: String,

    /// File path to the SQLite database that holds the session.
    #[arg(long, env = "LEDGER_SESSION_DB", default_value = "ledger_session.db")]
    session_db: PathBuf,

    /// How many seconds to wait for the server before giving up.
    #[arg(long, env = "LEDGER_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and remember the session.
    Login {
        /// The email address of the account.
        #[arg(long)]
        email: String,
    },
    /// Forget the stored session.
    Logout,
    /// Create a new account.
    Register {
        /// Your display name.
        #[arg(long)]
        name: String,
        /// A unique username.
        #[arg(long)]
        username: String,
        /// The email address to log in with.
        #[arg(long)]
        email: String,
    },
    /// List transactions.
    Transactions {
        #[command(flatten)]
        page: PageArgs,
        /// Only show expenses or only income.
        #[arg(long = "type")]
        transaction_type: Option<TransactionType>,
        /// Only show transactions in this category.
        #[arg(long)]
        category: Option<i64>,
        /// Only show transactions on this date (YYYY-MM-DD).
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
    },
    /// List categories.
    Categories {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Record a new transaction.
    AddTransaction(TransactionArgs),
    /// Replace an existing transaction.
    EditTransaction {
        /// The ID of the transaction.
        id: i64,
        #[command(flatten)]
        transaction: TransactionArgs,
    },
    /// Delete a transaction.
    DeleteTransaction {
        /// The ID of the transaction.
        id: i64,
    },
    /// Create a category.
    AddCategory {
        /// The name of the category.
        #[arg(long)]
        name: String,
        /// The display colour as #RRGGBB.
        #[arg(long, value_parser = parse_color)]
        color: Option<Color>,
        /// The most to spend in this category per month.
        #[arg(long)]
        limit: Option<Decimal>,
    },
    /// Delete a category. Its transactions are kept without a category.
    DeleteCategory {
        /// The ID of the category.
        id: i64,
    },
    /// Show spending against each category's monthly limit.
    Budget {
        /// Only count expenses in this month (YYYY-MM).
        #[arg(long, value_parser = parse_month)]
        month: Option<(i32, Month)>,
        /// Use the server's summary instead of adding up transactions.
        #[arg(long, conflicts_with = "month")]
        from_summary: bool,
    },
    /// Show total income, expenses and the balance.
    Summary,
    /// Suggest categories for a transaction description.
    Suggest {
        /// The description of the transaction.
        description: String,
    },
}

#[derive(Args, Debug)]
struct PageArgs {
    /// The page to show.
    #[arg(long, default_value_t = 1)]
    page: u64,
    /// How many items per page: 10, 20, 50 or 100.
    #[arg(long, value_parser = parse_page_size, default_value = "20")]
    page_size: PageSize,
}

#[derive(Args, Debug)]
struct TransactionArgs {
    /// What the transaction was for.
    #[arg(long)]
    description: String,
    /// The amount, always positive.
    #[arg(long)]
    value: Decimal,
    /// Either "expense" or "income".
    #[arg(long = "type")]
    transaction_type: TransactionType,
    /// When the transaction happened (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    date: Date,
    /// The ID of the category.
    #[arg(long)]
    category: Option<i64>,
}

impl TransactionArgs {
    fn into_data(self) -> Result<TransactionData, Error> {
        Ok(TransactionData::new(
            &self.description,
            self.value,
            self.transaction_type,
            self.date,
        )?
        .category(self.category))
    }
}

#[tokio::main]
async fn main() {
    setup_logging();

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        print_error(describe(&error));
        exit(1);
    }
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(filter::LevelFilter::INFO);

    let debug_log = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .map(|log_file| {
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(Arc::new(log_file))
                .with_filter(filter::LevelFilter::DEBUG)
        })
        .ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_log)
        .with(debug_log)
        .init();
}

async fn run(cli: Cli) -> Result<(), Error> {
    let config = LedgerConfig {
        base_url: cli.base_url,
        request_timeout: Duration::from_secs(cli.timeout_secs),
        ..Default::default()
    };
    let session = Arc::new(SqliteSessionStore::open(&cli.session_db)?);
    let ledger = Ledger::connect(&config, session)?;
    let client: &HttpLedgerClient<SqliteSessionStore> = ledger.api();

    match cli.command {
        Command::Login { email } => {
            let Some(password) = prompt_password("Password: ") else {
                return Ok(());
            };
            login(client, &LoginCredentials { email, password }).await?;
            println!("Logged in.");
        }
        Command::Logout => {
            logout(client).await?;
            println!("Logged out.");
        }
        Command::Register {
            name,
            username,
            email,
        } => {
            let Some(password) = prompt_password("Choose a password: ") else {
                return Ok(());
            };
            let Some(confirm_password) = prompt_password("Enter the same password again: ")
            else {
                return Ok(());
            };
            let user = NewUser {
                name,
                username,
                email,
                password,
                confirm_password,
            };
            register(client, &user).await?;
            println!("Registered {}, you can now log in.", user.username);
        }
        Command::Transactions {
            page,
            transaction_type,
            category,
            date,
        } => {
            let engine = ledger.transactions();
            engine
                .open(ListQuery {
                    page_number: page.page,
                    page_size: page.page_size,
                    filter: TransactionFilter::any()
                        .transaction_type(transaction_type)
                        .category(category)
                        .date(date),
                })
                .await;
            print_listing(engine.state(), print_transaction)?;
        }
        Command::Categories { page } => {
            let engine = ledger.categories();
            engine
                .open(ListQuery {
                    page_number: page.page,
                    page_size: page.page_size,
                    filter: (),
                })
                .await;
            print_listing(engine.state(), print_category)?;
        }
        Command::AddTransaction(transaction) => {
            let created = ledger.create_transaction(transaction.into_data()?).await?;
            print!("Created ");
            print_transaction(&created);
        }
        Command::EditTransaction { id, transaction } => {
            let updated = ledger
                .update_transaction(id, transaction.into_data()?)
                .await?;
            print!("Updated ");
            print_transaction(&updated);
        }
        Command::DeleteTransaction { id } => {
            ledger.delete_transaction(id).await?;
            println!("Deleted transaction #{id}.");
        }
        Command::AddCategory { name, color, limit } => {
            let mut data = CategoryData::new(CategoryName::new(&name)?).monthly_limit(limit);
            if let Some(color) = color {
                data = data.color(color);
            }
            let created = ledger.create_category(data).await?;
            print!("Created ");
            print_category(&created);
        }
        Command::DeleteCategory { id } => {
            ledger.delete_category(id).await?;
            println!("Deleted category #{id}.");
        }
        Command::Budget {
            month,
            from_summary,
        } => {
            let statuses = if from_summary {
                ledger.budget_statuses_from_summary().await?
            } else {
                ledger.budget_statuses(month).await?
            };
            let categories = ledger.categories();
            categories.set_page_size(PageSize::MAX).await;
            let names = categories.page().map(|page| page.items).unwrap_or_default();
            for status in &statuses {
                print_budget_status(status, &names);
            }
        }
        Command::Summary => {
            let summary = ledger.summary().await?;
            println!("Income:   {:>14}", currency(summary.total_income));
            println!("Expenses: {:>14}", currency(summary.total_expense));
            println!("Balance:  {:>14}", currency(summary.balance));
            for total in &summary.by_category {
                println!("  {:<20} {:>14}", total.name, currency(total.total));
            }
        }
        Command::Suggest { description } => {
            let suggestions = ledger
                .suggester()
                .suggest(&description)
                .await?
                .unwrap_or_default();
            if suggestions.is_empty() {
                println!("No suggestions.");
            }
            for suggestion in suggestions {
                println!("{suggestion}");
            }
        }
    }

    Ok(())
}

fn print_listing<R: pocket_ledger::Record>(
    state: ListingState<R>,
    print_item: fn(&R),
) -> Result<(), Error> {
    match state {
        ListingState::Ready { page, .. } => {
            if page.is_empty() {
                println!("Nothing to show.");
            }
            for item in &page.items {
                print_item(item);
            }
            println!(
                "Page {} of {} ({} total)",
                page.page_number,
                page.total_pages(),
                page.total_count
            );
            Ok(())
        }
        ListingState::Failed { error, .. } => Err(error),
        ListingState::Idle | ListingState::Loading { .. } => Ok(()),
    }
}

fn print_transaction(transaction: &Transaction) {
    let category = transaction
        .category_name
        .clone()
        .or_else(|| transaction.category_id.map(|id| format!("#{id}")))
        .unwrap_or_else(|| "-".to_owned());

    println!(
        "#{:<6} {} {:<30} {:>14} {:<8} {}",
        transaction.id,
        transaction.date,
        transaction.description,
        currency(transaction.signed_value()),
        transaction.transaction_type,
        category
    );
}

fn print_category(category: &Category) {
    let limit = category
        .monthly_limit
        .map(currency)
        .unwrap_or_else(|| "no limit".to_owned());
    let color = category
        .color
        .as_ref()
        .map(Color::to_string)
        .unwrap_or_default();

    println!("#{:<6} {:<20} {:>14} {color}", category.id, category.name, limit);
}

fn print_budget_status(status: &BudgetStatus, categories: &[Category]) {
    let name = categories
        .iter()
        .find(|category| category.id == status.category_id)
        .map(|category| category.name.to_string())
        .unwrap_or_else(|| format!("#{}", status.category_id));

    match (status.limit, status.ratio) {
        (Some(limit), Some(ratio)) => {
            let marker = if status.exceeded { " OVER" } else { "" };
            println!(
                "{name:<20} {:>14} of {:>14} ({:.0}%){marker}",
                currency(status.spent),
                currency(limit),
                ratio * Decimal::ONE_HUNDRED
            );
        }
        _ => println!("{name:<20} {:>14} (no limit)", currency(status.spent)),
    }
}

fn prompt_password(prompt: &str) -> Option<String> {
    match rpassword::prompt_password(prompt) {
        Ok(password) => Some(password),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => None,
        Err(error) => {
            print_error(format!("Could not read password from stdin: {error}"));
            None
        }
    }
}

fn describe(error: &Error) -> String {
    if error.is_unauthorized() {
        return "Your session has expired, log in again.".to_owned();
    }

    match error.field_errors() {
        Some(fields) => fields
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
            .collect::<Vec<_>>()
            .join("\n"),
        None if error.is_retryable() => format!("{error}. Please try again."),
        None => error.to_string(),
    }
}

fn parse_date(text: &str) -> Result<Date, String> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map_err(|error| format!("expected a date like 2025-06-30: {error}"))
}

fn parse_month(text: &str) -> Result<(i32, Month), String> {
    let invalid = || format!("expected a month like 2025-06, got \"{text}\"");
    let (year, month) = text.split_once('-').ok_or_else(invalid)?;
    let year = year.parse::<i32>().map_err(|_| invalid())?;
    let month = month
        .parse::<u8>()
        .ok()
        .and_then(|month| Month::try_from(month).ok())
        .ok_or_else(invalid)?;

    Ok((year, month))
}

fn parse_page_size(text: &str) -> Result<PageSize, String> {
    let size = text.parse::<u64>().map_err(|error| error.to_string())?;
    PageSize::try_from(size).map_err(|error| error.to_string())
}

fn parse_color(text: &str) -> Result<Color, String> {
    Color::new(text).map_err(|error| error.to_string())
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
