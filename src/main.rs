//! Spendbook CLI
//!
//! Command-line front end for the expense tracker:
//! - Sign in (password or magic link), sign up, sign out
//! - List, add and delete expenses
//! - Show the dashboard summary and the navigation tree
//! - Generate a default config file

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use spendbook::config::generate_default_config;
use spendbook::nav::render_tree;
use spendbook::views::CONFIRM_DELETE;
use spendbook::{
    AuthEvent, Config, DashboardView, Expense, ExpenseSummary, ExpensesView, FileStorage,
    LoggingConfig, LoginAction, LoginForm, LoginView, Route, SessionStore, SupabaseClient,
    NAV_ITEMS,
};

#[derive(Parser)]
#[command(name = "spendbook")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Personal expense tracker")]
#[command(long_about = "Spendbook keeps your expenses in your own Supabase project.\nSign in once; the session is kept between runs.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: <config dir>/spendbook/config.toml, then ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        email: String,
        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Email a sign-in link
    MagicLink { email: String },

    /// Create an account
    Signup {
        email: String,
        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// List expenses, newest first
    List,

    /// Add an expense
    Add {
        title: String,
        amount: String,
        #[arg(short, long)]
        category: Option<String>,
        /// Date as YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Delete an expense by id
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show totals per category and for the current month
    Dashboard,

    /// Print the navigation tree
    Nav,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that need no backend
    match &cli.command {
        Commands::Config { output } => return write_config(output.as_deref()),
        Commands::Nav => {
            for line in render_tree(NAV_ITEMS) {
                println!("{}", line);
            }
            return Ok(());
        }
        _ => {}
    }

    // The configured subscriber depends on the config, so loading logs through a provisional one
    let config = tracing::subscriber::with_default(bootstrap_subscriber(std::io::stderr), || {
        Config::load_default(cli.config.as_deref())
    })?;
    init_logging(&config.logging);
    config.validate()?;

    tracing::debug!(data_dir = %config.storage.data_dir, "Opening local storage");
    let storage = Arc::new(
        FileStorage::in_dir(Path::new(&config.storage.data_dir))
            .context("Failed to open local storage")?,
    );
    let backend = Arc::new(SupabaseClient::new(config.backend.clone(), storage.clone())?);
    let store = SessionStore::new(backend, storage);
    let mut events = store.initialize().await;

    let code = run(&cli, &store, &mut events).await?;
    store.apply_pending(&mut events);

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Run one command; returns the process exit code
async fn run(
    cli: &Cli,
    store: &SessionStore,
    events: &mut broadcast::Receiver<AuthEvent>,
) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Login { email, password } => {
            let password = match password {
                Some(p) => p.clone(),
                None => prompt("Password: ").await?,
            };
            login(store, events, LoginAction::SignIn, email, &password).await
        }

        Commands::MagicLink { email } => {
            login(store, events, LoginAction::MagicLink, email, "").await
        }

        Commands::Signup { email, password } => {
            let password = match password {
                Some(p) => p.clone(),
                None => prompt("Password: ").await?,
            };
            login(store, events, LoginAction::SignUp, email, &password).await
        }

        Commands::Logout => {
            let mut view = ExpensesView::new();
            view.logout(store).await;
            println!("Signed out");
            Ok(0)
        }

        Commands::Whoami => {
            let Some(user) = store.current_identity() else {
                println!("Not signed in");
                return Ok(1);
            };
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
                OutputFormat::Csv => {
                    let mut writer = csv::Writer::from_writer(std::io::stdout());
                    writer.serialize(&user)?;
                    writer.flush()?;
                }
                OutputFormat::Table => println!("{} ({})", user.email, user.id),
            }
            Ok(0)
        }

        Commands::List => {
            let mut view = ExpensesView::new();
            if view.activate(store).await == Some(Route::Login) {
                return Ok(not_signed_in());
            }
            if let Some(alert) = view.take_alert() {
                eprintln!("{}", alert);
                return Ok(1);
            }
            print_expenses(&view.expenses, cli.format)?;
            Ok(0)
        }

        Commands::Add {
            title,
            amount,
            category,
            date,
        } => {
            let mut view = ExpensesView::new();
            if view.activate(store).await == Some(Route::Login) {
                return Ok(not_signed_in());
            }
            let before = view.expenses.len();

            view.form.title = title.clone();
            view.form.amount = amount.clone();
            view.form.category = category.clone().unwrap_or_default();
            if let Some(date) = date {
                view.form.date = date.clone();
            }
            view.add(store).await;

            if !view.form_errors().is_empty() {
                for error in view.form_errors().iter() {
                    eprintln!("Invalid input: {}", error);
                }
                return Ok(2);
            }
            if let Some(alert) = view.take_alert() {
                eprintln!("{}", alert);
                return Ok(1);
            }
            println!("Added \"{}\" ({} expenses, was {})", title, view.expenses.len(), before);
            Ok(0)
        }

        Commands::Delete { id, yes } => {
            let mut view = ExpensesView::new();
            if view.activate(store).await == Some(Route::Login) {
                return Ok(not_signed_in());
            }

            let confirmed = *yes || confirm(CONFIRM_DELETE).await?;
            let before = view.expenses.len();
            view.remove(store, id, |_| confirmed).await;

            if !confirmed {
                println!("Cancelled");
                return Ok(0);
            }
            if let Some(alert) = view.take_alert() {
                eprintln!("{}", alert);
                return Ok(1);
            }
            if view.expenses.len() == before {
                println!("No expense with id {}", id);
            } else {
                println!("Deleted {}", id);
            }
            Ok(0)
        }

        Commands::Dashboard => {
            let mut view = DashboardView::new();
            if view.activate(store).await == Some(Route::Login) {
                return Ok(not_signed_in());
            }
            if let Some(alert) = view.take_alert() {
                eprintln!("{}", alert);
                return Ok(1);
            }
            print_summary(&view.summary, cli.format)?;
            Ok(0)
        }

        Commands::Nav | Commands::Config { .. } => Ok(0),
    }
}

async fn login(
    store: &SessionStore,
    events: &mut broadcast::Receiver<AuthEvent>,
    action: LoginAction,
    email: &str,
    password: &str,
) -> anyhow::Result<i32> {
    let mut view = LoginView::new();
    view.form = LoginForm::new(email, password);

    let next = view.submit(store, action).await;
    store.apply_pending(events);

    if view.is_invalid() {
        for error in view.errors().iter() {
            eprintln!("Invalid input: {}", error);
        }
        return Ok(2);
    }

    println!("{}", view.message);
    let ok = match action {
        LoginAction::SignIn => next.is_some(),
        LoginAction::MagicLink | LoginAction::SignUp => {
            matches!(
                view.message.as_str(),
                spendbook::views::login::MAGIC_LINK_SENT | spendbook::views::login::SIGN_UP_OK
            )
        }
    };
    Ok(if ok { 0 } else { 1 })
}

fn not_signed_in() -> i32 {
    eprintln!("Not signed in. Run `spendbook login <email>` first.");
    1
}

/// Subscriber used while the config itself is loading: `RUST_LOG` or info
fn bootstrap_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spendbook=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish()
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("spendbook={}", config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn write_config(output: Option<&Path>) -> anyhow::Result<()> {
    let config = generate_default_config();

    match output {
        Some(path) => {
            // Create parent directory if needed
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)?;
            println!("Config written to {:?}", path);
        }
        None => {
            print!("{}", config);
        }
    }
    Ok(())
}

async fn prompt(label: &str) -> anyhow::Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    let line = line.trim_end_matches(['\r', '\n']).to_string();
    if line.is_empty() {
        bail!("No input given");
    }
    Ok(line)
}

async fn confirm(question: &str) -> anyhow::Result<bool> {
    let answer = prompt(&format!("{} [y/N] ", question))
        .await
        .unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[derive(Serialize)]
struct ExpenseRow<'a> {
    id: &'a str,
    date: String,
    title: &'a str,
    amount: f64,
    category: &'a str,
}

impl<'a> From<&'a Expense> for ExpenseRow<'a> {
    fn from(expense: &'a Expense) -> Self {
        Self {
            id: &expense.id,
            date: expense.date.to_string(),
            title: &expense.title,
            amount: expense.amount,
            category: expense.category_label().unwrap_or(""),
        }
    }
}

fn print_expenses(expenses: &[Expense], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(expenses)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            for expense in expenses {
                writer.serialize(ExpenseRow::from(expense))?;
            }
            writer.flush()?;
        }
        OutputFormat::Table => {
            if expenses.is_empty() {
                println!("No expenses yet.");
                println!();
                println!("Add your first one with:");
                println!("  spendbook add \"Coffee\" 3.50 --category Food");
                return Ok(());
            }

            println!(
                "{:<12} {:<24} {:>10}  {:<14} {}",
                "Date", "Title", "Amount", "Category", "ID"
            );
            println!("{}", "-".repeat(76));
            for expense in expenses {
                let row = ExpenseRow::from(expense);
                println!(
                    "{:<12} {:<24} {:>10.2}  {:<14} {}",
                    row.date,
                    row.title,
                    row.amount,
                    if row.category.is_empty() { "-" } else { row.category },
                    row.id
                );
            }
        }
    }
    Ok(())
}

fn print_summary(summary: &ExpenseSummary, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            for category in &summary.by_category {
                writer.serialize(category)?;
            }
            writer.flush()?;
        }
        OutputFormat::Table => {
            println!("Expenses:    {}", summary.count);
            println!("Total:       {:.2}", summary.total);
            println!("This month:  {:.2}", summary.month_total);
            if let Some(latest) = summary.latest_date {
                println!("Latest:      {}", latest);
            }

            if !summary.by_category.is_empty() {
                println!();
                println!("{:<20} {:>10} {:>6}", "Category", "Total", "Count");
                println!("{}", "-".repeat(38));
                for category in &summary.by_category {
                    println!(
                        "{:<20} {:>10.2} {:>6}",
                        category.category, category.total, category.count
                    );
                }
            }
        }
    }
    Ok(())
}
