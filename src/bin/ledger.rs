//! Terminal front end for the ledger transaction cache.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use ledger_sync::cache::Ledger;
use ledger_sync::client::LedgerClient;
use ledger_sync::config::{CSRF_TOKEN_ENV, Config};
use ledger_sync::error::{LedgerError, Result as LedgerResult};
use ledger_sync::models::{
    Category, CategoryDraft, CategoryPatch, FilterCriteria, MonthlySaldo, NaiveDate,
    StatementFile, TransactionDraft, TransactionId, TransactionPatch, UploadReport, UploadStatus,
    UserId, UserPatch,
};
use ledger_sync::session::{FileSession, SessionStore as _};
use ledger_sync::view::{CategoryWeights, NoopView, TableRow};
use owo_colors::OwoColorize;

/// Cache type driven by the CLI.
type Cache = Ledger<LedgerClient, NoopView>;

/// Ledger CLI: browse and edit transactions on the finance tracker backend.
#[derive(Debug, Parser)]
#[command(name = "ledger", version, about)]
struct Cli {
    /// Override the session mirror directory (default: XDG cache dir).
    #[arg(long, global = true, value_name = "DIR")]
    session_dir: Option<PathBuf>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch transactions from the server and list them.
    List(FilterArgs),
    /// List the cached transactions without contacting the server.
    Cached(FilterArgs),
    /// Add a transaction.
    Add(AddArgs),
    /// Change fields of a transaction.
    Modify(ModifyArgs),
    /// Delete a transaction; `undo` brings it back.
    Delete {
        /// Transaction id.
        id: i64,
    },
    /// Restore the most recently deleted transaction.
    Undo,
    /// List categories.
    Categories,
    /// Create a category.
    CategoryAdd {
        /// Category name (a single word).
        name: String,
    },
    /// Rename a category.
    CategoryRename {
        /// Current name.
        name: String,
        /// New name.
        new_name: String,
    },
    /// Delete categories; their transactions become uncategorized.
    CategoryDelete {
        /// Names of the categories to delete.
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Show per-category totals of the cached transactions.
    Breakdown,
    /// Show month-by-month cash flow.
    Monthly,
    /// Import bank statement files.
    Upload {
        /// Bank the statements come from.
        #[arg(long)]
        bank: String,
        /// Statement files.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Delete every transaction on the server.
    Wipe {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Edit the signed-in user's profile.
    Profile(ProfileArgs),
    /// Delete the signed-in user's account and everything in it.
    DeleteAccount {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Drop the session mirror, including the undo history.
    Forget,
}

/// Arguments for the `profile` subcommand.
#[derive(Debug, Args)]
struct ProfileArgs {
    /// New login name.
    #[arg(long)]
    username: Option<String>,
    /// New given name.
    #[arg(long)]
    first_name: Option<String>,
    /// New family name.
    #[arg(long)]
    last_name: Option<String>,
    /// New main currency; stored amounts are converted into it.
    #[arg(long)]
    main_currency: Option<String>,
}

impl ProfileArgs {
    /// Collects the given flags into a patch.
    fn to_patch(&self) -> UserPatch {
        UserPatch {
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            main_currency: self.main_currency.clone(),
        }
    }
}

/// Filter arguments shared by `list` and `cached`.
#[derive(Debug, Args)]
struct FilterArgs {
    /// Earliest booking date (inclusive, YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// Latest booking date (inclusive, YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
    /// Minimum base amount.
    #[arg(long, allow_hyphen_values = true)]
    min_amount: Option<f64>,
    /// Maximum base amount.
    #[arg(long, allow_hyphen_values = true)]
    max_amount: Option<f64>,
    /// Statement currency; repeat to accept several.
    #[arg(long)]
    currency: Vec<String>,
    /// Bank name; repeat to accept several.
    #[arg(long)]
    bank: Vec<String>,
    /// Category name; repeat to accept several.
    #[arg(long)]
    category: Vec<String>,
}

/// Arguments for the `add` subcommand.
#[derive(Debug, Args)]
struct AddArgs {
    /// Signed amount in the statement currency.
    #[arg(long, allow_hyphen_values = true)]
    amount: f64,
    /// Statement currency (ISO code).
    #[arg(long)]
    currency: String,
    /// Booking date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    date: NaiveDate,
    /// Display name.
    #[arg(long)]
    info: Option<String>,
    /// Title.
    #[arg(long)]
    title: Option<String>,
    /// Place.
    #[arg(long)]
    place: Option<String>,
    /// Category name.
    #[arg(long)]
    category: Option<String>,
    /// Bank name.
    #[arg(long)]
    bank: Option<String>,
}

/// Arguments for the `modify` subcommand.
#[derive(Debug, Args)]
struct ModifyArgs {
    /// Transaction id.
    id: i64,
    /// New display name.
    #[arg(long)]
    info: Option<String>,
    /// New title.
    #[arg(long)]
    title: Option<String>,
    /// New place.
    #[arg(long)]
    place: Option<String>,
    /// New category name.
    #[arg(long, conflicts_with = "clear_category")]
    category: Option<String>,
    /// Remove the category.
    #[arg(long)]
    clear_category: bool,
    /// New bank name.
    #[arg(long, conflicts_with = "clear_bank")]
    bank: Option<String>,
    /// Remove the bank.
    #[arg(long)]
    clear_bank: bool,
}

/// Parses a date string in `YYYY-MM-DD` format for clap.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|err| format!("{err}"))
}

/// Prints an error line and returns a failing exit code.
fn fail(context: &str, err: &LedgerError) -> io::Result<ExitCode> {
    writeln!(
        io::stderr().lock(),
        "{} {context}: {err}",
        "error:".red().bold()
    )?;
    Ok(ExitCode::FAILURE)
}

/// Loads the configuration, printing a hint when the token is missing.
fn read_config() -> io::Result<Option<Config>> {
    match Config::from_env() {
        Ok(config) => Ok(Some(config)),
        Err(LedgerError::MissingCsrfToken) => {
            let mut err = io::stderr().lock();
            writeln!(
                err,
                "{} {} environment variable is not set",
                "error:".red().bold(),
                CSRF_TOKEN_ENV.bold()
            )?;
            writeln!(
                err,
                "  {} create a .env file with {}=<token from the page's csrf-token meta tag>",
                "hint:".cyan(),
                CSRF_TOKEN_ENV
            )?;
            Ok(None)
        }
        Err(err) => {
            let _code = fail("invalid configuration", &err)?;
            Ok(None)
        }
    }
}

/// Opens the session mirror in `dir`, or in the default cache directory.
fn open_session(dir: Option<PathBuf>) -> LedgerResult<FileSession> {
    match dir {
        Some(path) => FileSession::new(path),
        None => FileSession::new(FileSession::default_dir()?),
    }
}

/// Runs the CLI, returning an appropriate exit code.
async fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let Some(config) = read_config()? else {
        return Ok(ExitCode::FAILURE);
    };

    let session = match open_session(cli.session_dir.or_else(|| config.session_dir.clone())) {
        Ok(session) => session,
        Err(err) => return fail("failed to open session mirror", &err),
    };

    if matches!(cli.command, Command::Forget) {
        return match session.clear() {
            Ok(()) => {
                writeln!(io::stdout().lock(), "{}", "Session mirror cleared.".green())?;
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => fail("failed to clear session mirror", &err),
        };
    }

    let client = match config.client() {
        Ok(client) => client,
        Err(err) => return fail("failed to build client", &err),
    };
    let ledger = Ledger::new(client, NoopView);

    // The mirror is disposable; a broken one is dropped, not fatal.
    if let Err(err) = ledger.resume(&session) {
        tracing::warn!(error = %err, "discarding unreadable session mirror");
        if let Err(clear_err) = session.clear() {
            tracing::warn!(error = %clear_err, "could not clear session mirror");
        }
    }

    let code = dispatch(&ledger, cli.command).await?;

    if let Err(err) = ledger.persist(&session) {
        tracing::warn!(error = %err, "could not write session mirror");
    }
    Ok(code)
}

/// Dispatches to the appropriate subcommand handler.
async fn dispatch(ledger: &Cache, command: Command) -> io::Result<ExitCode> {
    match command {
        Command::List(args) => cmd_list(ledger, &args).await,
        Command::Cached(args) => cmd_cached(ledger, &args),
        Command::Add(args) => cmd_add(ledger, &args).await,
        Command::Modify(args) => cmd_modify(ledger, &args).await,
        Command::Delete { id } => cmd_delete(ledger, TransactionId::new(id)).await,
        Command::Undo => cmd_undo(ledger).await,
        Command::Categories => cmd_categories(ledger).await,
        Command::CategoryAdd { name } => cmd_category_add(ledger, &name).await,
        Command::CategoryRename { name, new_name } => {
            cmd_category_rename(ledger, &name, &new_name).await
        }
        Command::CategoryDelete { names } => cmd_category_delete(ledger, &names).await,
        Command::Breakdown => cmd_breakdown(ledger),
        Command::Monthly => cmd_monthly(ledger).await,
        Command::Upload { bank, files } => cmd_upload(ledger, &bank, &files).await,
        Command::Wipe { yes } => cmd_wipe(ledger, yes).await,
        Command::Profile(args) => cmd_profile(ledger, &args).await,
        Command::DeleteAccount { yes } => cmd_delete_account(ledger, yes).await,
        Command::Forget => Ok(ExitCode::SUCCESS),
    }
}

// ── Subcommands ──────────────────────────────────────────────────────

/// Executes the `list` subcommand: fetches with a filter and prints rows.
async fn cmd_list(ledger: &Cache, args: &FilterArgs) -> io::Result<ExitCode> {
    if let Err(err) = with_spinner("Loading reference data...", ledger.load_entities()).await {
        return fail("failed to load reference data", &err);
    }
    let Some(filter) = build_filter(ledger, args)? else {
        return Ok(ExitCode::FAILURE);
    };
    if let Err(err) = with_spinner("Fetching transactions...", ledger.load(filter)).await {
        return fail("failed to fetch transactions", &err);
    }
    match ledger.table() {
        Ok(rows) => {
            print_rows(&rows)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to read cache", &err),
    }
}

/// Executes the `cached` subcommand: filters the cached list locally.
fn cmd_cached(ledger: &Cache, args: &FilterArgs) -> io::Result<ExitCode> {
    let Some(filter) = build_filter(ledger, args)? else {
        return Ok(ExitCode::FAILURE);
    };
    let shown = match ledger.filtered(&filter) {
        Ok(found) => found.into_iter().map(|tx| tx.id).collect::<Vec<_>>(),
        Err(err) => return fail("failed to filter cache", &err),
    };
    match ledger.table() {
        Ok(all_rows) => {
            let rows: Vec<TableRow> = all_rows
                .into_iter()
                .filter(|row| shown.contains(&row.id))
                .collect();
            print_rows(&rows)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to read cache", &err),
    }
}

/// Executes the `add` subcommand.
async fn cmd_add(ledger: &Cache, args: &AddArgs) -> io::Result<ExitCode> {
    if let Err(err) = with_spinner("Loading reference data...", ledger.load_entities()).await {
        return fail("failed to load reference data", &err);
    }
    let mut draft = TransactionDraft::new(
        args.amount,
        args.currency.as_str(),
        args.date.format("%Y-%m-%d").to_string(),
    );
    if let Some(info) = args.info.as_deref() {
        draft = draft.info(info);
    }
    if let Some(title) = args.title.as_deref() {
        draft = draft.title(title);
    }
    if let Some(place) = args.place.as_deref() {
        draft = draft.place(place);
    }
    if let Some(name) = args.category.as_deref() {
        let Some(category) = resolve_name("category", name, |n| ledger.category_by_name(n))? else {
            return Ok(ExitCode::FAILURE);
        };
        draft = draft.category(category.id);
    }
    if let Some(name) = args.bank.as_deref() {
        let Some(bank) = resolve_name("bank", name, |n| ledger.bank_by_name(n))? else {
            return Ok(ExitCode::FAILURE);
        };
        draft = draft.bank(bank.id);
    }

    match with_spinner("Adding transaction...", ledger.add(&draft)).await {
        Ok(id) => {
            writeln!(
                io::stdout().lock(),
                "{} {}",
                "Added transaction".green().bold(),
                format_args!("#{id}").bold()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to add transaction", &err),
    }
}

/// Executes the `modify` subcommand.
async fn cmd_modify(ledger: &Cache, args: &ModifyArgs) -> io::Result<ExitCode> {
    if (args.category.is_some() || args.bank.is_some())
        && let Err(err) = with_spinner("Loading reference data...", ledger.load_entities()).await
    {
        return fail("failed to load reference data", &err);
    }
    let Some(patch) = build_patch(ledger, args)? else {
        return Ok(ExitCode::FAILURE);
    };
    if patch.is_empty() {
        writeln!(
            io::stderr().lock(),
            "{} modify requires at least one field to change",
            "error:".red().bold()
        )?;
        return Ok(ExitCode::FAILURE);
    }

    let id = TransactionId::new(args.id);
    match with_spinner("Saving changes...", ledger.modify(id, &patch)).await {
        Ok(true) => {
            writeln!(io::stdout().lock(), "{} #{id}", "Updated transaction".green().bold())?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(false) => {
            writeln!(
                io::stdout().lock(),
                "{} #{id} {}",
                "Updated transaction".green().bold(),
                "(not in the local cache)".dimmed()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to modify transaction", &err),
    }
}

/// Executes the `delete` subcommand.
async fn cmd_delete(ledger: &Cache, id: TransactionId) -> io::Result<ExitCode> {
    match with_spinner("Deleting transaction...", ledger.delete(id)).await {
        Ok(cached) => {
            let mut out = io::stdout().lock();
            writeln!(out, "{} #{id}", "Deleted transaction".green().bold())?;
            if cached {
                writeln!(out, "  {} run `ledger undo` to restore it", "hint:".cyan())?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to delete transaction", &err),
    }
}

/// Executes the `undo` subcommand.
async fn cmd_undo(ledger: &Cache) -> io::Result<ExitCode> {
    match with_spinner("Restoring transaction...", ledger.undo_delete()).await {
        Ok(id) => {
            writeln!(
                io::stdout().lock(),
                "{} {}",
                "Restored transaction as".green().bold(),
                format_args!("#{id}").bold()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(LedgerError::NothingToUndo) => {
            writeln!(io::stdout().lock(), "{}", "Nothing to undo.".dimmed())?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to restore transaction", &err),
    }
}

/// Executes the `categories` subcommand.
async fn cmd_categories(ledger: &Cache) -> io::Result<ExitCode> {
    if let Err(err) = with_spinner("Loading categories...", ledger.load_entities()).await {
        return fail("failed to load categories", &err);
    }
    match ledger.categories() {
        Ok(categories) => {
            print_categories_table(&categories)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to read categories", &err),
    }
}

/// Executes the `category-add` subcommand.
async fn cmd_category_add(ledger: &Cache, name: &str) -> io::Result<ExitCode> {
    match with_spinner("Creating category...", ledger.add_category(&CategoryDraft::new(name)))
        .await
    {
        Ok(category) => {
            writeln!(
                io::stdout().lock(),
                "{} {} {}",
                "Created category".green().bold(),
                category.name.bold(),
                format_args!("(#{})", category.id).dimmed()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to create category", &err),
    }
}

/// Executes the `category-rename` subcommand.
async fn cmd_category_rename(ledger: &Cache, name: &str, new_name: &str) -> io::Result<ExitCode> {
    if let Err(err) = with_spinner("Loading categories...", ledger.load_entities()).await {
        return fail("failed to load categories", &err);
    }
    let Some(category) = resolve_name("category", name, |n| ledger.category_by_name(n))? else {
        return Ok(ExitCode::FAILURE);
    };
    let patch = CategoryPatch::rename(new_name);
    match with_spinner("Renaming category...", ledger.modify_category(category.id, &patch)).await
    {
        Ok(renamed) => {
            writeln!(
                io::stdout().lock(),
                "{} {name} \u{2192} {}",
                "Renamed category".green().bold(),
                renamed.name.bold()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to rename category", &err),
    }
}

/// Executes the `category-delete` subcommand.
async fn cmd_category_delete(ledger: &Cache, names: &[String]) -> io::Result<ExitCode> {
    if let Err(err) = with_spinner("Loading categories...", ledger.load_entities()).await {
        return fail("failed to load categories", &err);
    }
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let Some(category) = resolve_name("category", name, |n| ledger.category_by_name(n))?
        else {
            return Ok(ExitCode::FAILURE);
        };
        ids.push(category.id);
    }
    match with_spinner("Deleting categories...", ledger.delete_categories(&ids)).await {
        Ok(deleted) => {
            let mut out = io::stdout().lock();
            for category in &deleted {
                writeln!(out, "{} {}", "Deleted category".green().bold(), category.name)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to delete categories", &err),
    }
}

/// Executes the `breakdown` subcommand.
fn cmd_breakdown(ledger: &Cache) -> io::Result<ExitCode> {
    match ledger.category_weights() {
        Ok(weights) => {
            print_weights_table(&weights)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to read cache", &err),
    }
}

/// Executes the `monthly` subcommand.
async fn cmd_monthly(ledger: &Cache) -> io::Result<ExitCode> {
    let Some(user) = signed_in_user(ledger).await? else {
        return Ok(ExitCode::FAILURE);
    };
    match with_spinner("Loading cash flow...", ledger.monthly_summary(user)).await {
        Ok(months) => {
            print_monthly_table(&months)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to load cash flow", &err),
    }
}

/// Executes the `upload` subcommand.
async fn cmd_upload(ledger: &Cache, bank: &str, files: &[PathBuf]) -> io::Result<ExitCode> {
    let mut statements = Vec::with_capacity(files.len());
    for path in files {
        statements.push(read_statement(bank, path)?);
    }
    match with_spinner("Uploading statements...", ledger.upload_statements(statements)).await {
        Ok(report) => {
            print_upload_report(&report)?;
            if report.status.imported_any() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Err(err) => fail("failed to upload statements", &err),
    }
}

/// Executes the `wipe` subcommand.
async fn cmd_wipe(ledger: &Cache, confirmed: bool) -> io::Result<ExitCode> {
    if !confirmed {
        writeln!(
            io::stderr().lock(),
            "{} this deletes every transaction; pass --yes to confirm",
            "error:".red().bold()
        )?;
        return Ok(ExitCode::FAILURE);
    }
    let Some(user) = signed_in_user(ledger).await? else {
        return Ok(ExitCode::FAILURE);
    };
    match with_spinner("Deleting all transactions...", ledger.delete_all_transactions(user)).await
    {
        Ok(count) => {
            writeln!(
                io::stdout().lock(),
                "{} {count}",
                "Deleted transactions:".green().bold()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to delete transactions", &err),
    }
}

/// Executes the `profile` subcommand.
async fn cmd_profile(ledger: &Cache, args: &ProfileArgs) -> io::Result<ExitCode> {
    let patch = args.to_patch();
    if patch.is_empty() {
        writeln!(
            io::stderr().lock(),
            "{} nothing to change; pass at least one field",
            "error:".red().bold()
        )?;
        return Ok(ExitCode::FAILURE);
    }
    let Some(user) = signed_in_user(ledger).await? else {
        return Ok(ExitCode::FAILURE);
    };
    match with_spinner("Saving profile...", ledger.modify_user(user, &patch)).await {
        Ok(details) => {
            writeln!(
                io::stdout().lock(),
                "{} {} <{}>",
                "Profile saved:".green().bold(),
                details.username,
                details.email
            )?;
            if let Ok(Some(currency)) = ledger.main_currency() {
                writeln!(io::stdout().lock(), "{} {currency}", "Main currency:".bold())?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to save profile", &err),
    }
}

/// Executes the `delete-account` subcommand.
async fn cmd_delete_account(ledger: &Cache, confirmed: bool) -> io::Result<ExitCode> {
    if !confirmed {
        writeln!(
            io::stderr().lock(),
            "{} this deletes the account and all its data; pass --yes to confirm",
            "error:".red().bold()
        )?;
        return Ok(ExitCode::FAILURE);
    }
    let Some(user) = signed_in_user(ledger).await? else {
        return Ok(ExitCode::FAILURE);
    };
    match with_spinner("Deleting account...", ledger.delete_user(user)).await {
        Ok(()) => {
            writeln!(io::stdout().lock(), "{}", "Account deleted.".green().bold())?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => fail("failed to delete account", &err),
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Awaits `operation` behind a spinner.
async fn with_spinner<T, F>(message: &str, operation: F) -> LedgerResult<T>
where
    F: Future<Output = LedgerResult<T>>,
{
    let spinner = make_spinner(message);
    let result = operation.await;
    spinner.finish_and_clear();
    result
}

/// Loads reference data and returns the signed-in user's id.
async fn signed_in_user(ledger: &Cache) -> io::Result<Option<UserId>> {
    if let Err(err) = with_spinner("Loading account...", ledger.load_entities()).await {
        let _code = fail("failed to load account", &err)?;
        return Ok(None);
    }
    match ledger.user() {
        Ok(Some(user)) => Ok(Some(user.id)),
        Ok(None) => {
            writeln!(
                io::stderr().lock(),
                "{} the server did not report a signed-in user",
                "error:".red().bold()
            )?;
            Ok(None)
        }
        Err(err) => {
            let _code = fail("failed to read account", &err)?;
            Ok(None)
        }
    }
}

/// Resolves a named entity, printing an error on failure.
///
/// Returns `Ok(Some(value))` on success, `Ok(None)` if the entity was not
/// found (error already printed), or `Err` on I/O failure.
fn resolve_name<T, F>(label: &str, name: &str, lookup: F) -> io::Result<Option<T>>
where
    F: FnOnce(&str) -> LedgerResult<Option<T>>,
{
    match lookup(name) {
        Ok(Some(value)) => Ok(Some(value)),
        Ok(None) => {
            writeln!(
                io::stderr().lock(),
                "{} {label} not found: {name}",
                "error:".red().bold()
            )?;
            Ok(None)
        }
        Err(err) => {
            let _code = fail(&format!("failed to look up {label}"), &err)?;
            Ok(None)
        }
    }
}

/// Builds [`FilterCriteria`] from CLI arguments, resolving names to ids.
fn build_filter(ledger: &Cache, args: &FilterArgs) -> io::Result<Option<FilterCriteria>> {
    let mut filter = FilterCriteria::new()
        .amount_range(args.min_amount, args.max_amount)
        .date_range(args.from, args.to);
    for code in &args.currency {
        filter = filter.base_currency(code.as_str());
    }
    for name in &args.bank {
        let Some(bank) = resolve_name("bank", name, |n| ledger.bank_by_name(n))? else {
            return Ok(None);
        };
        filter = filter.bank(bank.id);
    }
    for name in &args.category {
        let Some(category) = resolve_name("category", name, |n| ledger.category_by_name(n))?
        else {
            return Ok(None);
        };
        filter = filter.category(category.id);
    }
    if let Err(err) = filter.validate() {
        let _code = fail("invalid filter", &err)?;
        return Ok(None);
    }
    Ok(Some(filter))
}

/// Builds a [`TransactionPatch`] from CLI arguments, resolving names.
fn build_patch(ledger: &Cache, args: &ModifyArgs) -> io::Result<Option<TransactionPatch>> {
    let mut patch = TransactionPatch::new();
    if let Some(info) = args.info.as_deref() {
        patch = patch.info(info);
    }
    if let Some(title) = args.title.as_deref() {
        patch = patch.title(title);
    }
    if let Some(place) = args.place.as_deref() {
        patch = patch.place(place);
    }
    if args.clear_category {
        patch = patch.category(None);
    } else if let Some(name) = args.category.as_deref() {
        let Some(category) = resolve_name("category", name, |n| ledger.category_by_name(n))?
        else {
            return Ok(None);
        };
        patch = patch.category(Some(category.id));
    }
    if args.clear_bank {
        patch = patch.bank(None);
    } else if let Some(name) = args.bank.as_deref() {
        let Some(bank) = resolve_name("bank", name, |n| ledger.bank_by_name(n))? else {
            return Ok(None);
        };
        patch = patch.bank(Some(bank.id));
    }
    Ok(Some(patch))
}

/// Reads a statement file for upload.
fn read_statement(bank: &str, path: &Path) -> io::Result<StatementFile> {
    let contents = fs::read(path)?;
    let file_name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    Ok(StatementFile {
        bank: bank.to_owned(),
        file_name,
        contents,
    })
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

// ── Output formatting ────────────────────────────────────────────────

/// Formats a signed amount, red for outflows and green for inflows.
fn amount_cell(value: f64) -> Cell {
    let cell = Cell::new(format!("{value:.2}"));
    if value < 0.0_f64 {
        cell.fg(Color::Red)
    } else {
        cell.fg(Color::Green)
    }
}

/// Renders text or a dimmed dash when empty.
fn text_cell(value: &str) -> Cell {
    if value.is_empty() {
        Cell::new("\u{2014}").fg(Color::DarkGrey)
    } else {
        Cell::new(value)
    }
}

/// Prints transaction rows in a table.
fn print_rows(rows: &[TableRow]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if rows.is_empty() {
        writeln!(out, "{}", "No transactions found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Info").fg(Color::Cyan),
        Cell::new("Title").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
        Cell::new("Base").fg(Color::Cyan),
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Bank").fg(Color::Cyan),
        Cell::new("Place").fg(Color::Cyan),
    ]);

    for row in rows {
        let amount = row
            .amount
            .map_or_else(|| text_cell(""), amount_cell);
        _ = table.add_row(vec![
            Cell::new(row.id),
            Cell::new(&row.date),
            text_cell(&row.info),
            text_cell(&row.title),
            amount,
            Cell::new(format!("{:.2} {}", row.base_amount, row.base_currency)),
            text_cell(&row.category),
            text_cell(&row.bank),
            text_cell(&row.place),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Transactions".green().bold(),
        format_args!("({})", rows.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints categories in a table.
fn print_categories_table(categories: &[Category]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if categories.is_empty() {
        writeln!(out, "{}", "No categories found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
    ]);
    for category in categories {
        _ = table.add_row(vec![Cell::new(category.id), Cell::new(&category.name)]);
    }

    writeln!(
        out,
        "{} {}",
        "Categories".green().bold(),
        format_args!("({})", categories.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints per-category totals in a table.
fn print_weights_table(weights: &CategoryWeights) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if weights.is_empty() {
        writeln!(out, "{}", "No cached transactions.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Total").fg(Color::Cyan),
    ]);
    for entry in weights.entries() {
        let name = if entry.0.is_empty() {
            Cell::new("uncategorized").fg(Color::DarkGrey)
        } else {
            Cell::new(&entry.0)
        };
        _ = table.add_row(vec![name, amount_cell(entry.1)]);
    }

    writeln!(out, "{}", "Category breakdown".green().bold())?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints monthly cash flow in a table.
fn print_monthly_table(months: &[MonthlySaldo]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if months.is_empty() {
        writeln!(out, "{}", "No cash flow recorded.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Month").fg(Color::Cyan),
        Cell::new("Incoming").fg(Color::Cyan),
        Cell::new("Outgoing").fg(Color::Cyan),
        Cell::new("Balance").fg(Color::Cyan),
    ]);
    for month in months {
        _ = table.add_row(vec![
            Cell::new(&month.month),
            amount_cell(month.incoming),
            amount_cell(month.outgoing),
            amount_cell(month.balance),
        ]);
    }

    writeln!(out, "{}", "Monthly cash flow".green().bold())?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints the per-file result of a statement upload.
fn print_upload_report(report: &UploadReport) -> io::Result<()> {
    let mut out = io::stdout().lock();
    let headline = match report.status {
        UploadStatus::Complete => "All statements imported".green().bold().to_string(),
        UploadStatus::Partial => "Some statements failed".yellow().bold().to_string(),
        UploadStatus::Rejected => "No statement could be imported".red().bold().to_string(),
        UploadStatus::NoFiles => "No files were uploaded".red().bold().to_string(),
    };
    writeln!(
        out,
        "{headline} {}",
        format_args!("({} transactions)", report.outcome.amount).dimmed()
    )?;
    if !report.outcome.info.is_empty() {
        writeln!(out, "  {}", report.outcome.info)?;
    }
    if report.outcome.success.is_empty() && report.outcome.failed.is_empty() {
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("File").fg(Color::Cyan),
        Cell::new("Result").fg(Color::Cyan),
    ]);
    for (file, bank) in &report.outcome.success {
        _ = table.add_row(vec![Cell::new(file), Cell::new(bank).fg(Color::Green)]);
    }
    for (file, reason) in &report.outcome.failed {
        _ = table.add_row(vec![Cell::new(file), Cell::new(reason).fg(Color::Red)]);
    }
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            // Last-resort error output; if stderr itself failed, nothing
            // more can be done.
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}
