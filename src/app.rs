//! The `inventory` command line application.
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use clap::error::ErrorKind;
use clap::CommandFactory;
use clap::Parser;
use comfy_table::presets::ASCII_FULL_CONDENSED;
use comfy_table::CellAlignment;
use comfy_table::Table;
use fieldx::fxstruct;
use garde::Validate;
use tokio::signal;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::aggregate::Summary;
use crate::archive::display_filename;
use crate::archive::DirArchive;
use crate::catalog::quantity_options;
use crate::catalog::Catalog;
use crate::catalog::DEVICES;
use crate::config::Settings;
use crate::config::DEFAULT_ARCHIVE_PREFIX;
use crate::config::DEFAULT_REPORTER;
use crate::config::DEFAULT_SYSTEM_ACTOR;
#[cfg(feature = "pg")]
use crate::db::driver::pg::Pg;
#[cfg(feature = "sqlite")]
use crate::db::driver::sqlite::Sqlite;
use crate::db::driver::DatabaseDriver;
use crate::report::text::TextRenderer;
use crate::report::ReportFormat;
use crate::report::DEFAULT_TITLE;
use crate::service::InventoryService;
use crate::store::DbStore;
use crate::store::StoreChange;
use crate::traits::InventoryStore;
use crate::traits::StoreObserver;
use crate::types::inverr;
use crate::types::DeviceTarget;
use crate::types::InventoryError;
use crate::types::Result;
use crate::watcher::SummaryWatcher;

#[derive(Debug, Clone, clap::Subcommand)]
pub enum Command {
    /// Create or upgrade the database schema.
    Migrate,
    /// List the known devices.
    Devices,
    /// List catalog products, with the quantity choices for a device if one is given.
    Catalog {
        #[clap(long, short)]
        device: Option<String>,
    },
    /// Record a reading for a device. Entries are given as PRODUCT=QUANTITY.
    Submit {
        device:  String,
        #[clap(required = true)]
        entries: Vec<String>,
    },
    /// Show the current quantities of a device or of the consolidated group.
    Show { device: String },
    /// Render the summary of the latest readings.
    Summary {
        #[clap(long, short, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
        /// Write the report into a file instead of the standard output.
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
    /// Append a zeroed reading for every device.
    Reset,
    /// Archive the summary report and reset all devices.
    Archive {
        #[clap(long, short, value_enum, default_value_t = ReportFormat::Html)]
        format: ReportFormat,
        #[clap(long, short, env = "INVENTORY_ARCHIVE_DIR", default_value = "archive")]
        dir:    PathBuf,
        /// Only archive, leave the readings as they are.
        #[clap(long)]
        keep:   bool,
    },
    /// Delete all inventory records.
    Purge {
        /// Confirm the deletion.
        #[clap(long)]
        yes: bool,
    },
    /// Print the summary every time the inventory changes. Stop with Ctrl-C.
    Watch,
}

#[derive(Debug, Clone, clap::Parser, Validate)]
#[fxstruct(no_new, get(copy))]
#[clap(about, version, author, name = "inventory")]
pub struct Cli {
    #[clap(subcommand)]
    #[fieldx(get(clone))]
    #[garde(skip)]
    command: Command,

    /// SQLite database file.
    #[clap(long, env = "INVENTORY_SQLITE_PATH", default_value = "inventory.db")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    sqlite_path: PathBuf,

    /// Use PostgreSQL instead of SQLite.
    #[clap(long, env = "INVENTORY_PG", default_value_t = false)]
    #[garde(custom(Self::feature_enabled(cfg!(feature = "pg"), "pg")))]
    pg: bool,

    #[clap(long, env = "INVENTORY_PG_HOST", default_value = "localhost")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_host: String,

    #[clap(long, env = "INVENTORY_PG_PORT", default_value_t = 5432)]
    #[garde(skip)]
    pg_port: u16,

    #[clap(long, env = "INVENTORY_PG_USER", default_value = "inventory")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_user: String,

    #[clap(long, env = "INVENTORY_PG_PASSWORD", hide_env_values = true, default_value = "inventory")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_password: String,

    #[clap(long, env = "INVENTORY_PG_DB", default_value = "inventory")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    pg_db: String,

    /// File to send log into
    #[clap(long, env = "INVENTORY_LOG_FILE")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    log_file: Option<PathBuf>,

    /// JSON file with the product catalog. The built-in catalog is used if not given.
    #[clap(long, env = "INVENTORY_CATALOG")]
    #[fieldx(get(clone))]
    #[garde(skip)]
    catalog: Option<PathBuf>,

    /// Name the submitted readings are attributed to.
    #[clap(long, env = "INVENTORY_REPORTER", default_value = DEFAULT_REPORTER)]
    #[fieldx(get(clone))]
    #[garde(length(min = 1))]
    reporter: String,

    /// Name the reset readings are attributed to.
    #[clap(long, env = "INVENTORY_SYSTEM_ACTOR", default_value = DEFAULT_SYSTEM_ACTOR)]
    #[fieldx(get(clone))]
    #[garde(length(min = 1))]
    system_actor: String,

    /// Label of the device group shown as a consolidated view.
    #[clap(long, env = "INVENTORY_GROUP_LABEL", default_value = crate::catalog::DEFAULT_GROUP_LABEL)]
    #[fieldx(get(clone))]
    #[garde(length(min = 1))]
    group_label: String,

    /// Devices summed into the consolidated view.
    #[clap(
        long,
        env = "INVENTORY_GROUP_MEMBERS",
        value_delimiter = ',',
        default_value = "LAC1,LAC2,LAC3,LAC4,LAC5,LAC6"
    )]
    #[fieldx(get(clone))]
    #[garde(length(min = 1), custom(Self::not_containing(&self.group_label)))]
    group_members: Vec<String>,

    /// File name prefix of archived reports.
    #[clap(long, env = "INVENTORY_ARCHIVE_PREFIX", default_value = DEFAULT_ARCHIVE_PREFIX)]
    #[fieldx(get(clone))]
    #[garde(length(min = 1), custom(Self::plain_name))]
    archive_prefix: String,

    #[clap(long, env = "INVENTORY_REPORT_TITLE", default_value = DEFAULT_TITLE)]
    #[fieldx(get(clone))]
    #[garde(skip)]
    report_title: String,
}

impl Cli {
    fn feature_enabled<'a>(enabled: bool, feature: &'static str) -> impl FnOnce(&'a bool, &()) -> garde::Result {
        move |value, _| {
            if !*value || enabled {
                Ok(())
            }
            else {
                Err(garde::Error::new(format!("Build feature '{feature}' must be enabled.")))
            }
        }
    }

    fn not_containing<'a>(label: &'a String) -> impl FnOnce(&'a Vec<String>, &()) -> garde::Result {
        move |members, _| {
            if members.iter().any(|m| m == label) {
                Err(garde::Error::new(format!(
                    "group label '{label}' cannot also be a member"
                )))
            }
            else {
                Ok(())
            }
        }
    }

    fn plain_name(value: &String, _: &()) -> garde::Result {
        if value.contains(['/', '\\']) {
            Err(garde::Error::new("must not contain path separators"))
        }
        else {
            Ok(())
        }
    }
}

/// Logs every committed store change.
#[derive(Debug, Default)]
struct ChangeLogger;

#[async_trait]
impl StoreObserver for ChangeLogger {
    async fn on_change(&self, change: &StoreChange) {
        info!("Inventory changed: {change:?}");
    }

    async fn on_error(&self, error: &InventoryError) {
        warn!("Inventory store error: {error}");
    }
}

#[derive(Debug)]
pub struct InventoryApp {
    cli: Cli,
}

impl InventoryApp {
    /// Parse the process arguments.
    pub fn from_env() -> Result<Self> {
        Self::with_cli(Cli::try_parse()?)
    }

    pub fn from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::with_cli(Cli::try_parse_from(args)?)
    }

    fn with_cli(cli: Cli) -> Result<Self> {
        if let Err(err) = cli.validate() {
            let mut cmd = <Cli as CommandFactory>::command();
            return Err(cmd.error(ErrorKind::InvalidValue, err).into());
        }
        Ok(Self { cli })
    }

    pub fn settings(&self) -> Settings {
        Settings {
            group_label:    self.cli.group_label(),
            group_members:  self.cli.group_members(),
            reporter:       self.cli.reporter(),
            system_actor:   self.cli.system_actor(),
            archive_prefix: self.cli.archive_prefix(),
            report_title:   self.cli.report_title(),
        }
    }

    pub fn catalog(&self) -> Result<Catalog> {
        match self.cli.catalog() {
            Some(path) => Catalog::from_json_file(&path)
                .map_err(|err| inverr!("Cannot load catalog from {}: {err}", path.display())),
            None => Ok(Catalog::default()),
        }
    }

    pub fn setup_tracing(&self) -> Result<()> {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        let filter = tracing_subscriber::EnvFilter::from_default_env();

        // Standard output is reserved for command results.
        let dest_writer = Mutex::new(if let Some(log_file) = self.cli.log_file() {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)?;
            Box::new(file) as Box<dyn io::Write + Send>
        }
        else {
            Box::new(io::stderr()) as Box<dyn io::Write + Send>
        });

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(dest_writer))
            .try_init()
            .map_err(|err| inverr!("Cannot initialize tracing: {err}"))?;

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        self.setup_tracing()?;

        if self.cli.pg() {
            self.execute_pg().await
        }
        else {
            self.execute_sqlite().await
        }
    }

    #[cfg(feature = "pg")]
    async fn execute_pg(&self) -> Result<()> {
        let driver = Pg::connect(
            &self.cli.pg_host(),
            self.cli.pg_port(),
            &self.cli.pg_user(),
            &self.cli.pg_password(),
            &self.cli.pg_db(),
        )
        .await?;
        self.execute_with(driver).await
    }

    #[cfg(not(feature = "pg"))]
    async fn execute_pg(&self) -> Result<()> {
        Err(inverr!("PostgreSQL support is not enabled. Rebuild with the 'pg' feature."))
    }

    #[cfg(feature = "sqlite")]
    async fn execute_sqlite(&self) -> Result<()> {
        let driver = Sqlite::connect(&self.cli.sqlite_path()).await?;
        self.execute_with(driver).await
    }

    #[cfg(not(feature = "sqlite"))]
    async fn execute_sqlite(&self) -> Result<()> {
        Err(inverr!("SQLite support is not enabled. Use --pg or rebuild with the 'sqlite' feature."))
    }

    #[instrument(level = "debug", skip(self, driver), fields(driver = driver.name()))]
    async fn execute_with<D: DatabaseDriver>(&self, driver: D) -> Result<()> {
        let driver = Arc::new(driver);
        let store = Arc::new(DbStore::new(driver.clone()));
        store.prepare().await?;
        store.register_observer(Arc::new(ChangeLogger)).await;

        let service = Arc::new(InventoryService::new(store, self.settings(), self.catalog()?)?);
        self.run_command(service).await?;

        driver.checkpoint().await
    }

    async fn run_command<S: InventoryStore>(&self, service: Arc<InventoryService<S>>) -> Result<()> {
        let settings = service.settings().clone();

        match self.cli.command() {
            Command::Migrate => {
                println!("Database schema is up to date.");
            }

            Command::Devices => {
                let group = service.group();
                for device in DEVICES {
                    println!("{device}");
                }
                println!("{}", group.label().consolidated_name());
            }

            Command::Catalog { device } => {
                let mut table = Table::new();
                table.load_preset(ASCII_FULL_CONDENSED);
                match device {
                    Some(device) => {
                        table.set_header(["Id", "Product", "Quantities"]);
                        for item in service.catalog().items() {
                            let options = if service.catalog().is_free_text(&item.id) {
                                "free text".to_string()
                            }
                            else {
                                quantity_options(&item.id, &device, &settings.group_label, &settings.group_members)
                                    .join(" ")
                            };
                            table.add_row([item.id.clone(), item.name.clone(), options]);
                        }
                    }
                    None => {
                        table.set_header(["Id", "Product"]);
                        for item in service.catalog().items() {
                            table.add_row([item.id.clone(), item.name.clone()]);
                        }
                    }
                }
                println!("{table}");
            }

            Command::Submit { device, entries } => {
                let target = DeviceTarget::resolve(&device, &settings.group_label())?;
                let device = target.writable()?;
                let form = parse_entries(&entries)?;
                for product_id in form.keys() {
                    if service.catalog().name_of(product_id).is_none() {
                        warn!("Product '{product_id}' is not in the catalog");
                    }
                }
                let reading = service.submit_reading(device, &form).await?;
                println!(
                    "Saved inventory #{} for {} with {} product(s).",
                    reading.id,
                    reading.device,
                    reading.products.len()
                );
            }

            Command::Show { device } => {
                let target = DeviceTarget::resolve(&device, &settings.group_label())?;
                let quantities = service.current_quantities(&target).await?;
                if quantities.is_empty() {
                    println!("No inventory recorded for {target}.");
                }
                else {
                    let mut table = Table::new();
                    table.load_preset(ASCII_FULL_CONDENSED).set_header(["Product", "Quantity"]);
                    for (product_id, quantity) in &quantities {
                        table.add_row([service.catalog().display_name(product_id).to_string(), quantity.clone()]);
                    }
                    if let Some(column) = table.column_mut(1) {
                        column.set_cell_alignment(CellAlignment::Right);
                    }
                    println!("{target}\n{table}");
                }
            }

            Command::Summary { format, output } => {
                let renderer = format.renderer(&settings.report_title);
                let (_, artifact) = service.generate_report(&*renderer).await?;
                match output {
                    Some(path) => {
                        tokio::fs::write(&path, &artifact.bytes).await?;
                        println!("Report written to {}", path.display());
                    }
                    None => println!("{}", String::from_utf8_lossy(&artifact.bytes)),
                }
            }

            Command::Reset => {
                let outcome = service.reset_all().await?;
                println!("Reset {} device(s).", outcome.succeeded.len());
                for (device, reason) in &outcome.failed {
                    println!("Could not reset {device}: {reason}");
                }
                if !outcome.is_complete() {
                    return Err(inverr!("{} device(s) could not be reset", outcome.failed.len()));
                }
            }

            Command::Archive { format, dir, keep } => {
                let renderer = format.renderer(&settings.report_title);
                let archive = DirArchive::new(dir);
                let outcome = service.archive_report(&*renderer, &archive, !keep).await?;
                println!(
                    "Archived '{}' to {}",
                    display_filename(&outcome.archived.filename),
                    outcome.archived.location
                );
                if let Some(reset) = outcome.reset {
                    println!("Reset {} device(s).", reset.succeeded.len());
                    for (device, reason) in &reset.failed {
                        println!("Could not reset {device}: {reason}");
                    }
                    if !reset.is_complete() {
                        return Err(inverr!("{} device(s) could not be reset", reset.failed.len()));
                    }
                }
            }

            Command::Purge { yes } => {
                if !yes {
                    return Err(inverr!("Refusing to delete all inventories without --yes"));
                }
                let rows = service.purge().await?;
                println!("Deleted {rows} inventory record(s).");
            }

            Command::Watch => {
                let renderer = TextRenderer::new(&settings.report_title);
                let watcher = SummaryWatcher::start(service.clone()).await?;
                let mut updates = watcher.subscribe();
                print_summary(&renderer, &watcher.current(), service.catalog())?;

                loop {
                    tokio::select! {
                        changed = updates.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            let summary = updates.borrow_and_update().clone();
                            print_summary(&renderer, &summary, service.catalog())?;
                        }
                        _ = signal::ctrl_c() => {
                            info!("Interrupted, stopping the watcher");
                            break;
                        }
                    }
                }

                watcher.shutdown();
            }
        }

        Ok(())
    }
}

fn print_summary(renderer: &TextRenderer, summary: &Summary, catalog: &Catalog) -> Result<()> {
    use crate::traits::ReportRenderer;

    let artifact = renderer.render(summary, catalog)?;
    println!("{}", String::from_utf8_lossy(&artifact.bytes));
    Ok(())
}

/// Parse `PRODUCT=QUANTITY` pairs into an entry form. A later entry for the same product wins.
pub fn parse_entries<S: AsRef<str>>(entries: &[S]) -> Result<BTreeMap<String, String>> {
    entries
        .iter()
        .map(|entry| {
            let entry = entry.as_ref();
            match entry.split_once('=') {
                Some((product_id, quantity)) if !product_id.trim().is_empty() => {
                    Ok((product_id.trim().to_string(), quantity.trim().to_string()))
                }
                _ => Err(inverr!("Expected PRODUCT=QUANTITY, got '{entry}'")),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_parsed() {
        let form = parse_entries(&["jabon=3", " lejia = 2 ", "otros=dos fregonas", "jabon=4"]).unwrap();
        assert_eq!(form.len(), 3);
        assert_eq!(form["jabon"], "4");
        assert_eq!(form["lejia"], "2");
        assert_eq!(form["otros"], "dos fregonas");

        assert!(parse_entries(&["jabon"]).is_err());
        assert!(parse_entries(&["=3"]).is_err());
    }

    #[test]
    fn cli_settings() {
        let app = InventoryApp::from_args([
            "inventory",
            "--group-label",
            "ALM",
            "--group-members",
            "ALM1,ALM2",
            "--reporter",
            "Ana",
            "summary",
        ])
        .unwrap();
        let settings = app.settings();
        assert_eq!(settings.group_label, "ALM");
        assert_eq!(settings.group_members, vec!["ALM1", "ALM2"]);
        assert_eq!(settings.reporter, "Ana");
        assert_eq!(settings.archive_prefix, DEFAULT_ARCHIVE_PREFIX);
    }

    #[test]
    fn cli_validation() {
        let err = InventoryApp::from_args(["inventory", "--archive-prefix", "a/b", "reset"]).unwrap_err();
        assert!(matches!(err, InventoryError::Cli(_)));

        let err = InventoryApp::from_args(["inventory", "--group-members", "LAC,LAC1", "reset"]).unwrap_err();
        assert!(matches!(err, InventoryError::Cli(_)));

        let err = InventoryApp::from_args(["inventory", "--reporter", "", "reset"]).unwrap_err();
        assert!(matches!(err, InventoryError::Cli(_)));
    }
}
