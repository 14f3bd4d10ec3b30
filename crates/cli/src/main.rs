//! tnsync command-line tool.
//!
//! Inspects `tnsnames.ora` files, compares them with the service entries in
//! an LDAP directory, and pushes local changes to the directory.

mod style;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use dialoguer::Confirm;
use tracing_subscriber::EnvFilter;

use tnsync_core::config::AppConfig;
use tnsync_core::tns::sqlnet::{read_default_domain, sqlnet_path_for};
use tnsync_core::tns::{filter_registry, parse_tnsnames, resolve_alias, write_tnsnames};
use tnsync_core::{LdapDirectory, Registry, SyncEngine, SyncStatus, WorkTally};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// tnsync command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "tnsync",
    version,
    about = "Keep LDAP net service entries in sync with tnsnames.ora"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "/etc/tnsync/config.toml")]
    config: String,

    /// Log filter (e.g. `debug`, `tnsync_core=trace`). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./tnsync.toml")]
        output: String,
    },

    /// Validate a configuration file.
    Validate,

    /// List the aliases defined in a tnsnames file.
    List {
        /// Only show aliases matching this regex (case-insensitive).
        #[arg(short, long)]
        filter: Option<String>,

        /// Read this file instead of the configured one.
        #[arg(long)]
        file: Option<String>,

        /// Do not follow IFILE includes.
        #[arg(long)]
        no_ifile: bool,
    },

    /// Resolve a single alias the way a client would.
    Lookup {
        alias: String,

        /// Default domain (overrides config and sqlnet.ora).
        #[arg(short, long)]
        domain: Option<String>,

        /// Read this file instead of the configured one.
        #[arg(long)]
        file: Option<String>,
    },

    /// Show what a sync would change, without changing anything.
    Diff {
        /// Print descriptor diffs for modified aliases.
        #[arg(short, long)]
        verbose: bool,
    },

    /// Push local aliases to the directory.
    Sync {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Write the directory's service entries to a tnsnames file.
    Export {
        #[arg(short, long)]
        output: String,
    },

    /// Delete every service entry from the directory container.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

/// `--log-level`, else RUST_LOG, else the config file's level, else `warn`.
fn init_logging(cli: &Cli) {
    let filter = match &cli.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = AppConfig::load_from_file(expand_tilde(&cli.config))
                .map(|c| c.logging.log_level)
                .unwrap_or_else(|_| "warn".to_string());
            EnvFilter::new(level)
        }),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = expand_tilde(&cli.config);
    match cli.command {
        Commands::Init { output } => cmd_init(&expand_tilde(&output)),
        Commands::Validate => cmd_validate(&config_path),
        Commands::List {
            filter,
            file,
            no_ifile,
        } => cmd_list(&config_path, file, no_ifile, filter.as_deref()),
        Commands::Lookup {
            alias,
            domain,
            file,
        } => cmd_lookup(&config_path, &alias, domain, file),
        Commands::Diff { verbose } => cmd_diff(&load_engine(&config_path)?, verbose).await,
        Commands::Sync { json } => cmd_sync(&load_engine(&config_path)?, json).await,
        Commands::Export { output } => {
            cmd_export(&load_engine(&config_path)?, &expand_tilde(&output)).await
        }
        Commands::Clear { yes } => cmd_clear(&load_engine(&config_path)?, yes).await,
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load_and_resolve(path).context("failed to load configuration file")
}

fn load_engine(path: &Path) -> Result<SyncEngine> {
    Ok(SyncEngine::new(load_config(path)?))
}

async fn connect(config: &AppConfig) -> Result<LdapDirectory> {
    config
        .require_bind_password()
        .context("cannot bind to directory")?;
    LdapDirectory::connect(&config.ldap)
        .await
        .context("failed to connect to directory")
}

/// Local registry and default domain, from `--file` or the config.
fn load_local(
    config_path: &Path,
    file: Option<String>,
    follow_ifile: Option<bool>,
) -> Result<(Registry, String, PathBuf)> {
    match file {
        Some(file) => {
            let path = expand_tilde(&file);
            let registry = parse_tnsnames(&path, follow_ifile.unwrap_or(true))
                .with_context(|| format!("failed to parse {}", path.display()))?;
            let domain = read_default_domain(&sqlnet_path_for(&path))
                .context("failed to read sqlnet.ora")?
                .unwrap_or_default();
            Ok((registry, domain, path))
        }
        None => {
            let mut config = load_config(config_path)?;
            if let Some(follow) = follow_ifile {
                config.tns.follow_ifile = follow;
            }
            let path = config.tns.file.clone();
            let engine = SyncEngine::new(config);
            let registry = engine.load_local().context("failed to parse tnsnames file")?;
            let domain = engine.domain().context("failed to determine default domain")?;
            Ok((registry, domain, path))
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(output: &Path) -> Result<()> {
    let default_config = r#"# tnsync configuration

[tns]
file = "/opt/oracle/network/admin/tnsnames.ora"
follow_ifile = true
# Falls back to NAMES.DEFAULT_DOMAIN in the sqlnet.ora next to `file`.
# default_domain = "example.com"

[ldap]
url = "ldap://oid.example.com:389"
bind_dn = "cn=orcladmin,cn=Users,dc=example,dc=com"
bind_password_env = "TNSYNC_LDAP_PASSWORD"
base_dn = "dc=example,dc=com"
context = "cn=OracleContext"
timeout_secs = 20
starttls = false
no_tls_verify = false

[schema]
object_class = "orclNetService"
name_attribute = "cn"
descriptor_attribute = "orclNetDescString"
alias_attribute = "aliasedObjectName"

[logging]
log_level = "warn"
"#;

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, default_config).context("failed to write config file")?;

    println!(
        "{}",
        style::success(&format!("Default configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Edit the config file with your tnsnames path and directory details");
    println!("  2. Set the bind password variable (TNSYNC_LDAP_PASSWORD)");
    println!("  3. Validate with: tnsync validate --config {}", output.display());
    println!("  4. Preview changes: tnsync diff --config {}", output.display());

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  {}", style::success("TOML structure is valid"));

    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    println!("  {}", style::success("Environment variable references processed"));

    if let Err(e) = config.validate() {
        println!("  {}", style::error(&format!("Validation error: {}", e)));
        anyhow::bail!("configuration validation failed");
    }
    println!("  {}", style::success("All required fields are valid"));
    if let Err(e) = config.require_bind_password() {
        println!("  {}", style::warn(&e.to_string()));
    }

    println!();
    println!("{}", style::header("Configuration summary:"));
    println!("  tnsnames file : {}", config.tns.file.display());
    println!("  Follow IFILE  : {}", config.tns.follow_ifile);
    println!(
        "  Default domain: {}",
        config.tns.default_domain.as_deref().unwrap_or("(from sqlnet.ora)")
    );
    println!("  Directory URL : {}", config.ldap.url);
    println!(
        "  Bind DN       : {}",
        if config.ldap.bind_dn.is_empty() {
            "(anonymous)"
        } else {
            config.ldap.bind_dn.as_str()
        }
    );
    println!(
        "  Bind password : {}",
        if config.ldap.bind_password.is_some() {
            "set"
        } else {
            "NOT SET"
        }
    );
    println!("  Container     : {}", config.ldap.container_dn());
    println!("  Object class  : {}", config.schema.object_class);
    println!();
    println!("Configuration is valid.");

    Ok(())
}

fn cmd_list(
    config_path: &Path,
    file: Option<String>,
    no_ifile: bool,
    filter: Option<&str>,
) -> Result<()> {
    let follow = if no_ifile { Some(false) } else { None };
    let (registry, _, path) = load_local(config_path, file, follow)?;
    let registry = match filter {
        Some(pattern) => filter_registry(&registry, pattern)?,
        None => registry,
    };

    if registry.is_empty() {
        println!("No aliases found in {}.", path.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Alias", "Service", "Addresses", "Source"]);

    for entry in registry.iter() {
        let addresses: Vec<String> = entry.addresses.iter().map(|a| a.to_string()).collect();
        table.add_row(vec![
            Cell::new(&entry.name),
            Cell::new(&entry.service),
            Cell::new(addresses.join("\n")),
            Cell::new(&entry.source),
        ]);
    }

    println!("{}", table);
    println!("{} alias(es) shown", registry.len());
    Ok(())
}

fn cmd_lookup(
    config_path: &Path,
    alias: &str,
    domain: Option<String>,
    file: Option<String>,
) -> Result<()> {
    let (registry, default_domain, path) = load_local(config_path, file, None)?;
    let domain = domain.unwrap_or(default_domain);

    let entry = resolve_alias(alias, &registry, &domain).ok_or_else(|| {
        anyhow::anyhow!(
            "alias '{}' not found in {} (domain '{}')",
            alias,
            path.display(),
            domain
        )
    })?;

    println!("{}", style::header(&entry.name));
    println!("  Source   : {}", entry.source);
    println!(
        "  Service  : {}",
        if entry.service.is_empty() { "-" } else { entry.service.as_str() }
    );
    for address in &entry.addresses {
        println!("  Address  : {}", address);
    }
    println!();
    println!("{}", entry.description);
    Ok(())
}

async fn cmd_diff(engine: &SyncEngine, verbose: bool) -> Result<()> {
    let mut directory = connect(engine.config()).await?;
    let plan = engine.plan(&mut directory).await;
    directory.unbind().await;
    let plan = plan.context("failed to compute differences")?;

    let changes: Vec<(&str, SyncStatus)> = plan.changes().collect();
    if changes.is_empty() {
        println!(
            "{}",
            style::success(&format!(
                "Directory is up to date ({} aliases)",
                plan.classification.len()
            ))
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Alias", "Change"]);
    for (alias, status) in &changes {
        table.add_row(vec![Cell::new(alias), style::status_cell(*status)]);
    }
    println!("{}", table);
    println!(
        "{} change(s), {} unchanged",
        changes.len(),
        plan.classification.count(SyncStatus::Unchanged)
    );

    if verbose {
        for (alias, _) in changes.iter().filter(|(_, s)| *s == SyncStatus::Modified) {
            let remote = resolve_alias(alias, &plan.mirror, &plan.domain)
                .or_else(|| plan.mirror.get(alias));
            let local = plan.local.get(alias);
            if let (Some(remote), Some(local)) = (remote, local) {
                let patch = diffy::create_patch(&remote.description, &local.description);
                println!();
                println!("{}", style::header(alias));
                println!("{}", style::patch(&patch.to_string()));
            }
        }
    }
    Ok(())
}

async fn cmd_sync(engine: &SyncEngine, json: bool) -> Result<()> {
    let mut directory = connect(engine.config()).await?;
    let report = engine.run(&mut directory).await;
    directory.unbind().await;
    let report = report.context("sync failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", style::header("Sync completed:"));
        println!("  Local aliases    : {}", report.local_count);
        println!("  Directory aliases: {}", report.mirror_count);
        print_tally(&report.tally);
        println!("  Started at : {}", report.started_at);
        if let Some(ref completed) = report.completed_at {
            println!("  Completed  : {}", completed);
        }
    }

    let skipped = report.tally.count(SyncStatus::Skip);
    if skipped > 0 {
        anyhow::bail!("{} alias(es) could not be applied", skipped);
    }
    Ok(())
}

async fn cmd_export(engine: &SyncEngine, output: &Path) -> Result<()> {
    let mut directory = connect(engine.config()).await?;
    let mirror = engine.read_mirror(&mut directory).await;
    directory.unbind().await;
    let mirror = mirror.context("failed to read directory entries")?;

    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    write_tnsnames(&mirror, BufWriter::new(file)).context("failed to write tnsnames file")?;

    println!(
        "{}",
        style::success(&format!(
            "Exported {} alias(es) to {}",
            mirror.len(),
            output.display()
        ))
    );
    Ok(())
}

async fn cmd_clear(engine: &SyncEngine, yes: bool) -> Result<()> {
    let container = engine.layout().container_dn.clone();
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete every service entry under {}?", container))
            .default(false)
            .interact()
            .context("failed to read confirmation")?;
        if !confirmed {
            println!("{}", style::warn("Clear cancelled. No entries were deleted."));
            return Ok(());
        }
    }

    let mut directory = connect(engine.config()).await?;
    let tally = engine.clear(&mut directory).await;
    directory.unbind().await;
    let tally = tally.context("failed to clear directory")?;

    print_tally(&tally);
    let skipped = tally.count(SyncStatus::Skip);
    if skipped > 0 {
        anyhow::bail!("{} entr(ies) could not be deleted", skipped);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Utilities
// ---------------------------------------------------------------------------

fn print_tally(tally: &WorkTally) {
    for status in SyncStatus::ALL {
        println!("  {:<15}: {}", status.to_string(), tally.count(status));
    }
    for failure in &tally.failures {
        println!(
            "  {}",
            style::warn(&format!(
                "{} ({}): {}",
                failure.alias, failure.intended, failure.reason
            ))
        );
    }
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::try_parse_from(["tnsync", "--config", "x.toml", "diff", "-v"]).unwrap();
        assert_eq!(cli.config, "x.toml");
        assert!(matches!(cli.command, Commands::Diff { verbose: true }));

        let cli = Cli::try_parse_from(["tnsync", "list", "--no-ifile", "-f", "^PROD"]).unwrap();
        assert_eq!(cli.config, "/etc/tnsync/config.toml");
        match cli.command {
            Commands::List {
                filter, no_ifile, ..
            } => {
                assert_eq!(filter.as_deref(), Some("^PROD"));
                assert!(no_ifile);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["tnsync", "export"]).is_err());
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde("/etc/tnsync/config.toml"), PathBuf::from("/etc/tnsync/config.toml"));
        assert_eq!(expand_tilde("rel/path"), PathBuf::from("rel/path"));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tnsync.toml");
        cmd_init(&path).unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert!(config.validate().is_ok());
        assert!(cmd_init(&path).is_err());
    }

    #[test]
    fn test_lookup_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let tns = tmp.path().join("tnsnames.ora");
        std::fs::write(&tns, "XE.LAB = (DESCRIPTION=(CONNECT_DATA=(SERVICE_NAME=XE)))\n").unwrap();
        std::fs::write(tmp.path().join("sqlnet.ora"), "NAMES.DEFAULT_DOMAIN = lab\n").unwrap();

        let file = Some(tns.display().to_string());
        let missing_config = tmp.path().join("none.toml");
        assert!(cmd_lookup(&missing_config, "xe", None, file.clone()).is_ok());
        assert!(cmd_lookup(&missing_config, "xe", Some(String::new()), file).is_err());
    }
}
