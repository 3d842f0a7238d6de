//! `rollcall` - CLI for the alumni directory
//!
//! This binary runs the join and edit wizards in a terminal, crops pictures,
//! and lists directory members.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use chrono::{Datelike, Utc};
use clap::Parser;
use serde_json::json;
use tracing::{debug, info};

use rollcall::cli::{
    Cli, Command, ConfigCommand, CropCommand, DraftCommand, ImportCommand, ListCommand,
    RunOutcome, TerminalRunner,
};
use rollcall::crop::{self, data_uri, CropPipeline, CropView};
use rollcall::form::RawImage;
use rollcall::gate::AccessGate;
use rollcall::identity::{MagicLinkLogin, StaticIdentity};
use rollcall::import::RosterImport;
use rollcall::objects::LocalObjectStore;
use rollcall::ports::{AnalyticsSink, IdentityProvider, OwnerId, ProfileStore};
use rollcall::session::{FileSlotStore, SlotStore};
use rollcall::{
    analytics::TracingAnalytics, init_logging, Config, DirectoryFilter, DraftStore, Error,
    Services, SqliteProfileStore, SubmitAction, SubmitOutcome, WizardHost, WizardShell,
};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Reports wizard completion to the log; the terminal output comes from the
/// runner.
#[derive(Debug)]
struct CliHost;

impl WizardHost for CliHost {
    fn on_complete(&self, outcome: &SubmitOutcome) {
        info!(id = %outcome.profile.id, action = ?outcome.action, "profile stored");
    }

    fn on_close(&self) {
        debug!("wizard closed from terminal");
    }
}

#[tokio::main]
async fn main() -> CliResult {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Join(cmd) => {
            let services = build_services(&config, cli.owner.as_deref())?;
            unlock(&config)?;
            if cmd.fresh {
                services.drafts.discard()?;
            }
            let shell = WizardShell::join(services, Arc::new(CliHost))?;
            run_wizard(shell).await
        }
        Command::Edit(cmd) => {
            let services = build_services(&config, cli.owner.as_deref())?;
            unlock(&config)?;
            handle_edit(services, cmd.fresh).await
        }
        Command::Crop(cmd) => handle_crop(&config, &cmd).await,
        Command::List(cmd) => {
            let services = build_services(&config, cli.owner.as_deref())?;
            unlock(&config)?;
            handle_list(&services, cmd).await
        }
        Command::Draft(cmd) => {
            let drafts = DraftStore::new(session_slots(&config)?);
            handle_draft(&drafts, cmd)
        }
        Command::Import(cmd) => handle_import(&config, &cmd).await,
        Command::Login(cmd) => {
            let services = build_services(&config, cli.owner.as_deref())?;
            let login = MagicLinkLogin::new(services.identity, config.auth.redirect_url.clone());
            println!("{}", login.request(&cmd.email).await?);
            Ok(())
        }
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn session_slots(config: &Config) -> CliResult<Arc<dyn SlotStore>> {
    Ok(Arc::new(FileSlotStore::open(config.session_dir())?))
}

fn build_services(config: &Config, owner: Option<&str>) -> CliResult<Services> {
    let identity = match owner.or(config.auth.owner.as_deref()) {
        Some(owner) => StaticIdentity::signed_in(OwnerId::new(owner), config.auth.email.clone()),
        None => StaticIdentity::signed_out(),
    };

    Ok(Services {
        identity: Arc::new(identity),
        profiles: Arc::new(SqliteProfileStore::open(config.database_path())?),
        objects: Arc::new(LocalObjectStore::open(
            config.media_root(),
            config.public_base_url(),
        )?),
        analytics: Arc::new(TracingAnalytics),
        crop: CropPipeline::new(config.crop_settings()),
        drafts: DraftStore::new(session_slots(config)?),
    })
}

/// Prompt for the shared password unless this session already passed.
fn unlock(config: &Config) -> CliResult {
    let gate = AccessGate::new(config.gate.password_hash.as_deref(), session_slots(config)?)?;
    if gate.is_granted()? {
        return Ok(());
    }

    print!("Directory password: ");
    io::stdout().flush()?;
    let mut password = String::new();
    io::stdin().lock().read_line(&mut password)?;
    gate.unlock(password.trim_end_matches(['\r', '\n']))?;
    Ok(())
}

async fn run_wizard(mut shell: WizardShell) -> CliResult {
    let stdin = io::stdin();
    let mut runner = TerminalRunner::new(stdin.lock(), io::stdout());
    match runner.run(&mut shell).await? {
        RunOutcome::Completed(outcome) => {
            let verb = match outcome.action {
                SubmitAction::Inserted => "added to",
                SubmitAction::Updated => "updated in",
            };
            println!("Profile {verb} the directory.");
        }
        RunOutcome::Closed | RunOutcome::Suspended => {}
    }
    Ok(())
}

async fn handle_edit(services: Services, fresh: bool) -> CliResult {
    let session = services
        .identity
        .current_session()
        .await?
        .ok_or(Error::NotAuthenticated)?;
    let Some(existing) = services.profiles.select_by_owner(&session.owner).await? else {
        let message = format!(
            "No profile found for {}. Run `rollcall join` first.",
            session.owner
        );
        return Err(message.into());
    };
    if fresh {
        services.drafts.discard()?;
    }
    let shell = WizardShell::edit(services, Arc::new(CliHost), &existing)?;
    run_wizard(shell).await
}

async fn handle_crop(config: &Config, cmd: &CropCommand) -> CliResult {
    let raw = RawImage {
        file_name: cmd
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        mime_type: crop::mime_for_path(&cmd.input).to_string(),
        bytes: tokio::fs::read(&cmd.input).await?,
    };
    crop::screen(&raw)?;

    let mut settings = config.crop_settings();
    if let Some(size) = cmd.size {
        settings.target_size = size;
    }
    let view = CropView {
        offset_x: cmd.offset_x,
        offset_y: cmd.offset_y,
        zoom: cmd.zoom,
    };
    let uri = CropPipeline::new(settings)
        .crop_in_background(raw, view)
        .await?;

    match &cmd.output {
        Some(path) => {
            let (_, bytes) = data_uri::decode(&uri)?;
            tokio::fs::write(path, bytes).await?;
            println!(
                "Wrote {size}x{size} picture to {}",
                path.display(),
                size = settings.target_size
            );
        }
        None => println!("{uri}"),
    }
    Ok(())
}

async fn handle_list(services: &Services, cmd: ListCommand) -> CliResult {
    let filter = DirectoryFilter {
        search: cmd.search.unwrap_or_default(),
        spheres: cmd.spheres,
        locations: cmd.locations,
        oldest_first: cmd.oldest,
    };
    if filter.is_active() {
        services.analytics.capture(
            "used_search",
            json!({
                "search": filter.search,
                "spheres": filter.spheres,
                "locations": filter.locations,
            }),
        );
    }

    let profiles = services.profiles.select_all().await?;
    let listed = filter.apply(&profiles);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    if listed.is_empty() {
        println!("No members match.");
        return Ok(());
    }
    for profile in &listed {
        let record = &profile.record;
        println!(
            "{:<3} {:<24} {:<32} {:<10} {:<18} {}",
            profile.initials(),
            record.name,
            profile.headline(),
            record.pledge_class,
            record.location,
            record.sphere.join(", ")
        );
    }
    println!();
    println!("{} of {} members", listed.len(), profiles.len());
    Ok(())
}

async fn handle_import(config: &Config, cmd: &ImportCommand) -> CliResult {
    let roster = tokio::fs::read_to_string(&cmd.file).await?;
    let profiles = Arc::new(SqliteProfileStore::open(config.database_path())?);

    let mut import = RosterImport::new(profiles, Utc::now().year());
    if let Some(year) = cmd.latest_year {
        import = import.latest_year(year);
    }
    let report = import.run(&roster).await?;

    for email in &report.inserted {
        println!("Inserted: {email}");
    }
    for skipped in &report.skipped {
        let who = if skipped.email.is_empty() {
            format!("line {}", skipped.line)
        } else {
            skipped.email.clone()
        };
        println!("Skipped {who}: {}", skipped.reason);
    }
    println!(
        "Done. Inserted: {}, Skipped: {}",
        report.inserted.len(),
        report.skipped.len()
    );
    Ok(())
}

fn handle_draft(drafts: &DraftStore, cmd: DraftCommand) -> CliResult {
    match cmd {
        DraftCommand::Show { json } => match drafts.peek()? {
            None => println!("No saved draft."),
            Some(snapshot) if json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
            Some(snapshot) => {
                let step = rollcall::Step::at(snapshot.step_index);
                println!("Saved draft");
                println!("===========");
                println!("  Saved at:  {}", snapshot.saved_at.to_rfc3339());
                println!("  Step:      {} ({})", snapshot.step_index, step.key());
                println!("  Name:      {}", snapshot.form.name);
                println!("  Email:     {}", snapshot.form.email);
                let picture = if snapshot.form.cropped_image.is_some() {
                    "saved"
                } else {
                    "none"
                };
                println!("  Picture:   {picture}");
            }
        },
        DraftCommand::Clear => {
            drafts.discard()?;
            println!("Draft cleared.");
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> CliResult {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Wizard]");
                println!("  Picture size:       {}", config.wizard.target_size);
                println!(
                    "  Zoom range:         {}-{}",
                    config.wizard.zoom_min, config.wizard.zoom_max
                );
                println!("  JPEG quality:       {}", config.wizard.jpeg_quality);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Media]");
                println!("  Picture directory:  {}", config.media_root().display());
                println!("  Public base URL:    {}", config.public_base_url());
                println!();
                println!("[Session]");
                println!("  Slot directory:     {}", config.session_dir().display());
                println!();
                println!("[Auth]");
                println!("  Redirect URL:       {}", config.auth.redirect_url);
                println!(
                    "  Owner:              {}",
                    config.auth.owner.as_deref().unwrap_or("(signed out)")
                );
                println!();
                println!("[Gate]");
                println!(
                    "  Password required:  {}",
                    config.gate.password_hash.is_some()
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
