//! UnsaidTalks CLI - command-line front end for the mentorship dashboard core
//!
//! Drives the session controller, authorization gates and fetch controllers
//! against the configured data service.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use unsaidtalks_applications::{
    value_producer, AuthorizationGate, FetchOptions, FileSlotStore, GateDecision, HttpDataService,
    PollOptions, PollingResource, Protected, ResourceFetch, Role, SessionController, SessionInput,
    SessionPatch, SessionState, SessionStore,
};
use unsaidtalks_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, performance,
    DashboardConfig, DataService,
};

#[derive(Parser)]
#[command(name = "unsaidtalks")]
#[command(about = "Session, authorization and data access for the UnsaidTalks dashboard")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and persist the session
    Login {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// mentee, mentor, admin or super-admin
        #[arg(long)]
        role: Role,
        #[arg(long)]
        avatar: Option<String>,
    },

    /// Clear the current session
    Logout,

    /// Show the current session
    Whoami,

    /// Update fields of the current session
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        avatar: Option<String>,
    },

    /// Evaluate an authorization gate for a location
    Check {
        /// Requested location, e.g. /mentor/dashboard
        location: String,

        /// Accepted roles, comma separated; empty accepts any session
        #[arg(long, value_delimiter = ',')]
        roles: Vec<Role>,

        /// Use a predefined gate instead of --roles
        #[arg(long, value_enum, conflicts_with = "roles")]
        preset: Option<GatePreset>,

        /// Whether the view supplies fallback content
        #[arg(long)]
        fallback: bool,

        /// Where anonymous visitors are sent
        #[arg(long, default_value = unsaidtalks_applications::auth::DEFAULT_LOGIN_PATH)]
        redirect_to: String,
    },

    /// Fetch an endpoint once
    Fetch {
        /// Endpoint path, e.g. /api/dashboard/mentor/stats
        endpoint: String,

        /// Roles allowed to read it
        #[arg(long, value_delimiter = ',')]
        roles: Vec<Role>,
    },

    /// Poll an endpoint
    Poll {
        endpoint: String,

        /// Delay between polls; defaults to polling.interval_ms
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop after this many settled ticks
        #[arg(long, default_value = "3")]
        ticks: u32,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Validate the configuration
    Validate,
}

#[derive(Clone, Copy, ValueEnum)]
enum GatePreset {
    Mentee,
    Mentor,
    Admin,
    SuperAdmin,
}

impl GatePreset {
    fn gate(self) -> AuthorizationGate {
        match self {
            GatePreset::Mentee => AuthorizationGate::mentee_only(),
            GatePreset::Mentor => AuthorizationGate::mentor_only(),
            GatePreset::Admin => AuthorizationGate::admin_only(),
            GatePreset::SuperAdmin => AuthorizationGate::super_admin_only(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Cli {
        command,
        config: config_path,
        verbose,
    } = Cli::parse();

    let (config, source) = load_config(config_path.as_deref())?;

    let mut logging = config.logging.clone();
    if verbose {
        logging = logging.verbose();
    }
    init_logging(&logging).map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    match &source {
        Some(path) => info!(path = %path.display(), "Loaded configuration"),
        None => info!("No configuration file found, using defaults"),
    }

    match command {
        Commands::Login {
            id,
            name,
            email,
            role,
            avatar,
        } => handle_login(&open_session(&config)?, id, name, email, role, avatar),
        Commands::Logout => handle_logout(&open_session(&config)?),
        Commands::Whoami => handle_whoami(&open_session(&config)?),
        Commands::Update {
            name,
            email,
            role,
            avatar,
        } => handle_update(&open_session(&config)?, name, email, role, avatar),
        Commands::Check {
            location,
            roles,
            preset,
            fallback,
            redirect_to,
        } => {
            let gate = match preset {
                Some(preset) => preset.gate(),
                None => AuthorizationGate::with_roles(roles),
            }
            .with_fallback(fallback)
            .redirect_to(redirect_to);
            handle_check(&open_session(&config)?, &gate, &location)
        }
        Commands::Fetch { endpoint, roles } => {
            handle_fetch(&open_session(&config)?, &config, endpoint, roles).await
        }
        Commands::Poll {
            endpoint,
            interval_ms,
            ticks,
        } => handle_poll(&config, endpoint, interval_ms, ticks).await,
        Commands::Config { action } => handle_config(action, &config, config_path),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<(DashboardConfig, Option<PathBuf>)> {
    let candidate = match path {
        Some(path) => Some(path.to_path_buf()),
        None => [
            Some(DashboardConfig::default_path()),
            dirs::config_dir().map(|d| d.join("unsaidtalks").join("config.toml")),
            Some(PathBuf::from("unsaidtalks.toml")),
        ]
        .into_iter()
        .flatten()
        .find(|path| path.exists()),
    };

    let config = match &candidate {
        Some(path) => DashboardConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => DashboardConfig::default(),
    }
    .with_env_overrides();
    config.validate()?;

    Ok((config, candidate))
}

fn open_session(config: &DashboardConfig) -> anyhow::Result<SessionController> {
    let slot = FileSlotStore::new(config.data_dir())?;
    let store = SessionStore::new(Arc::new(slot), config.storage.session_key.clone());
    let controller = SessionController::new(store);
    let state = controller.hydrate();
    debug!(state = state.label(), "Session hydrated");
    Ok(controller)
}

fn handle_login(
    controller: &SessionController,
    id: String,
    name: String,
    email: String,
    role: Role,
    avatar: Option<String>,
) -> anyhow::Result<()> {
    log_operation_start!("login", role = %role);
    let mut input = SessionInput::new(id, name, email, role);
    if let Some(avatar) = avatar {
        input = input.with_avatar(avatar);
    }

    match controller.login(input) {
        Ok(session) => {
            log_operation_success!("login", user_id = %session.id);
            println!("Logged in as {} ({})", session.name, session.role);
            Ok(())
        }
        Err(e) => {
            log_operation_error!("login", e);
            Err(e.into())
        }
    }
}

fn handle_logout(controller: &SessionController) -> anyhow::Result<()> {
    let was_authenticated = controller.is_authenticated();
    controller.logout()?;
    if was_authenticated {
        println!("Logged out");
    } else {
        println!("Not logged in");
    }
    Ok(())
}

fn handle_whoami(controller: &SessionController) -> anyhow::Result<()> {
    match controller.state() {
        SessionState::Authenticated(session) => {
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        other => println!("{}", other.label()),
    }
    Ok(())
}

fn handle_update(
    controller: &SessionController,
    name: Option<String>,
    email: Option<String>,
    role: Option<Role>,
    avatar: Option<String>,
) -> anyhow::Result<()> {
    if !controller.is_authenticated() {
        bail!("Not logged in");
    }

    let mut patch = SessionPatch::default();
    if let Some(name) = name {
        patch = patch.name(name);
    }
    if let Some(email) = email {
        patch = patch.email(email);
    }
    if let Some(role) = role {
        patch = patch.role(role);
    }
    if let Some(avatar) = avatar {
        patch = patch.avatar(avatar);
    }
    if patch.is_empty() {
        bail!("Nothing to update; pass at least one of --name, --email, --role, --avatar");
    }

    controller.update_user(patch)?;
    handle_whoami(controller)
}

fn handle_check(
    controller: &SessionController,
    gate: &AuthorizationGate,
    location: &str,
) -> anyhow::Result<()> {
    let decision = gate.evaluate(&controller.state(), location);
    match &decision {
        GateDecision::Loading => println!("loading"),
        GateDecision::Allow => println!("allow"),
        GateDecision::Fallback => println!("fallback"),
        GateDecision::Redirect { to, from } => println!("redirect to {} (from {})", to, from),
        GateDecision::Denied { .. } => {
            println!("denied: {}", decision.denial_message().unwrap_or_default())
        }
    }
    Ok(())
}

async fn handle_fetch(
    controller: &SessionController,
    config: &DashboardConfig,
    endpoint: String,
    roles: Vec<Role>,
) -> anyhow::Result<()> {
    let service: Arc<dyn DataService> = Arc::new(HttpDataService::new(&config.api)?);
    let gate = AuthorizationGate::with_roles(roles);

    let view = gate.protect(&controller.state(), &endpoint, |session| {
        debug!(user_id = %session.id, endpoint = %endpoint, "Authorized fetch");
        ResourceFetch::with_options(
            value_producer(service, endpoint.clone()),
            FetchOptions::labeled(endpoint.clone()).with_timeout(config.fetch_timeout()),
        )
    });
    let fetch = match view {
        Protected::Content(fetch) => fetch,
        Protected::Loading => bail!("Session is still loading"),
        Protected::Redirect { to, from } => bail!("Not logged in; sign in at {} to open {}", to, from),
        Protected::Fallback => bail!("{} is not available for your role", endpoint),
        Protected::Denied { message } => bail!(message),
    };

    let mut updates = fetch.subscribe();
    fetch.mount();
    let state = performance::measure_async("fetch", updates.wait_for(|s| !s.loading))
        .await?
        .clone();
    fetch.dispose();

    match (state.error, state.data) {
        (Some(error), _) => bail!(error),
        (None, Some(data)) => println!("{}", serde_json::to_string_pretty(&data)?),
        (None, None) => println!("null"),
    }
    Ok(())
}

async fn handle_poll(
    config: &DashboardConfig,
    endpoint: String,
    interval_ms: Option<u64>,
    ticks: u32,
) -> anyhow::Result<()> {
    let interval = interval_ms
        .map(std::time::Duration::from_millis)
        .unwrap_or_else(|| config.poll_interval());
    if interval.is_zero() {
        bail!("--interval-ms must be greater than 0");
    }

    let service: Arc<dyn DataService> = Arc::new(HttpDataService::new(&config.api)?);
    let poll = PollingResource::with_options(
        value_producer(service, endpoint.clone()),
        PollOptions::new(endpoint, interval).with_timeout(config.fetch_timeout()),
    );
    let mut updates = poll.subscribe();
    poll.start();

    let observe = async {
        let mut settled = 0;
        while settled < ticks {
            updates.changed().await?;
            let state = updates.borrow_and_update().clone();
            if state.loading {
                continue;
            }
            settled += 1;
            match (&state.error, &state.data) {
                (Some(error), _) => eprintln!("[{}] error: {}", settled, error),
                (None, Some(data)) => println!("[{}] {}", settled, serde_json::to_string(data)?),
                (None, None) => {}
            }
        }
        anyhow::Ok(())
    };

    tokio::select! {
        result = observe => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }
    poll.dispose();
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    config: &DashboardConfig,
    path: Option<PathBuf>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(config)?);
        }
        ConfigAction::Init { force } => {
            let path = path.unwrap_or_else(DashboardConfig::default_path);
            if path.exists() && !force {
                bail!("{} already exists; pass --force to overwrite", path.display());
            }
            DashboardConfig::default().save_to_file(&path)?;
            println!("Configuration written to {}", path.display());
        }
        ConfigAction::Validate => {
            config.validate()?;
            println!("Configuration is valid");
        }
    }
    Ok(())
}
