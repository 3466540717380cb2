mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use agentforge_client::{
    EditorSession, ExecutionWatcher, FallbackCache, HttpAgentClient, SaveOutcome,
};
use agentforge_core::{
    Agent, AgentId, AgentRepository, AppConfig, EventBus, ExecutionGateway, ForgeEvent,
    ValidationPolicy, Validator,
};
use agentforge_planner::{plan, ProgressScript};

#[derive(Parser)]
#[command(name = "agentforge", version, about = "Build and run automation agents from the terminal")]
struct Cli {
    /// Path to config file (default: ./agentforge.toml, then ~/.agentforge/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a starter agent from a plain-language description
    Create {
        /// What the agent should do
        #[arg(trailing_var_arg = true, required = true)]
        description: Vec<String>,
        /// Save the generated agent to the backend
        #[arg(long)]
        save: bool,
        /// Write the generated agent as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the node types available to agents
    Templates,
    /// List saved agents
    List,
    /// Print a saved agent as JSON
    Show {
        id: String,
    },
    /// Check an agent file for save and execution readiness
    Validate {
        /// Agent JSON file
        file: PathBuf,
        /// Enforce every structural rule, whatever the config says
        #[arg(long)]
        strict: bool,
    },
    /// Save an agent file to the backend (created if it has no id)
    Push {
        /// Agent JSON file
        file: PathBuf,
    },
    /// Execute a saved agent
    Run {
        id: String,
        /// Keep polling execution records until Ctrl-C
        #[arg(long)]
        watch: bool,
    },
    /// Show execution records of a saved agent
    Executions {
        id: String,
    },
    /// Delete a saved agent
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Push agents cached while the backend was unreachable
    Sync,
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Shared collaborators for commands that talk to the backend.
struct App {
    config: AppConfig,
    http: Arc<HttpAgentClient>,
    event_bus: Arc<EventBus>,
}

impl App {
    fn new(config: AppConfig) -> anyhow::Result<Self> {
        let http = Arc::new(HttpAgentClient::new(&config.api)?);
        Ok(Self {
            config,
            http,
            event_bus: Arc::new(EventBus::default()),
        })
    }

    fn cache(&self) -> anyhow::Result<Arc<FallbackCache>> {
        let path = self.config.fallback_db_path();
        let cache = FallbackCache::open(&path)
            .with_context(|| format!("opening fallback cache at {}", path.display()))?;
        Ok(Arc::new(cache))
    }

    fn session(&self) -> anyhow::Result<EditorSession> {
        Ok(EditorSession::new(
            self.http.clone(),
            self.http.clone(),
            self.event_bus.clone(),
        )
        .with_cache(self.cache()?)
        .with_policy(self.config.validation))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "agentforge", &mut std::io::stdout());
        return Ok(());
    }

    let config = AppConfig::discover(cli.config.as_deref())?;

    // Initialize tracing
    let fallback_filter = config.log.filter.clone();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Templates => {
            render::templates();
            Ok(())
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Validate { file, strict } => {
            let policy = if strict {
                ValidationPolicy::strict()
            } else {
                config.validation
            };
            validate_file(&file, policy)
        }
        command => {
            let app = App::new(config)?;
            run_command(&app, command).await
        }
    }
}

async fn run_command(app: &App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Create {
            description,
            save,
            output,
        } => create(app, &description.join(" "), save, output.as_deref()).await,
        Commands::List => {
            let agents = app.http.list().await?;
            render::agent_list(&agents);
            Ok(())
        }
        Commands::Show { id } => {
            let agent = app.http.get(&AgentId::from(id)).await?;
            println!("{}", serde_json::to_string_pretty(&agent)?);
            Ok(())
        }
        Commands::Push { file } => {
            let agent = read_agent(&file)?;
            let mut session = app.session()?;
            session.load(agent);
            report_save(session.save().await?);
            Ok(())
        }
        Commands::Run { id, watch } => run_agent(app, AgentId::from(id), watch).await,
        Commands::Executions { id } => {
            let records = app.http.executions(&AgentId::from(id)).await?;
            render::executions(&records);
            Ok(())
        }
        Commands::Delete { id, yes } => {
            let id = AgentId::from(id);
            if !yes {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete agent {}?", id))
                    .default(false)
                    .interact()
                    .unwrap_or(false);
                if !confirmed {
                    println!("Aborted.");
                    return Ok(());
                }
            }
            let mut session = app.session()?;
            session.open(&id).await?;
            session.delete().await?;
            println!("Deleted {}", id);
            Ok(())
        }
        Commands::Sync => {
            let cache = app.cache()?;
            if cache.is_empty()? {
                println!("Nothing to sync.");
                return Ok(());
            }
            let report = cache.flush(app.http.as_ref()).await?;
            render::flush_report(&report);
            if !report.failed.is_empty() {
                bail!("{} cached agent(s) still not accepted", report.failed.len());
            }
            Ok(())
        }
        // Handled before the backend client is built.
        Commands::Templates
        | Commands::Config
        | Commands::Validate { .. }
        | Commands::Completions { .. } => Ok(()),
    }
}

async fn create(
    app: &App,
    description: &str,
    save: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    // Fail on blank input before playing the progress script.
    let plan = plan(description)?;

    let mut rx = app.event_bus.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let ForgeEvent::PlanningStep {
                index,
                total,
                message,
            } = event
            {
                println!("[{}/{}] {}", index, total, message);
                if index == total {
                    break;
                }
            }
        }
    });
    ProgressScript::new(app.event_bus.clone(), app.config.planner.simulate_delays)
        .run()
        .await;
    if let Err(e) = printer.await {
        warn!(error = %e, "Progress printer failed");
    }

    render::plan(&plan.summary, &plan.agent);

    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&plan.agent)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    if save {
        let mut session = app.session()?;
        session.load(plan.agent);
        report_save(session.save().await?);
    }
    Ok(())
}

async fn run_agent(app: &App, id: AgentId, watch: bool) -> anyhow::Result<()> {
    let mut session = app.session()?;
    session.open(&id).await?;
    let ticket = session.run().await?;
    println!("Execution {} for {}", ticket.status, ticket.agent_name);

    if !watch {
        return Ok(());
    }

    let watcher = ExecutionWatcher::new(
        app.http.clone(),
        app.event_bus.clone(),
        app.config.watch.interval(),
    );
    let mut handle = watcher.watch(id);
    println!("Watching executions (Ctrl-C to stop)...");
    loop {
        tokio::select! {
            snapshot = handle.recv() => match snapshot {
                Some(records) => render::executions(&records),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    handle.close().await;
    Ok(())
}

fn validate_file(path: &Path, policy: ValidationPolicy) -> anyhow::Result<()> {
    let agent = read_agent(path)?;
    let validator = Validator::new(policy);

    let save = validator.check_save(&agent);
    let run = validator.check_execution(&agent);
    render::report("save", &save);
    render::report("execution", &run);

    if !save.is_ok() {
        bail!("{} is not ready to save", path.display());
    }
    Ok(())
}

fn read_agent(path: &Path) -> anyhow::Result<Agent> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let agent = serde_json::from_str(&content)
        .with_context(|| format!("parsing agent JSON in {}", path.display()))?;
    Ok(agent)
}

fn report_save(outcome: SaveOutcome) {
    match outcome {
        SaveOutcome::Persisted(agent) => {
            let id = agent.id().map(|id| id.to_string()).unwrap_or_default();
            info!(agent_id = %id, "Saved");
            println!("Saved {} ({})", agent.name, id);
        }
        SaveOutcome::Cached { key, reason } => {
            println!("Backend unreachable ({}); cached locally as {}", reason, key);
            println!("Run `agentforge sync` once the backend is back.");
        }
    }
}
