mod config;
mod progress;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use config::{SitesmithConfig, Workspace, CONFIG_FILE, DEFAULT_DB_NAME, SITESMITH_DIR};
use db::{ProjectRepository, VersionRepository};
use events::EventBus;
use orchestrator::{AgentModel, Orchestrator};
use providers::ProviderKind;
use sitesmith_core::{
    project_name, CostEntry, ExportBundle, Language, NewVersion, PageArtifact, Project, RunStatus,
    Template,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sitesmith")]
#[command(about = "Multi-agent landing page builder", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .sitesmith/ with a default config and an empty project store
    Init,
    /// Run the full pipeline for a business description
    Build {
        description: String,

        #[arg(short, long)]
        template: Option<String>,

        #[arg(short, long)]
        language: Option<String>,

        /// Provider for every agent (openai, anthropic, gemini)
        #[arg(long)]
        provider: Option<ProviderKind>,

        /// Model for every agent; defaults to the provider's default model
        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        no_auto_fix: bool,

        /// Abort when the run has spent more than this many USD
        #[arg(long)]
        max_cost: Option<f64>,

        /// Abort when the run has taken longer than this many seconds
        #[arg(long)]
        max_duration: Option<u64>,
    },
    /// Apply a free-text change to a project's latest page
    Refine { project: String, instruction: String },
    /// Generate A/B copy variants for a project
    Variant {
        project: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Manage stored projects
    Projects {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Write index.html and metadata.json for a project
    Export {
        project: String,

        #[arg(short, long, default_value = "dist")]
        out: PathBuf,
    },
    /// List available templates and languages
    Templates,
}

#[derive(Subcommand)]
enum ProjectCommands {
    List,
    Show { project: String },
    Delete { project: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Init => init_project().await,
        Commands::Build {
            description,
            template,
            language,
            provider,
            model,
            name,
            no_auto_fix,
            max_cost,
            max_duration,
        } => {
            let overrides = BuildOverrides {
                template,
                language,
                provider,
                model,
                no_auto_fix,
                max_cost,
                max_duration,
            };
            build(&description, name, overrides).await
        }
        Commands::Refine {
            project,
            instruction,
        } => refine(&project, &instruction).await,
        Commands::Variant { project, output } => variant(&project, output).await,
        Commands::Projects { command } => match command {
            ProjectCommands::List => list_projects().await,
            ProjectCommands::Show { project } => show_project(&project).await,
            ProjectCommands::Delete { project } => delete_project(&project).await,
        },
        Commands::Export { project, out } => export(&project, out).await,
        Commands::Templates => {
            print_templates();
            Ok(())
        }
    }
}

struct Store {
    projects: ProjectRepository,
    versions: VersionRepository,
}

impl Store {
    async fn open(workspace: &Workspace) -> Result<Self> {
        tokio::fs::create_dir_all(&workspace.dir).await?;
        let pool = db::create_pool(&workspace.database_url())
            .await
            .context("Failed to create database pool")?;
        db::run_migrations(&pool).await?;
        Ok(Self {
            projects: ProjectRepository::new(pool.clone()),
            versions: VersionRepository::new(pool),
        })
    }

    async fn project(&self, reference: &str) -> Result<Project> {
        self.projects
            .find_by_prefix(reference)
            .await?
            .ok_or_else(|| anyhow!("No project matches '{reference}'"))
    }

    /// Latest saved page, falling back to the run's own final page.
    async fn latest_page(&self, project: &Project) -> Result<PageArtifact> {
        if let Some(version) = self.versions.latest(project.id).await? {
            return Ok(version.page());
        }
        project
            .context
            .final_page()
            .cloned()
            .ok_or_else(|| anyhow!("Project {} has no page yet", project.id))
    }
}

async fn load_config(workspace: &Workspace) -> Result<SitesmithConfig> {
    if !workspace.exists() {
        println!(
            "{} no {SITESMITH_DIR} directory found, using defaults",
            "note:".yellow()
        );
    }
    SitesmithConfig::load(&workspace.config_path()).await
}

async fn open_orchestrator(config: &SitesmithConfig, bus: Option<EventBus>) -> Result<Orchestrator> {
    let registry = config.registry();
    if registry.is_empty() {
        bail!("No provider API key found. Set OPENAI_API_KEY, ANTHROPIC_API_KEY or GEMINI_API_KEY.");
    }
    let orchestrator = Orchestrator::new(config.pipeline.clone(), registry)?;
    Ok(match bus {
        Some(bus) => orchestrator.with_event_bus(bus),
        None => orchestrator,
    })
}

fn usage(entries: &[CostEntry]) -> (u64, u64, f64) {
    entries.iter().fold((0, 0, 0.0), |(i, o, c), e| {
        (i + e.input_tokens, o + e.output_tokens, c + e.cost_usd)
    })
}

async fn init_project() -> Result<()> {
    let cwd = std::env::current_dir()?;
    let workspace = Workspace::at(&cwd);

    if workspace.exists() {
        println!("Project already initialized at {}", workspace.dir.display());
        return Ok(());
    }

    println!("Initializing Sitesmith in {}", cwd.display());
    tokio::fs::create_dir_all(&workspace.dir).await?;

    let mut config = SitesmithConfig::default();
    if let Some(name) = cwd.file_name().and_then(|n| n.to_str()) {
        config.project.name = name.to_string();
    }
    let content = toml::to_string_pretty(&config)?;
    tokio::fs::write(workspace.config_path(), content).await?;

    Store::open(&workspace).await?;

    println!();
    println!("Initialized Sitesmith for '{}'", config.project.name);
    println!();
    println!("Created:");
    println!("  {SITESMITH_DIR}/");
    println!("  ├── {CONFIG_FILE}");
    println!("  └── {DEFAULT_DB_NAME}");
    println!();
    println!("Next steps:");
    println!("  1. Export OPENAI_API_KEY, ANTHROPIC_API_KEY or GEMINI_API_KEY");
    println!("  2. Run 'sitesmith build \"<what your business does>\"'");

    Ok(())
}

struct BuildOverrides {
    template: Option<String>,
    language: Option<String>,
    provider: Option<ProviderKind>,
    model: Option<String>,
    no_auto_fix: bool,
    max_cost: Option<f64>,
    max_duration: Option<u64>,
}

impl BuildOverrides {
    fn apply(self, mut config: SitesmithConfig) -> SitesmithConfig {
        let mut pipeline = config.pipeline;
        if let Some(template) = self.template {
            pipeline = pipeline.with_template(template);
        }
        if let Some(language) = self.language {
            pipeline = pipeline.with_language(language);
        }
        if let Some(provider) = self.provider {
            let model = self
                .model
                .clone()
                .unwrap_or_else(|| provider.default_model().to_string());
            pipeline = pipeline.with_default_model(AgentModel::new(provider, model));
            pipeline.models.agents.clear();
        } else if let Some(model) = self.model {
            let provider = pipeline.models.default_model.provider;
            pipeline = pipeline.with_default_model(AgentModel::new(provider, model));
        }
        if self.no_auto_fix {
            pipeline = pipeline.with_auto_fix(false);
        }
        if let Some(max_cost) = self.max_cost {
            pipeline = pipeline.with_max_cost(max_cost);
        }
        if let Some(secs) = self.max_duration {
            pipeline = pipeline.with_max_duration(Duration::from_secs(secs));
        }
        config.pipeline = pipeline;
        config
    }
}

async fn build(description: &str, name: Option<String>, overrides: BuildOverrides) -> Result<()> {
    let workspace = Workspace::current()?;
    let config = overrides.apply(load_config(&workspace).await?);
    let store = Store::open(&workspace).await?;

    let bus = EventBus::new();
    let display = progress::spawn(&bus);
    let orchestrator = open_orchestrator(&config, Some(bus)).await?;

    let outcome = orchestrator.run(description).await;
    display.await.ok();

    let name = name.unwrap_or_else(|| project_name(description));
    match outcome {
        Ok(ctx) => {
            let project = Project::from_run(name, ctx);
            store.projects.save(&project).await?;

            let ctx = &project.context;
            if let Some(page) = ctx.final_page() {
                let summary = ctx.ledger().summary();
                let version = NewVersion::new(page.html.clone(), "Initial build").with_usage(
                    summary.input_tokens,
                    summary.output_tokens,
                    summary.cost_usd,
                );
                store.versions.create(project.id, &version).await?;
            }

            println!();
            println!("{} {}", "Built".green().bold(), project.name);
            println!("  id:    {}", project.id);
            println!("  calls: {}", ctx.ledger().len());
            println!("  cost:  ${:.4}", ctx.total_cost_usd());
            for warning in ctx.warnings() {
                println!("  {} {warning}", "warning:".yellow());
            }
            println!();
            println!("Export it with 'sitesmith export {}'", &project.id.to_string()[..8]);
            Ok(())
        }
        Err(failure) => {
            let cost = failure.total_cost_usd();
            let project = Project::from_run(name, *failure.context);
            store.projects.save(&project).await?;
            println!();
            println!("{} {}", "Failed".red().bold(), failure.error);
            println!("  id:    {}", project.id);
            println!("  spent: ${cost:.4}");
            Err(failure.error.into())
        }
    }
}

async fn refine(reference: &str, instruction: &str) -> Result<()> {
    let workspace = Workspace::current()?;
    let config = load_config(&workspace).await?;
    let store = Store::open(&workspace).await?;
    let project = store.project(reference).await?;
    let page = store.latest_page(&project).await?;

    let orchestrator = open_orchestrator(&config, None).await?;
    let outcome = orchestrator.refine(&page, instruction).await?;
    if !outcome.changed {
        println!("Empty instruction, page unchanged.");
        return Ok(());
    }

    let (input_tokens, output_tokens, cost) = usage(&outcome.entries);
    let version = NewVersion::new(outcome.page.html, instruction.trim())
        .with_usage(input_tokens, output_tokens, cost);
    let version = store.versions.create(project.id, &version).await?;

    println!(
        "{} {} version {} (${:.4})",
        "Refined".green().bold(),
        project.name,
        version.version_number,
        cost
    );
    Ok(())
}

async fn variant(reference: &str, output: Option<PathBuf>) -> Result<()> {
    let workspace = Workspace::current()?;
    let config = load_config(&workspace).await?;
    let store = Store::open(&workspace).await?;
    let project = store.project(reference).await?;
    let copy = project
        .context
        .copy()
        .ok_or_else(|| anyhow!("Project {} has no copy to vary", project.id))?;

    let orchestrator = open_orchestrator(&config, None).await?;
    let outcome = orchestrator.generate_variant(copy).await?;
    let json = serde_json::to_string_pretty(&outcome.variants)?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, &json).await?;
            println!("Variants written to {}", path.display());
        }
        None => println!("{json}"),
    }
    println!("cost: ${:.4}", outcome.cost.cost_usd);
    Ok(())
}

async fn list_projects() -> Result<()> {
    let workspace = Workspace::current()?;
    let store = Store::open(&workspace).await?;
    let projects = store.projects.list().await?;

    if projects.is_empty() {
        println!("No projects yet.");
        return Ok(());
    }

    println!();
    println!("Projects ({}):", projects.len());
    for project in &projects {
        let status = match project.status {
            RunStatus::Succeeded => "●".green(),
            RunStatus::Failed => "●".red(),
            _ => "○".normal(),
        };
        println!(
            "  {status} {}  {:<40} {:<10} ${:.4}  {}",
            &project.id.to_string()[..8],
            project.name,
            project.template,
            project.total_cost_usd,
            project.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!();
    Ok(())
}

async fn show_project(reference: &str) -> Result<()> {
    let workspace = Workspace::current()?;
    let store = Store::open(&workspace).await?;
    let project = store.project(reference).await?;
    let ctx = &project.context;

    println!();
    println!("{} {}", "Project".bold(), project.name);
    println!("  id:       {}", project.id);
    println!("  status:   {}", ctx.status());
    println!("  template: {}", ctx.template);
    println!("  language: {}", ctx.language);
    println!("  cost:     ${:.4}", ctx.total_cost_usd());
    println!("  brief:    {}", ctx.business_description);
    if let Some(failure) = ctx.failure() {
        println!("  failure:  {}", failure.message.red());
    }
    if let Some(auto_fix) = ctx.auto_fix() {
        println!(
            "  auto-fix: {}/{} reviews, {}",
            auto_fix.iterations,
            auto_fix.max_iterations,
            if auto_fix.approved { "approved" } else { "not approved" }
        );
    }

    println!();
    println!("Artifacts:");
    for entry in ctx.artifacts() {
        println!("  {:<10} from {}", entry.key.to_string(), entry.stage);
    }

    let versions = store.versions.list_for_project(project.id).await?;
    if !versions.is_empty() {
        println!();
        println!("Versions:");
        for version in &versions {
            println!(
                "  v{:<3} {:<40} ${:.4}  {}",
                version.version_number,
                version.change_description,
                version.cost_usd,
                version.created_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
    println!();
    Ok(())
}

async fn delete_project(reference: &str) -> Result<()> {
    let workspace = Workspace::current()?;
    let store = Store::open(&workspace).await?;
    let project = store.project(reference).await?;
    if store.projects.delete(project.id).await? {
        println!("Deleted {} ({})", project.name, project.id);
    }
    Ok(())
}

async fn export(reference: &str, out: PathBuf) -> Result<()> {
    let workspace = Workspace::current()?;
    let store = Store::open(&workspace).await?;
    let project = store.project(reference).await?;
    let page = store.latest_page(&project).await?;

    let total_cost = project.context.total_cost_usd() + refinement_cost(&store, &project).await?;
    let bundle = ExportBundle::from_page(project.id, &page, total_cost);

    tokio::fs::create_dir_all(&out).await?;
    let html_path = out.join("index.html");
    let meta_path = out.join("metadata.json");
    tokio::fs::write(&html_path, &bundle.html).await?;
    tokio::fs::write(&meta_path, serde_json::to_string_pretty(&bundle)?).await?;

    println!("{} {}", "Exported".green().bold(), project.name);
    println!("  {}", html_path.display());
    println!("  {}", meta_path.display());
    if let Some(title) = &bundle.metadata.title {
        println!("  title: {title}");
    }
    Ok(())
}

/// Cost of every version after the first; the initial build is already in
/// the run's ledger.
async fn refinement_cost(store: &Store, project: &Project) -> Result<f64> {
    let versions = store.versions.list_for_project(project.id).await?;
    Ok(versions
        .iter()
        .filter(|v| v.version_number > 1)
        .map(|v| v.cost_usd)
        .sum())
}

fn print_templates() {
    println!("Templates:");
    for template in Template::all() {
        println!("  {:<12} {}", template.id, template.name);
    }
    println!();
    println!("Languages:");
    for language in Language::all() {
        println!(
            "  {:<4} {:<10} {}",
            language.code,
            language.name,
            language.direction.as_str()
        );
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitesmith=info,orchestrator=info".into()),
        )
        .init();
}
