//! Modex CLI - module macro expansion

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;

use modex::{
    AppDocument, ArtifactTree, ExpansionConfig, FixSuggestion, MacroExpander, ModexError,
    ModuleLoader, ModuleRegistry,
};

#[derive(Parser)]
#[command(name = "modex")]
#[command(about = "Modex - expand module invocations into plain component trees")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand an application document and print the result
    Expand {
        #[command(flatten)]
        input: Input,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
    },

    /// Print the order modules are expanded in
    Order {
        #[command(flatten)]
        input: Input,
    },

    /// Expand an application document and report what was expanded
    Check {
        #[command(flatten)]
        input: Input,
    },
}

#[derive(Args)]
struct Input {
    /// Path to the application document
    app: PathBuf,

    /// Module document, or directory of *.module.yaml files (repeatable)
    #[arg(short = 'm', long = "modules", value_name = "PATH")]
    modules: Vec<PathBuf>,

    /// Namespace of a native connector (repeatable)
    #[arg(long, value_name = "NS")]
    native: Vec<String>,

    /// Domain document searched for configs the application lacks
    #[arg(long, value_name = "FILE")]
    domain: Option<PathBuf>,

    /// Config file (flags, module paths, native namespaces)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Never synthesize implicit module configs
    #[arg(long)]
    no_implicit_config: bool,

    /// Skip literal folding for expression config-refs
    #[arg(long)]
    dynamic_config_ref: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

fn main() {
    // Logs go to stderr so expanded output can be piped
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Expand { input, format } => expand(&input, format),
        Commands::Order { input } => order(&input),
        Commands::Check { input } => check(&input),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(suggestion) = e
            .downcast_ref::<ModexError>()
            .and_then(|err| err.fix_suggestion())
        {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

impl Input {
    /// CLI flags over environment over config file.
    fn config(&self) -> Result<ExpansionConfig> {
        let mut config = match &self.config {
            Some(path) => ExpansionConfig::load(path)
                .with_context(|| format!("Cannot load config '{}'", path.display()))?,
            None => ExpansionConfig::default(),
        }
        .with_env();

        config.modules.extend(self.modules.iter().cloned());
        config.native.extend(self.native.iter().cloned());
        if self.no_implicit_config {
            config.flags.disable_implicit_config = true;
        }
        if self.dynamic_config_ref {
            config.flags.dynamic_config_ref = true;
        }
        Ok(config)
    }

    fn prepare(&self) -> Result<(MacroExpander, ArtifactTree)> {
        let config = self.config()?;

        let modules = ModuleLoader::new().paths(&config.modules).load()?;
        let mut registry = ModuleRegistry::builder().modules(modules);
        for namespace in &config.native {
            registry = registry.native(namespace.as_str());
        }
        let expander = MacroExpander::new(Arc::new(registry.build()?), config.flags);

        let mut tree = AppDocument::load(&self.app)
            .with_context(|| format!("Cannot load application '{}'", self.app.display()))?
            .into_tree()?;
        if let Some(domain) = &self.domain {
            let parent = AppDocument::load(domain)
                .with_context(|| format!("Cannot load domain '{}'", domain.display()))?
                .into_tree()?;
            tree = tree.with_parent(Arc::new(parent));
        }

        Ok((expander, tree))
    }
}

fn expand(input: &Input, format: Format) -> Result<()> {
    let (expander, tree) = input.prepare()?;
    let expanded = expander.expand(&tree)?;

    let rendered = match format {
        Format::Yaml => serde_yaml::to_string(&expanded)?,
        Format::Json => serde_json::to_string_pretty(&expanded)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn order(input: &Input) -> Result<()> {
    let (expander, tree) = input.prepare()?;
    let order = expander.order(&tree)?;

    if order.is_empty() {
        println!("{} No modules used by '{}'", "→".cyan(), input.app.display());
        return Ok(());
    }
    for (i, prefix) in order.iter().enumerate() {
        println!("{}. {}", i + 1, prefix);
    }
    Ok(())
}

fn check(input: &Input) -> Result<()> {
    let (expander, tree) = input.prepare()?;
    let order = expander.order(&tree)?;
    let expanded = expander.expand(&tree)?;

    let residual = expander.residual_calls(&expanded);
    if !residual.is_empty() {
        bail!(
            "{} operation call(s) left unexpanded, first: {}",
            residual.len(),
            residual[0].identifier
        );
    }

    println!("{} '{}' expands cleanly", "✓".green(), input.app.display());
    println!("  Modules: {}", order.len());
    println!("  Roots: {} → {}", tree.roots.len(), expanded.roots.len());
    println!("  Nodes: {} → {}", tree.descendants().count(), expanded.descendants().count());
    Ok(())
}
