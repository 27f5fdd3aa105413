//! The CLI argument-parser shell (spec.md §1's "out of scope" external
//! collaborator — named but not designed by the core spec). Subcommands
//! and the interactive review loop are modeled on
//! `original_source/cli/__main__.py`, `interface.py`, `commands.py`, and
//! `session_loop.py`; everything here delegates to [`lc_facade`] and
//! never reaches into a crate's internals directly.

mod analyze;
mod learning;
mod prompt;
mod resume;
mod review;
mod sessions;

use std::collections::HashMap;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use lc_core::contracts::ModelConfig;
use lc_facade::CoreClient;

/// lit-critic — multi-lens editorial review engine for fiction manuscripts.
#[derive(Debug, Parser)]
#[command(name = "lit-critic", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a new multi-lens analysis on a scene (or scene sequence).
    Analyze {
        /// Path to the scene file. Repeat for a multi-scene session.
        #[arg(long = "scene", required = true)]
        scenes: Vec<String>,
        /// Path to the project directory (must contain `lit-critic.toml`).
        #[arg(long)]
        project: String,
        /// Short model name resolved by the registry.
        #[arg(long, default_value = "sonnet")]
        model: String,
        /// Model used for the discussion engine (default: same as `--model`).
        #[arg(long = "discussion-model")]
        discussion_model: Option<String>,
        /// Lens-preference preset.
        #[arg(long = "lens-preset", default_value = "balanced")]
        lens_preset: String,
        /// Override one lens weight: `lens=weight` (repeatable).
        #[arg(long = "lens-weight")]
        lens_weight: Vec<String>,
    },
    /// Resume the project's active session.
    Resume {
        #[arg(long)]
        project: String,
        #[arg(long, default_value = "sonnet")]
        model: String,
    },
    /// Manage saved sessions.
    Sessions {
        #[command(subcommand)]
        action: SessionsCommand,
    },
    /// Manage the project's accumulated learning.
    Learning {
        #[command(subcommand)]
        action: LearningCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum SessionsCommand {
    /// List every session saved for the project.
    List {
        #[arg(long)]
        project: String,
    },
    /// Show one session's findings and discussion state.
    View {
        id: String,
        #[arg(long)]
        project: String,
    },
    /// Delete a session permanently.
    Delete {
        id: String,
        #[arg(long)]
        project: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum LearningCommand {
    /// Print the project's accumulated learning.
    View {
        #[arg(long)]
        project: String,
    },
    /// Export `LEARNING.md` to the project root.
    Export {
        #[arg(long)]
        project: String,
    },
    /// Delete all learning data for the project.
    Reset {
        #[arg(long)]
        project: String,
    },
}

pub async fn run(cli: Cli) -> crate::error::Result<()> {
    match cli.command {
        Command::Analyze { scenes, project, model, discussion_model, lens_preset, lens_weight } => {
            analyze::run(scenes, project, model, discussion_model, lens_preset, lens_weight).await
        }
        Command::Resume { project, model } => resume::run(project, model).await,
        Command::Sessions { action } => sessions::run(action),
        Command::Learning { action } => learning::run(action),
    }
}

/// Reads `ANTHROPIC_API_KEY` / `OPENAI_API_KEY` from the environment into
/// the per-request `api_keys` map §4.9 requires instead of ambient
/// credentials inside the core.
fn api_keys_from_env() -> HashMap<String, String> {
    let mut keys = HashMap::new();
    if let Ok(k) = std::env::var("ANTHROPIC_API_KEY") {
        if !k.is_empty() {
            keys.insert("anthropic".to_string(), k);
        }
    }
    if let Ok(k) = std::env::var("OPENAI_API_KEY") {
        if !k.is_empty() {
            keys.insert("openai".to_string(), k);
        }
    }
    keys
}

fn model_config(model: &str, max_tokens: u32) -> ModelConfig {
    ModelConfig { model: model.to_string(), api_keys: api_keys_from_env(), max_tokens, provider_options: None }
}

fn new_core_client(registry: Arc<lc_providers::registry::ModelRegistry>) -> Arc<dyn CoreClient> {
    Arc::new(lc_facade::InProcessCoreClient::new(registry))
}

/// Parses `--lens-weight lens=weight` flags into the override map the
/// facade validates and merges onto the chosen preset.
fn parse_lens_weight_overrides(raw: &[String]) -> crate::error::Result<HashMap<String, f64>> {
    let mut overrides = HashMap::new();
    for item in raw {
        let Some((lens, weight)) = item.split_once('=') else {
            return Err(crate::error::Error::Config(format!(
                "invalid --lens-weight '{item}': expected lens=weight (e.g. prose=1.3)"
            )));
        };
        let weight: f64 = weight.trim().parse().map_err(|_| {
            crate::error::Error::Config(format!("invalid weight '{}' for lens '{}'", weight.trim(), lens.trim()))
        })?;
        overrides.insert(lens.trim().to_ascii_lowercase(), weight);
    }
    Ok(overrides)
}
