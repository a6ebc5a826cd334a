//! Command-line host for the atelier core.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use atelier::App;
use atelier_skills::types::ParamMap;

#[derive(Parser)]
#[command(name = "atelier", version, about = "Apply skills to files, chain them, undo any step")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect the skill registry.
    Skills {
        #[command(subcommand)]
        command: SkillsCommand,
    },
    /// Import files, apply a chain of skills, and export the results.
    Apply {
        /// Skill ids to apply, in order (repeatable).
        #[arg(long = "skill", required = true)]
        skills: Vec<String>,
        /// Skill parameters as KEY=VALUE (values parsed as JSON, falling
        /// back to strings).
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        /// Export directory (default: next to each input).
        #[arg(long)]
        out: Option<PathBuf>,
        /// Files to transform.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Grant or revoke trust for a community skill.
    Trust {
        /// The skill id.
        skill_id: String,
        /// Revoke instead of granting.
        #[arg(long)]
        revoke: bool,
    },
}

#[derive(Subcommand)]
enum SkillsCommand {
    /// List every loaded skill.
    List,
    /// Ranked search over the registry.
    Search {
        /// Search query.
        query: String,
        /// Declared input types, comma-separated (e.g. `png,jpg`).
        #[arg(long, value_delimiter = ',')]
        input_types: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let app = App::new().context("failed to initialize")?;

    match cli.command {
        Command::Skills { command } => match command {
            SkillsCommand::List => {
                for skill in app.skills("", &[]) {
                    println!("{:<20} {:<12} {}", skill.id, skill.category, skill.description);
                }
            }
            SkillsCommand::Search { query, input_types } => {
                for skill in app.skills(&query, &input_types) {
                    println!("{:<20} {:<12} {}", skill.id, skill.category, skill.description);
                }
            }
        },
        Command::Apply {
            skills,
            params,
            out,
            files,
        } => {
            let params = parse_params(&params)?;
            if let Some(dir) = out {
                std::fs::create_dir_all(&dir)?;
                let _ = app.set_mode("batch")?;
                let _ = app
                    .execute_skill(&[], "set_output_folder", &folder_param(&dir))
                    .await?;
            }

            let imported = app.add_files(&files);
            if imported.is_empty() {
                bail!("no files could be imported");
            }
            let file_ids: Vec<String> = imported.iter().map(|f| f.id.clone()).collect();

            for skill_id in &skills {
                let result = app.execute_skill(&file_ids, skill_id, &params).await?;
                for failed in &result.failed_files {
                    eprintln!("{}: {} failed: {}", skill_id, failed.file_id, failed.error);
                }
                if result.updated_files.is_empty() && !result.failed_files.is_empty() {
                    bail!("skill {skill_id} failed for every file");
                }
            }

            let exported = app.export_files(&file_ids).await?;
            for export in &exported {
                println!("{}", export.output_path.display());
            }
            app.clear_all()?;
        }
        Command::Trust { skill_id, revoke } => {
            app.set_skill_trust(&skill_id, !revoke)?;
            let state = if revoke { "revoked" } else { "granted" };
            println!("trust {state} for {skill_id}");
        }
    }
    Ok(())
}

fn parse_params(pairs: &[String]) -> anyhow::Result<ParamMap> {
    let mut params = ParamMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid --param {pair:?}, expected KEY=VALUE");
        };
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        let _ = params.insert(key.to_string(), value);
    }
    Ok(params)
}

fn folder_param(dir: &std::path::Path) -> ParamMap {
    let mut params = ParamMap::new();
    let _ = params.insert(
        "folder".to_string(),
        serde_json::Value::String(dir.to_string_lossy().into_owned()),
    );
    params
}
