use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use nuke_openjd_engine::NukeAdaptor;
use nuke_openjd_types::{InitData, PathMappingRules, RunData};
use nuke_openjd_util::resolve_data_source;

/// OpenJD adaptor for Foundry Nuke.
#[derive(Debug, Parser)]
#[command(name = "nuke-openjd", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a sticky render session: init, one run per task, cleanup.
    Run {
        /// Session init data: a file:// URI or inline YAML.
        #[arg(long)]
        init_data: String,

        /// Per-task run data: a file:// URI or inline YAML. Repeat for
        /// multiple tasks against the same session.
        #[arg(long, required = true)]
        run_data: Vec<String>,

        /// Path mapping rules: a file:// URI or inline YAML.
        #[arg(long)]
        path_mapping_rules: Option<String>,
    },
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            init_data,
            run_data,
            path_mapping_rules,
        } => match run(&init_data, &run_data, path_mapping_rules.as_deref()).await {
            Ok(()) => std::process::ExitCode::SUCCESS,
            Err(err) => {
                error!("adaptor failed: {err:#}");
                std::process::ExitCode::FAILURE
            }
        },
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(
    init_data: &str,
    run_data: &[String],
    path_mapping_rules: Option<&str>,
) -> Result<()> {
    let init_data = parse_init_data(init_data)?;
    let rules = parse_path_mapping_rules(path_mapping_rules)?;
    let tasks = run_data
        .iter()
        .map(|source| parse_run_data(source))
        .collect::<Result<Vec<_>>>()?;

    info!("about to start the Nuke adaptor");
    let mut adaptor = NukeAdaptor::new(init_data, rules);

    let result = drive_session(&mut adaptor, &tasks).await;
    if let Err(cleanup_error) = adaptor.on_cleanup().await {
        // Run errors take precedence; cleanup problems are logged.
        error!("cleanup failed: {cleanup_error}");
        if result.is_ok() {
            return Err(cleanup_error.into());
        }
    }
    result?;
    info!("done Nuke adaptor run");
    Ok(())
}

enum SessionOutcome {
    Finished(Result<()>),
    Interrupted,
}

async fn drive_session(adaptor: &mut NukeAdaptor, tasks: &[RunData]) -> Result<()> {
    // The session future borrows the adaptor, so it has to be dropped
    // before cancellation can touch the client process.
    let outcome = {
        let session = session_tasks(adaptor, tasks);
        tokio::pin!(session);
        tokio::select! {
            result = &mut session => SessionOutcome::Finished(result),
            _ = tokio::signal::ctrl_c() => SessionOutcome::Interrupted,
        }
    };
    match outcome {
        SessionOutcome::Finished(result) => result,
        SessionOutcome::Interrupted => {
            info!("interrupt received, cancelling render");
            adaptor.on_cancel().await?;
            anyhow::bail!("render cancelled")
        }
    }
}

async fn session_tasks(adaptor: &mut NukeAdaptor, tasks: &[RunData]) -> Result<()> {
    adaptor.on_start().await?;
    for task in tasks {
        adaptor.on_run(task).await?;
    }
    adaptor.on_stop().await?;
    Ok(())
}

fn parse_init_data(source: &str) -> Result<InitData> {
    let text = resolve_data_source(source)?;
    serde_yaml::from_str(&text).context("could not parse init data")
}

fn parse_run_data(source: &str) -> Result<RunData> {
    let text = resolve_data_source(source)?;
    serde_yaml::from_str(&text).context("could not parse run data")
}

fn parse_path_mapping_rules(source: Option<&str>) -> Result<PathMappingRules> {
    let Some(source) = source else {
        return Ok(PathMappingRules::default());
    };
    let text = resolve_data_source(source)?;
    serde_yaml::from_str(&text).context("could not parse path mapping rules")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_documented_invocation() {
        let cli = Cli::try_parse_from([
            "nuke-openjd",
            "run",
            "--init-data",
            "file:///tmp/init-data.yaml",
            "--run-data",
            "file:///tmp/run-data.yaml",
            "--path-mapping-rules",
            "file:///tmp/path-mapping.yaml",
        ])
        .unwrap();
        let Command::Run {
            init_data,
            run_data,
            path_mapping_rules,
        } = cli.command;
        assert_eq!(init_data, "file:///tmp/init-data.yaml");
        assert_eq!(run_data, vec!["file:///tmp/run-data.yaml"]);
        assert_eq!(
            path_mapping_rules.as_deref(),
            Some("file:///tmp/path-mapping.yaml")
        );
    }

    #[test]
    fn run_data_can_repeat_for_multiple_tasks() {
        let cli = Cli::try_parse_from([
            "nuke-openjd",
            "run",
            "--init-data",
            "script_file: /tmp/scene.nk",
            "--run-data",
            "frameRange: 1-5",
            "--run-data",
            "frameRange: 6-10",
        ])
        .unwrap();
        let Command::Run { run_data, .. } = cli.command;
        assert_eq!(run_data.len(), 2);
    }

    #[test]
    fn run_data_is_required() {
        let result = Cli::try_parse_from([
            "nuke-openjd",
            "run",
            "--init-data",
            "script_file: /tmp/scene.nk",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn inline_documents_parse_end_to_end() {
        let init_data = parse_init_data("script_file: /tmp/scene.nk\nproxy: true").unwrap();
        assert!(init_data.proxy);
        let run_data = parse_run_data("frameRange: 3-7").unwrap();
        assert_eq!(run_data.frame_range.to_string(), "3-7");
        let rules = parse_path_mapping_rules(None).unwrap();
        assert!(rules.is_empty());
    }
}
