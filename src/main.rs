use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rusty_task::config::TaskConfig;
use rusty_task::data::{loader, validate};
use rusty_task::task::{FixupPolicy, TaskType};

#[derive(Parser)]
#[command(name = "rusty-task")]
#[command(version)]
#[command(about = "Build and inspect learning tasks over tabular data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a task and print its description
    Describe {
        /// Data file (.csv, .json, .parquet)
        data: PathBuf,

        /// Task config file (JSON); flags below override its fields
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Task type (classif, regr, surv, costsens, cluster, multilabel)
        #[arg(short = 't', long = "type")]
        task_type: Option<TaskType>,

        /// Target column (repeat for survival and multilabel tasks)
        #[arg(long)]
        target: Vec<String>,

        /// Task identifier
        #[arg(long)]
        id: Option<String>,

        /// Positive class of a binary classification task
        #[arg(long)]
        positive: Option<String>,

        /// Column holding per-row weights
        #[arg(long)]
        weights: Option<String>,

        /// Column holding per-row blocking labels
        #[arg(long)]
        blocking: Option<String>,

        /// Fixup policy (no, quiet, warn)
        #[arg(long)]
        fixup: Option<FixupPolicy>,

        /// Skip data checks
        #[arg(long)]
        no_check: bool,

        /// Reserve the x and y columns as coordinates
        #[arg(long)]
        spatial: bool,

        /// Print the description as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate feature columns and report every violation
    Validate {
        /// Data file (.csv, .json, .parquet)
        data: PathBuf,

        /// Column to check (repeatable; all columns when omitted)
        #[arg(short = 'c', long = "column")]
        columns: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match Cli::parse().command {
        Commands::Describe {
            data,
            config,
            task_type,
            target,
            id,
            positive,
            weights,
            blocking,
            fixup,
            no_check,
            spatial,
            json,
        } => {
            let mut config = match (config, task_type) {
                (Some(path), _) => TaskConfig::from_path(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, Some(task_type)) => TaskConfig::new(task_type),
                (None, None) => bail!("either --config or --type is required"),
            };
            if let Some(task_type) = task_type {
                config.task_type = task_type;
            }
            if !target.is_empty() {
                config.set_targets(target);
            }
            config.id = id.or(config.id);
            config.positive = positive.or(config.positive);
            config.weights = weights.or(config.weights);
            config.blocking = blocking.or(config.blocking);
            config.fixup = fixup.unwrap_or(config.fixup);
            config.check_data &= !no_check;
            config.spatial |= spatial;

            let frame = loader::load_file(&data)
                .with_context(|| format!("loading {}", data.display()))?;
            let task = config.into_builder(frame)?.build()?.described();
            let desc = task
                .description()
                .context("task description was not computed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(desc)?);
            } else {
                print!("{desc}");
            }
        }
        Commands::Validate { data, columns } => {
            let frame = loader::load_file(&data)
                .with_context(|| format!("loading {}", data.display()))?;
            let names: Vec<&str> = columns.iter().map(String::as_str).collect();
            let selected = (!names.is_empty()).then_some(names.as_slice());

            let violations = validate::validate_all(&frame, selected);
            if violations.is_empty() {
                println!(
                    "{}: {} rows, all checked columns valid",
                    data.display(),
                    frame.n_rows()
                );
            } else {
                for violation in &violations {
                    println!("{violation}");
                }
                bail!("{} column(s) failed validation", violations.len());
            }
        }
    }
    Ok(())
}
