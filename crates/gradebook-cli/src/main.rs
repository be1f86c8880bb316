//! gradebook CLI: compute grade averages from a dataset file.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gradebook", version, about = "Grade aggregation and formula evaluation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute averages for a class roster, one student, or one unit
    Averages {
        /// Path to the .toml dataset
        #[arg(long)]
        dataset: PathBuf,

        /// Teacher making the request
        #[arg(long)]
        teacher: String,

        /// Class to compute (not needed with --unit)
        #[arg(long)]
        class: Option<String>,

        /// Only this student
        #[arg(long)]
        student: Option<String>,

        /// Only this unit (requires --student)
        #[arg(long)]
        unit: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,

        /// Save the roster as JSON and HTML
        #[arg(long)]
        save: bool,

        /// Output directory for saved reports (default from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Rank the best students of a class
    Top {
        /// Path to the .toml dataset
        #[arg(long)]
        dataset: PathBuf,

        /// Teacher making the request
        #[arg(long)]
        teacher: String,

        /// Class to rank
        #[arg(long)]
        class: String,

        /// How many students to list (default from config)
        #[arg(long)]
        count: Option<usize>,

        /// Rank by this unit's average instead of the class average
        #[arg(long)]
        unit: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Evaluate a formula, or check it against a unit or class of a dataset
    Formula {
        /// Arithmetic expression, e.g. "N1*0.4+N2*0.6"
        expression: String,

        /// Variable binding NAME=VALUE (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,

        /// Check against this dataset instead of evaluating
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Teacher making the request (with --dataset)
        #[arg(long)]
        teacher: Option<String>,

        /// Unit whose items the formula would combine (with --dataset)
        #[arg(long)]
        unit: Option<String>,

        /// Class whose units the formula would combine (with --dataset)
        #[arg(long)]
        class: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a dataset file
    Validate {
        /// Path to the .toml dataset
        #[arg(long)]
        dataset: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compare two saved roster reports
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Change in grade points that counts as a drop or rise
        #[arg(long, default_value = "0.5")]
        threshold: f64,

        /// Exit code 1 if any average dropped
        #[arg(long)]
        fail_on_drop: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create starter config and example dataset
    Init,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "gradebook=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Averages {
            dataset,
            teacher,
            class,
            student,
            unit,
            format,
            save,
            output,
            config,
        } => {
            commands::averages::execute(commands::averages::AveragesArgs {
                dataset,
                teacher,
                class,
                student,
                unit,
                format,
                save,
                output,
                config,
            })
            .await
        }
        Commands::Top {
            dataset,
            teacher,
            class,
            count,
            unit,
            format,
            config,
        } => commands::top::execute(dataset, teacher, class, count, unit, format, config).await,
        Commands::Formula {
            expression,
            vars,
            dataset,
            teacher,
            unit,
            class,
            config,
        } => {
            commands::formula::execute(expression, vars, dataset, teacher, unit, class, config)
                .await
        }
        Commands::Validate { dataset, config } => commands::validate::execute(dataset, config),
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_drop,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_drop, format),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
