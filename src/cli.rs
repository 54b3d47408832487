use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use polars::prelude::*;
use prices_predictor::analysis;
use prices_predictor::config::PipelineConfig;
use prices_predictor::ingest::{self, DEFAULT_WORK_DIR};
use prices_predictor::pipeline::{Pipeline, TracingObserver};
use prices_predictor::training::{self, TrainedModel};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "prices-predictor",
    about = "Prepare house-price data for model training"
)]
pub struct Cli {
    /// Directory for log files. Defaults to the platform data directory.
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the data preparation pipeline described by a config file
    Run {
        /// Path to the pipeline configuration (JSON)
        #[arg(short, long, default_value = "pipeline.json")]
        config: PathBuf,

        /// Archive to ingest, overriding `archive_path` from the config
        #[arg(short, long)]
        archive: Option<PathBuf>,

        /// Train a linear regression on the split even if the config does not ask for it
        #[arg(long)]
        train: bool,

        /// Where to write the trained model, overriding `training.model_path`
        #[arg(long)]
        model_out: Option<PathBuf>,
    },
    /// Extract an archive and print a profile of its data file
    Inspect {
        /// Archive to inspect
        archive: PathBuf,

        /// Extraction directory
        #[arg(long, default_value = DEFAULT_WORK_DIR)]
        work_dir: PathBuf,
    },
    /// Write a starter pipeline configuration
    InitConfig {
        #[arg(short, long, default_value = "pipeline.json")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Score a CSV file with a trained model
    Predict {
        /// Model artifact written by `run --train`
        #[arg(short, long)]
        model: PathBuf,

        /// CSV file with the model's feature columns
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV; prints to the console when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            config,
            archive,
            train,
            model_out,
        } => handle_run(&config, archive, train, model_out),
        Commands::Inspect { archive, work_dir } => handle_inspect(&archive, &work_dir),
        Commands::InitConfig { output, force } => handle_init_config(&output, force),
        Commands::Predict {
            model,
            input,
            output,
        } => handle_predict(&model, &input, output.as_deref()),
    }
}

fn handle_run(
    config_path: &Path,
    archive: Option<PathBuf>,
    train: bool,
    model_out: Option<PathBuf>,
) -> Result<()> {
    let mut config = PipelineConfig::from_file(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    if let Some(archive) = archive {
        config.archive_path = archive;
    }
    let params = config.params().context("Invalid pipeline configuration")?;

    println!("Running pipeline on {}...", config.archive_path.display());
    let output = Pipeline::new(&config.work_dir).run(
        &config.archive_path,
        &params,
        &mut TracingObserver,
    )?;

    println!("{}", output.report.summary());
    println!(
        "Split: {} training rows, {} test rows, {} feature columns",
        output.split.train_rows.len(),
        output.split.test_rows.len(),
        output.split.x_train.width()
    );

    if !(train || config.training.enabled) {
        return Ok(());
    }

    let (model, metrics) = training::train_and_evaluate(&output)?;
    println!(
        "Linear regression on '{}': R² {:.4}, MSE {:.6} over {} test rows",
        model.target, metrics.r2, metrics.mse, metrics.rows
    );

    if let Some(path) = model_out.or(config.training.model_path) {
        model.save(&path)?;
        println!("Model saved to: {}", path.display());
    }
    Ok(())
}

fn handle_inspect(archive: &Path, work_dir: &Path) -> Result<()> {
    let ingested = ingest::extract_and_load(archive, work_dir)
        .with_context(|| format!("Failed to ingest {}", archive.display()))?;
    let profile = analysis::profile(&ingested.dataset)?;

    println!(
        "{}: {} rows, {} columns",
        ingested.file_path.display(),
        profile.rows,
        profile.columns.len()
    );
    for column in &profile.columns {
        let detail = match (&column.numeric, &column.text) {
            (Some(n), _) => format!(
                "mean {:.3}, median {:.3}, min {:.3}, max {:.3}",
                n.mean, n.median, n.min, n.max
            ),
            (_, Some(t)) => format!("{} distinct, top '{}' ({})", t.distinct, t.top, t.top_count),
            _ => String::new(),
        };
        println!(
            "  {:<24} {:<8} {:>6} missing  {detail}",
            column.name,
            column.kind.as_str(),
            column.missing
        );
    }

    let missing = profile.missing_columns();
    if !missing.is_empty() {
        println!("{} columns have missing values", missing.len());
    }
    Ok(())
}

fn handle_init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite it",
            output.display()
        );
    }
    PipelineConfig::template().to_file(output)?;
    println!("Config written to: {}", output.display());
    Ok(())
}

fn handle_predict(model_path: &Path, input: &Path, output: Option<&Path>) -> Result<()> {
    let model = TrainedModel::load(model_path)?;
    let mut df = ingest::load_csv(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let predictions = model.predict(&df)?;
    df.with_column(Series::new("prediction".into(), predictions))?;

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            CsvWriter::new(file).include_header(true).finish(&mut df)?;
            println!("Wrote {} predictions to: {}", df.height(), path.display());
        }
        None => println!("{df}"),
    }
    Ok(())
}
