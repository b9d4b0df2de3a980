use std::io::IsTerminal as _;

use anyhow::{Context as _, Result};
use clap::{CommandFactory as _, Parser as _};

use mt_chat_eval::{
    cli::{Args, Commands},
    config::Config,
    eval_tracing,
    models::{ModelProvider as _, ModelRegistry, SUPPORTED_MODELS},
    onboarding,
    runs::{self, EvalOutput, EvaluationRow, RunSettings, ValidationRow},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if let Some(Commands::Init { dry_run }) = &args.command {
        return onboarding::run(&args.config_path, *dry_run, std::io::stdin().is_terminal());
    }

    let mut config = Config::load(&args.config_path)?;
    if let Some(command) = &args.command {
        command.override_config(&mut config);
    }

    if args.print_config {
        println!(
            "{}",
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?
        );
        return Ok(());
    }

    config.validate()?;

    match args.command {
        Some(Commands::ListModels) => {
            list_models();
            Ok(())
        }
        Some(Commands::Evaluate { .. }) => {
            eval_tracing::init(config.log_dir())?;
            start_evaluation(&config).await
        }
        Some(Commands::Validate { .. }) => {
            eval_tracing::init(config.log_dir())?;
            start_validation(&config).await
        }
        Some(Commands::Init { .. }) => unreachable!("handled before loading the configuration"),
        None => {
            Args::command().print_help()?;
            Ok(())
        }
    }
}

fn list_models() {
    for (model, provider) in SUPPORTED_MODELS {
        println!("{model} ({provider})");
    }
}

/// Loads every model once, so unknown models and missing api keys fail before any work is done
fn check_models(registry: &ModelRegistry, models: &[String]) -> Result<()> {
    registry.load_all(models).map(|_| ())
}

async fn start_evaluation(config: &Config) -> Result<()> {
    let settings = RunSettings::from_config(config)?;
    let registry = ModelRegistry::new(config.clone());

    check_models(&registry, std::slice::from_ref(&settings.model))?;
    check_models(&registry, &settings.evaluators)?;

    let questions: Vec<EvaluationRow> = runs::read_jsonl(&config.evaluation_data)?;
    tracing::info!(
        model = %settings.model,
        evaluators = ?settings.evaluators,
        questions = questions.len(),
        "Starting evaluation"
    );

    let records = runs::evaluate(&settings, &registry, &questions).await?;

    let output = EvalOutput::new(&config.output_dir)?;
    let file_name = runs::evaluation_file_name(
        &settings.model,
        settings.max_steps,
        &settings.evaluators,
        chrono::Local::now().date_naive(),
    );
    let path = output.write_records(&file_name, &records)?;

    let complete = records.iter().filter(|record| record.complete).count();
    println!(
        "{complete}/{total} conversations complete, results written to {path}",
        total = records.len(),
        path = path.display()
    );

    Ok(())
}

async fn start_validation(config: &Config) -> Result<()> {
    let settings = RunSettings::from_config(config)?;
    let registry = ModelRegistry::new(config.clone());

    check_models(&registry, std::slice::from_ref(&settings.model))?;

    let rows: Vec<ValidationRow> = runs::read_jsonl(&config.validation_data)?;
    tracing::info!(evaluator = %settings.model, rows = rows.len(), "Starting validation");

    let records = runs::validate(&settings, &registry, &rows).await?;

    let output = EvalOutput::new(&config.validation_output_dir)?;
    let file_name =
        runs::validation_file_name(&settings.model, chrono::Local::now().date_naive());
    let path = output.write_records(&file_name, &records)?;

    println!(
        "{total} answers judged, results written to {path}",
        total = records.len(),
        path = path.display()
    );

    Ok(())
}
