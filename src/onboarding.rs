//! Writes a starting configuration file
//!
//! When run interactively a few questions are asked, otherwise the defaults are used. Everything
//! else can be changed in the generated file.
use std::{io::Write as _, path::Path};

use anyhow::{Context as _, Result};

use crate::{
    config::{Config, defaults},
    models::ModelRegistry,
    templates::Templates,
};

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Renders the configuration, asking questions on stdin only when `interactive`
pub fn run(file: &Path, dry_run: bool, interactive: bool) -> Result<()> {
    if !dry_run && file.exists() {
        anyhow::bail!(
            "{} already exists, skipping initialization",
            file.display()
        );
    }

    let mut context = tera::Context::new();
    model_questions(&mut context, interactive)?;

    let config = render(&context)?;

    if dry_run {
        println!(
            "Dry run, would have written the following to {}:\n\n{config}",
            file.display()
        );
    } else {
        std::fs::write(file, &config)
            .with_context(|| format!("Failed to write {}", file.display()))?;
        println!(
            "Wrote {}, please review it before starting an evaluation.",
            file.display()
        );
    }

    Ok(())
}

fn render(context: &tera::Context) -> Result<String> {
    let config = Templates::render("mt-chat-eval.toml", context)
        .context("Failed to render default config")?;

    config
        .parse::<Config>()
        .context("There is an error in the configuration")?;

    Ok(config)
}

fn model_questions(context: &mut tera::Context, interactive: bool) -> Result<()> {
    let evaluators = defaults::default_evaluators().join(",");

    let model = ask_model("Which model do you want to evaluate?", DEFAULT_MODEL, interactive)?;
    let evaluators = input_with_default(
        "Which models should judge it? (comma separated)",
        &evaluators,
        interactive,
    )?;
    let evaluators = evaluators
        .split(',')
        .map(str::trim)
        .filter(|evaluator| !evaluator.is_empty())
        .map(|evaluator| {
            ModelRegistry::provider_for(evaluator)?;
            Ok(evaluator.to_string())
        })
        .collect::<Result<Vec<_>>>()?;

    let max_steps = input_with_default(
        "How many steps may a conversation take?",
        &defaults::default_max_steps().to_string(),
        interactive,
    )?
    .parse::<usize>()
    .context("Expected a number of steps")?;

    context.insert("model", &model);
    context.insert("evaluators", &evaluators);
    context.insert("max_steps", &max_steps);

    Ok(())
}

fn ask_model(prompt: &str, default: &str, interactive: bool) -> Result<String> {
    loop {
        let model = input_with_default(prompt, default, interactive)?;
        if ModelRegistry::provider_for(&model).is_ok() {
            return Ok(model);
        }
        println!("Unknown model, see `mt-chat-eval list-models` for the supported models");
    }
}

// Helper for getting user feedback with a default
fn input_with_default(prompt: &str, default: &str, interactive: bool) -> Result<String> {
    if !interactive {
        return Ok(default.to_string());
    }

    print!("{prompt} [{default}]: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .context("Failed to read input")?;

    let trimmed = input.trim();
    if trimmed.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_render_a_valid_config() {
        let mut context = tera::Context::new();
        model_questions(&mut context, false).unwrap();

        let config: Config = render(&context).unwrap().parse().unwrap();

        assert_eq!(config.model.as_deref(), Some(DEFAULT_MODEL));
        assert_eq!(config.evaluators, defaults::default_evaluators());
        assert_eq!(config.max_steps, defaults::default_max_steps());
        config.validate().unwrap();
    }

    #[test]
    fn test_writes_config_once() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mt-chat-eval.toml");

        run(&file, false, false).unwrap();
        assert!(file.exists());

        let error = run(&file, false, false).unwrap_err();
        assert!(error.to_string().contains("already exists"));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mt-chat-eval.toml");

        run(&file, true, false).unwrap();

        assert!(!file.exists());
    }
}
