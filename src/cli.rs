use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser, Debug, Clone)]
#[clap(author, about, version)]
pub struct Args {
    /// Optional path to overwrite the config
    #[arg(short, long, default_value = "mt-chat-eval.toml")]
    pub config_path: PathBuf,

    /// Print the configuration and exit
    #[arg(long)]
    pub print_config: bool,

    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Drive a conversation for every question and summarize how it went
    Evaluate {
        /// The model under test
        #[arg(short, long)]
        model: Option<String>,
        /// Models judging the conversation
        #[arg(short, long, num_args = 1..)]
        evaluators: Vec<String>,
        #[arg(long)]
        max_steps: Option<usize>,
        /// Questions, one json object per line
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Judge labelled answers once, to compare an evaluator with human labels
    Validate {
        /// The evaluator to validate
        #[arg(short, long)]
        model: Option<String>,
        /// Labelled answers, one json object per line
        #[arg(short, long)]
        data: Option<PathBuf>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// List the supported models and their provider
    ListModels,
    /// Write a default configuration file
    Init {
        /// Print the configuration instead of writing it
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

impl Commands {
    /// Command line arguments take precedence over the configuration
    pub fn override_config(&self, config: &mut Config) {
        match self {
            Commands::Evaluate {
                model,
                evaluators,
                max_steps,
                data,
                output_dir,
            } => {
                if let Some(model) = model {
                    config.model = Some(model.clone());
                }
                if !evaluators.is_empty() {
                    config.evaluators.clone_from(evaluators);
                }
                if let Some(max_steps) = max_steps {
                    config.max_steps = *max_steps;
                }
                if let Some(data) = data {
                    config.evaluation_data.clone_from(data);
                }
                if let Some(output_dir) = output_dir {
                    config.output_dir.clone_from(output_dir);
                }
            }
            Commands::Validate {
                model,
                data,
                output_dir,
            } => {
                if let Some(model) = model {
                    config.model = Some(model.clone());
                }
                if let Some(data) = data {
                    config.validation_data.clone_from(data);
                }
                if let Some(output_dir) = output_dir {
                    config.validation_output_dir.clone_from(output_dir);
                }
            }
            Commands::ListModels | Commands::Init { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_overrides_config() {
        let args = Args::parse_from([
            "mt-chat-eval",
            "evaluate",
            "--model",
            "gpt-4o-mini",
            "--evaluators",
            "gpt-4o",
            "gemini-1.5-pro",
            "--max-steps",
            "2",
            "--output-dir",
            "out",
        ]);
        let mut config = Config::default();

        args.command.unwrap().override_config(&mut config);

        assert_eq!(config.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.evaluators, vec!["gpt-4o", "gemini-1.5-pro"]);
        assert_eq!(config.max_steps, 2);
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_missing_arguments_keep_config() {
        let args = Args::parse_from(["mt-chat-eval", "validate", "--data", "labels.jsonl"]);
        let mut config = Config::default();
        config.model = Some("gpt-4o".to_string());

        args.command.unwrap().override_config(&mut config);

        assert_eq!(config.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.validation_data, PathBuf::from("labels.jsonl"));
        assert_eq!(config.evaluators, vec!["gpt-4o-2024-08-06"]);
    }
}
