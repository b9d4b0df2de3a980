use std::path::PathBuf;

pub fn default_evaluators() -> Vec<String> {
    vec!["gpt-4o-2024-08-06".to_string()]
}

pub fn default_max_steps() -> usize {
    5
}

pub fn default_evaluation_retries() -> usize {
    1
}

pub fn default_concurrency() -> usize {
    1
}

pub(super) fn default_temperature() -> f32 {
    0.3
}

pub(super) fn default_evaluation_data() -> PathBuf {
    PathBuf::from("data/evaluation_data.jsonl")
}

pub(super) fn default_validation_data() -> PathBuf {
    PathBuf::from("data/validation_data.jsonl")
}

pub(super) fn default_output_dir() -> PathBuf {
    PathBuf::from("evaluation_results")
}

pub(super) fn default_validation_output_dir() -> PathBuf {
    PathBuf::from("validation_results")
}

/// Logs go to the platform's local data directory, or `./logs` if there is none
pub(super) fn default_log_dir() -> PathBuf {
    dirs::data_local_dir().map_or_else(
        || PathBuf::from("logs"),
        |dir| dir.join("mt-chat-eval").join("logs"),
    )
}

pub(super) fn default_initial_interval_sec() -> u64 {
    1
}

pub(super) fn default_multiplier() -> f64 {
    2.0
}

pub(super) fn default_randomization_factor() -> f64 {
    0.5
}

pub(super) fn default_max_elapsed_time_sec() -> u64 {
    60
}
