pub mod cli;
pub mod config;
pub mod conversation;
pub mod eval_tracing;
pub mod evaluation;
pub mod metrics;
pub mod models;
pub mod onboarding;
pub mod runs;
pub mod templates;
pub mod test_utils;
