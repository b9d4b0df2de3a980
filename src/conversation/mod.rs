//! Multi-turn conversations between the model under test and its evaluators
mod driver;
mod follow_up;

pub use driver::{ConversationDriver, ConversationResult, DriverState};
pub use follow_up::{FollowUpPicker, RandomPicker};
