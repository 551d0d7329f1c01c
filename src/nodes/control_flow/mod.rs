pub mod condition;
pub mod input;
pub mod output;

pub use condition::ConditionProcessor;
pub use input::InputProcessor;
pub use output::OutputProcessor;
