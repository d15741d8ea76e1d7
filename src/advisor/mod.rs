pub mod orchestrator;
pub mod outcome;
pub mod prompt;

pub use orchestrator::*;
pub use outcome::*;
pub use prompt::build_prompt;
