pub mod bank;
pub mod error;
pub mod loader;

pub use bank::{SampleFormat, SignalBank};
pub use error::{DataError, Result};
pub use loader::{Batches, PromptFeature, PromptLoader};
