//! `ag-generate` - Autoregressive generation loop for autoregen.
//!
//! Drives a network implementing [`ag_model::Arm`] step by step: prompts are
//! bound to time-indexed [`Interface`]s, every step's outputs are written
//! back through them, and finished buffers go to an [`OutputSink`].

pub mod config;
pub mod error;
pub mod generate_loop;
pub mod guard;
pub mod interface;
pub mod prompt;
pub mod sink;

pub use config::GenerateConfig;
pub use error::{GenerateError, Result};
pub use generate_loop::{BatchReport, GenerateLoop};
pub use guard::RunGuard;
pub use interface::{Getter, Interface, Setter};
pub use prompt::{prepare_prompt, prepare_tensor};
pub use sink::{CollectSink, OutputSink};
