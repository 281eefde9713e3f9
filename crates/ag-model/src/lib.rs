pub mod arm;
pub mod error;
pub mod markov;
pub mod params;

pub use arm::{Arm, Network, StepOutputs};
pub use error::{ModelError, Result};
pub use markov::MarkovArm;
pub use params::{ParamValue, Parameters};
