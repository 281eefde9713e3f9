pub mod error;
pub mod indices;
pub mod tbptt;

pub use error::{Result, SamplerError};
pub use indices::{IndicesSampler, IndicesSamplerConfig, Traversal};
pub use tbptt::TbpttSampler;
