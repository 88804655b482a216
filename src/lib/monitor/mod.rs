pub mod cpu;
pub mod display;
pub mod error;
pub mod manager;
pub mod network;
pub mod probe;
pub mod sampler;
pub mod trash;
pub mod types;

pub use display::DisplayState;
pub use probe::{HostProbe, SystemProbe};
pub use sampler::Sampler;
pub use types::PublishedState;
