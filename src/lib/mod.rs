#[macro_use]
extern crate lazy_static;
extern crate tracing;

pub mod cli;
pub mod logger;
pub mod monitor;
pub mod server;
pub mod settings;
