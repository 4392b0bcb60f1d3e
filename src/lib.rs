pub mod config;
pub mod consumer;
pub mod core;
pub mod protocol;
pub mod transport;

include!(concat!(env!("OUT_DIR"), "/version.rs"));
