#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod model;
pub mod sample;
pub mod time;

pub use config::ExamConfig;
pub use error::Error;
pub use time::Clock;
