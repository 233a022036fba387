#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod error;
pub mod model;
pub mod progression;
pub mod scheduler;
pub mod session;
pub mod time;

pub use error::Error;
pub use time::Clock;
