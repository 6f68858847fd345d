#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod progress;
pub mod time;

pub use error::ErrorKind;
pub use progress::ProgressSnapshot;
pub use time::Clock;
