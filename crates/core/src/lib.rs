#![forbid(unsafe_code)]

pub mod error;
pub mod exam;
pub mod model;
pub mod pronunciation;
pub mod similarity;
pub mod time;

pub use error::Error;
pub use time::Clock;
