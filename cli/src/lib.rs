pub mod commands;
pub mod error;
pub mod logging;
pub mod server;

pub use error::AppError;
