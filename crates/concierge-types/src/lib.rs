pub mod message;
pub mod event;
pub mod tool;
pub mod config;
pub mod error;
pub mod session;
pub mod route;

#[cfg(test)]
mod tests;

pub use error::ConciergeError;
pub type Result<T> = std::result::Result<T, ConciergeError>;
