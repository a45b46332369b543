pub mod error;
pub mod players;
pub mod ratings;

pub use error::DomainError;
