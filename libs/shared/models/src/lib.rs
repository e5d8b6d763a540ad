pub mod actor;
pub mod error;

pub use actor::{Actor, ActorRole};
pub use error::AppError;
