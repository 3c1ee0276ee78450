pub mod engine;
pub mod pagination;
pub mod reconcile;

pub use crate::domain::ports::CrmSource;
pub use crate::utils::error::Result;
