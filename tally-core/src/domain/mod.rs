mod error;
mod ids;
mod models;

pub use error::*;
pub use ids::*;
pub use models::*;
