pub mod adapters;
pub mod error;
pub mod response;
pub mod utils;

pub use error::{AppError, Result};
pub use response::ApiResponse;
