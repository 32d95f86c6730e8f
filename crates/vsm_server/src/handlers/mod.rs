//! Route handlers.

mod health;
mod landing;
mod upload;

pub use health::health;
pub use landing::landing;
pub use upload::upload;
