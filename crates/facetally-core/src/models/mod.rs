//! Data models for the application

mod image;
mod response;

pub use image::*;
pub use response::*;
