pub mod lifecycle;
pub mod registry;
