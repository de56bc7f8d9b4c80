//! HTTP surface: health, map and editor endpoints

pub mod routes;

pub use routes::build_router;
