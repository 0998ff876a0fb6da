pub mod cache;
pub mod handler;
pub mod model;
pub mod routes;
pub mod source;
