//! Gateway dispatch layer: validation, orchestration, health, routing

pub mod handlers;
pub mod health;
pub mod routes;
pub mod types;
pub mod validate;
