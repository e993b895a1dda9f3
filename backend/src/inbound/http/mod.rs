//! HTTP inbound adapter exposing the REST endpoints.

pub mod auth;
pub mod data;
pub mod error;
pub mod health;
pub mod schemas;
pub mod service_info;
pub mod state;
pub mod submit;
pub mod users;
pub mod validation;

pub use error::ApiResult;
