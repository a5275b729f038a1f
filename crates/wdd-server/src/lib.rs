//! REST API server: routes, DTOs, OpenAPI documentation, and background maintenance.

pub mod dto;
pub mod error;
pub mod maintenance;
pub mod openapi;
pub mod routes;
pub mod state;
