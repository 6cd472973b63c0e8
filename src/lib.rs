//! vendor_desk: vendor management web service with an allow-listed Google sign-in.
//!
//! Storage sits behind the [`storage::DataService`] trait (embedded Sled or a
//! hosted PostgREST-style service). The HTTP layer is Axum; sessions are
//! stateless signed tokens checked by the route guard.

pub mod auth;
pub mod authz;
pub mod config;
pub mod error;
pub mod guard;
pub mod hosted;
pub mod models;
pub mod oauth;
// Router, auth flow and JSON API
pub mod rest;
pub mod storage;
pub mod telemetry;
pub mod vendors;
pub mod views;
