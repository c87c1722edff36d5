//! Bistro Boss backend: cart, chef recommendations, user records and
//! cookie/bearer session tokens over a small set of document collections.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;
