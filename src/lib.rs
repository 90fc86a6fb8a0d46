pub mod auth;
pub mod config;
pub mod error;
pub mod generation;
pub mod models;
pub mod routes;
pub mod state;
pub mod storage;
