//! League season engine: weekly tiered seasons with promotion, demotion and history.
//!
//! Exposes its modules for the binaries and the integration tests.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod league;
pub mod routes;
pub mod services;
pub mod state;
