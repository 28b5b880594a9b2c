//! Rent-Guarantee Quote Aggregator Library
//!
//! Quotes a lease guarantee ("fiança locatícia") with several insurers at
//! once. One insurer (Pottencial) is integrated over HTTP with a cached
//! bearer token; the others are simulated and always decline.
//!
//! # Modules
//!
//! - `api`: HTTP layer.
//! - `core`: Domain logic, models and errors.
//! - `integrations`: Insurer API clients.
//! - `aggregator`: Concurrent insurer fan-out.
//! - `config`: Configuration management.
//! - `cotation_store`: Quote history storage and dashboard filters.
//! - `db`: Database connection and schema.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers and router.
//! - `insurers`: Insurer adapter seam and simulated insurers.
//! - `models`: Quote request/result and cotation records.
//! - `pottencial_client`: Pottencial quoting API client.
//! - `session`: Signed session cookie verification.
//! - `token_cache`: Insurer bearer token cache.
//! - `validation`: Quote request validation.

pub mod api;
pub mod core;
pub mod integrations;

pub mod aggregator;
pub mod config;
pub mod cotation_store;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod insurers;
pub mod models;
pub mod pottencial_client;
pub mod session;
pub mod token_cache;
pub mod validation;
