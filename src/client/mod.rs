//! # PostgREST Resource Client
//!
//! This module provides the generic CRUD accessor for the business-administration
//! backend: clients, quotations, projects, services, payments and locations are
//! all PostgREST tables handled by one [`ResourceClient`] type.
//!
//! ## Modules
//!
//! - [`auth`] - Cloudflare Access gateway credentials
//! - [`client`] - The resource client and the shared backend handle
//! - [`config`] - Endpoint configuration read from the environment
//! - [`error`] - Error kinds and the sentinel helper
//! - [`query`] - PostgREST query-string construction
//! - [`types`] - Records, the resource catalogue and per-table schemas
//!
//! ## Quick Start
//!
//! ```no_run
//! use mcp_orgm::client::{EndpointConfig, PostgrestBackend, Resource, ResourceError};
//!
//! # async fn example() -> Result<(), ResourceError> {
//! let backend = PostgrestBackend::new(EndpointConfig::from_env())?;
//! let clients = backend.resource(Resource::Clients);
//!
//! let matches = clients.search(Some("acme")).await?;
//! println!("Found {} clients", matches.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
#[allow(clippy::module_inception)]
pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod types;

pub use auth::GatewayCredentials;
pub use client::{PostgrestBackend, ResourceClient};
pub use config::EndpointConfig;
pub use error::{IntoSentinel, ResourceError, ResourceResult};
pub use types::*;
