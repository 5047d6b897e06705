//! # ORGM Administration Library
//!
//! Access to the ORGM business-administration backend (clients, quotations,
//! projects, services, payments) served by PostgREST, plus a Model Context
//! Protocol server exposing the same operations as tools.
//!
//! ## Client Module
//!
//! The [`client`] module provides the generic resource client: list, fetch,
//! create, update, delete and search rows of any backend table.
//!
//! ## Server Module
//!
//! The [`server`] module implements an MCP server that exposes the resource
//! operations as standardized tools that AI assistants can use.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mcp_orgm::{EndpointConfig, OrgmMcpServer, PostgrestBackend};
//!
//! # fn example() -> Result<(), mcp_orgm::client::ResourceError> {
//! let config = EndpointConfig::new("http://localhost:3000");
//!
//! // Use the client directly
//! let backend = PostgrestBackend::new(config)?;
//!
//! // Or create an MCP server
//! let server = OrgmMcpServer::new(backend);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod server;

pub use client::{EndpointConfig, PostgrestBackend, ResourceClient};
pub use server::OrgmMcpServer;
