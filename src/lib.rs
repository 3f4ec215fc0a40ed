//! # PDS Registry
//!
//! Search and retrieval API for the Planetary Data System registry.
//!
//! The request pipeline itself (content negotiation, version resolution,
//! constraint composition, query construction, response assembly) lives in
//! [`pds_registry_core`]. This crate wires it to a local JSON index, renders
//! payloads as JSON, XML or CSV, and serves them over HTTP and the CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────────┐   ┌─────────────┐
//! │ JSON index │──▶│ TimeoutBackend        │──▶│  Registry   │
//! │  (file)    │   │ (InMemoryBackend)     │   │  pipeline   │
//! └────────────┘   └──────────────────────┘   └──────┬──────┘
//!                                                     │
//!                                ┌────────────────────┤
//!                                ▼                    ▼
//!                          ┌──────────┐         ┌──────────┐
//!                          │   CLI    │         │   HTTP   │
//!                          └──────────┘         └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`index`] | Index loading and the timeout wrapper |
//! | [`render`] | JSON / XML / CSV bodies |
//! | [`server`] | HTTP server |
//! | [`search`] | `search` command |
//! | [`get`] | `get` command |
//! | [`formats`] | `formats` command |
//! | [`logging`] | Tracing subscriber setup |

pub mod config;
pub mod formats;
pub mod get;
pub mod index;
pub mod logging;
pub mod render;
pub mod search;
pub mod server;
