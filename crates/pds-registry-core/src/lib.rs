//! # PDS Registry Core
//!
//! Transport-agnostic request pipeline for the PDS registry: content
//! negotiation, product identifier resolution, group constraint composition,
//! query construction, and response assembly.
//!
//! This crate performs no I/O of its own. The search index sits behind the
//! [`backend::SearchBackend`] trait; serialization of the final
//! [`response::ResultPayload`] is left to the caller.

pub mod backend;
pub mod constraint;
pub mod context;
pub mod error;
pub mod fields;
pub mod format;
pub mod identifiers;
pub mod negotiate;
pub mod pipeline;
pub mod query;
pub mod resolve;
pub mod response;

pub use context::{NegotiatedResponse, Pagination, RequestParams};
pub use error::{ErrorKind, RegistryError, Result};
pub use pipeline::Registry;
