//! Ingestion use-case services.
//!
//! # Responsibility
//! - Drive the ingestion core over input sources.
//! - Keep the CLI decoupled from storage details.

pub mod ingest_service;
