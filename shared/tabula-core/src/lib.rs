//! Tabula Core - Shared domain types and service infrastructure
//!
//! This crate provides:
//! - Standard service trait the gateway implements
//! - Schema catalog and result set types
//! - The SELECT-only security guard
//! - Error taxonomy and configuration management

pub mod config;
pub mod domain;
pub mod error;
pub mod guard;
pub mod service;

pub use config::ServiceConfig;
pub use domain::*;
pub use error::{Result, TabulaError};
pub use guard::{validate, ApprovedSql, FORBIDDEN_KEYWORDS};
pub use service::{DependencyStatus, HealthStatus, MicroserviceRuntime, ReadinessStatus, TabulaService};
