//! # gatepass-core
//!
//! Core business logic for the gatepass visitor pass system.
//!
//! This crate provides:
//! - Visitor registration with expiration computed from the visitor type
//! - The check-in/check-out scan lifecycle
//! - Record store abstraction with in-memory and JSON file backends
//! - Configuration loading and validation
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`pass`] - The visitor pass record and its lifecycle state
//! - [`lifecycle`] - The scan transition function and scan outcomes
//! - [`expiry`] - End-of-day expiration policy in the site timezone
//! - [`pass_id`] - `VIS-####` identifier generation and validation
//! - [`issuer`] - Registration: validation, expiry, id allocation
//! - [`scanner`] - Scan processing against the store
//! - [`storage`] - Record store trait and backends
//! - [`config`] - Application configuration loading and validation
//! - [`error`] - Unified error types for the crate

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod expiry;
pub mod issuer;
pub mod lifecycle;
pub mod pass;
pub mod pass_id;
pub mod scanner;
pub mod storage;

// Re-export primary types for convenience
pub use config::{
    default_config_path, Config, ConfigError, ConfigResult, LoggingConfig, PassesConfig,
    ServerConfig, SiteConfig, StorageBackend, StorageConfig,
};
pub use error::{GatepassError, Result};
pub use expiry::{ExpiryPolicy, DEFAULT_MULTIDAY_DAYS};
pub use issuer::{PassIssuer, Registration, RegistrationRequest};
pub use lifecycle::{ScanOutcome, Transition};
pub use pass::{NewVisitorPass, PassState, PassStatus, VisitorPass, VisitorType};
pub use pass_id::{
    format_pass_id, is_valid_pass_id, PassIdGenerator, RandomPassIdGenerator,
    SequentialPassIdGenerator, PASS_ID_PREFIX, PASS_ID_RANGE,
};
pub use scanner::{ScanProcessor, ScanResult};
pub use storage::{
    default_data_dir, list_all, open_store, JsonFilePassStore, MemoryPassStore, PassStore,
    StoreError, StoreResult,
};
