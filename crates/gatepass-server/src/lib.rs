//! # gatepass-server
//!
//! HTTP server library for the gatepass visitor pass system.
//!
//! This library provides the API handlers and state management for gatepass.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod logging;
pub mod state;
