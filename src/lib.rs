//! Quotesync Service Library
//!
//! This library provides the core components for the quotesync service: a
//! quote store with category filtering, JSON import/export, and periodic
//! last-write-wins synchronization against a remote quote feed.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
