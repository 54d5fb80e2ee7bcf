//! recipevault - A versioned, sandboxed recipe store.
//!
//! Recipes are markdown files under a single root directory, each with an
//! optional JPEG photo stored beside it. Concurrent editors are protected
//! from lost updates by per-document version numbers, and every client path
//! is confined to the root before it reaches the filesystem.
//!
//! # Modules
//!
//! - [`commands`] - The [`commands::Vault`] service used by the CLI and MCP server
//! - [`storage`] - Path resolution, versioned document store, photo attachments
//! - [`corpus`] - Directory listings and recipe markdown conventions
//! - [`search`] - Content and filename relevance search
//! - [`translation`] - Translator trait, translation cache, HTML rendering
//! - [`config`] - Configuration loading
//! - [`cli`] - Command-line interface definitions

pub mod cli;
pub mod commands;
pub mod config;
pub mod corpus;
pub mod search;
pub mod storage;
pub mod translation;

#[cfg(feature = "mcp")]
pub mod mcp;
