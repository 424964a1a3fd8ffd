//! # Question Aggregator
//!
//! Bundles a directory tree of subjects, questions and their images into a
//! single JSON document that a quiz client can load in one request.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌─────────────────┐
//! │ Image        │──▶│ Image          │──▶│ Tree            │──▶ questions.json
//! │ Resolver     │   │ Materializer   │   │ Aggregator      │
//! └──────────────┘   └────────────────┘   └─────────────────┘
//!  pick one image     URL or data URI      merge + serialize
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! qagg aggregate                         # reference images by relative path
//! qagg aggregate --embed --quality 80    # inline images as WebP
//! qagg serve 3001                        # serve the output with CORS
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`aggregate`] | Directory traversal, merging and output |
//! | [`images`] | Image discovery and main-image selection |
//! | [`materialize`] | Reference URLs and data-URI embedding |
//! | [`models`] | Document and record types |
//! | [`config`] | TOML configuration parsing |
//! | [`bootstrap`] | Questions directory detection |
//! | [`server`] | Static HTTP server with CORS headers |
//! | [`logging`] | Tracing subscriber setup |

pub mod aggregate;
pub mod bootstrap;
pub mod config;
pub mod images;
pub mod logging;
pub mod materialize;
pub mod models;
pub mod server;
