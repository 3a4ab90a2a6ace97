//! The nginx status exporter.
//!
//! This library supports the `ngx-exporter` binary found elsewhere in this
//! project. It polls nginx `stub_status` and nginx plus `status` endpoints,
//! parses their reports and folds the result into a cache of named gauge
//! series ready for Prometheus exposition.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod cache;
pub mod collector;
pub mod config;
pub mod httpd;
pub mod measurement;
pub mod normalize;
pub mod scraper;
