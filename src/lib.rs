//! This crate provides a small dataset server. Clients upload CSV tables, which are parsed,
//! typed and persisted on the local filesystem together with a JSON metadata index. Summary
//! statistics, an Excel export and a PDF of histograms can then be derived on demand for any
//! stored dataset.
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team, on top of the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON request and response data, the metadata
//!   index and the persisted tables.
//! * [csv] parses uploaded files.
//! * [ndarray] and [ndarray_stats] compute summary statistics.
//! * [rust_xlsxwriter] writes Excel workbooks and [printpdf] renders histogram plots.
//!
//! A command line client for the API is provided in the [client] module and the `tabstore-cli`
//! binary.

pub mod app;
pub mod app_state;
pub mod artifacts;
pub mod cli;
pub mod client;
pub mod error;
pub mod manager;
pub mod metadata;
pub mod metrics;
pub mod models;
pub mod server;
pub mod table;
pub mod table_store;
pub mod tracing;
pub mod upload;
