//! HTTP server for the enrollment engine

pub mod http;

pub use http::{run, AppState};
