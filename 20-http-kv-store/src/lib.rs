//! In-memory key-value store served over HTTP.
//!
//! Clients merge, list and delete string entries through a small JSON API,
//! while a background reporter logs how many requests the store has served.
//! Each module owns one concern:
//!
//! - [`store`] holds the entries and the request counter behind one lock.
//! - [`reporter`] samples the store on a fixed period until told to stop.
//! - [`lifecycle`] provides the stop signal and the one-way shutdown state.
//! - [`routes`] maps HTTP requests onto store calls and serves the pages.
//! - [`server`] wires everything together and bounds the shutdown drain.
//! - [`cli`] parses the command-line configuration.

pub mod cli;
pub mod error;
pub mod lifecycle;
pub mod reporter;
pub mod routes;
pub mod server;
pub mod store;
