pub mod aggregate;
pub mod config;
pub mod daemon;
pub mod error;
pub mod graph;
pub mod io;
pub mod issue;
pub mod mutation;
pub mod paths;
pub mod signals;
pub mod sort;
pub mod tracker;
pub mod types;

pub use error::{DashError, Result};
