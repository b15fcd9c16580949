pub mod cache;
pub mod cell;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod merge;
pub mod normalize;
pub mod period;
pub mod selection;
pub mod table;
pub mod table_print;

pub use cell::Cell;
pub use error::*;
pub use merge::MergeEngine;
pub use period::{PeriodDataset, PeriodSet};
pub use selection::{Dimension, Selection};
pub use table::WideTable;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(service: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
    if installed.is_ok() {
        tracing::debug!(service, "tracing initialised");
    }
}
