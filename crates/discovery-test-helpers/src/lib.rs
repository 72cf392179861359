//! Shared test helpers: in-memory case store and central repository,
//! record builders and log setup.

#![forbid(unsafe_code)]

pub mod central_repo;
pub mod fixtures;
pub mod store;

pub use central_repo::MemoryCentralRepository;
pub use fixtures::{ArtifactFixture, DomainRowFixture, FileFixture};
pub use store::{MemoryCaseStore, StoreCalls};

use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber honouring `RUST_LOG` (default `warn`).
/// Safe to call from every test; only the first call installs it.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
