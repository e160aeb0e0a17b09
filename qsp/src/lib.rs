//! QSP language engine
//!
//! Interpreter for QSP interactive-fiction scripts: expression compiler,
//! line preprocessor, statement executor and an [`Engine`] API for hosts.

pub mod config;
pub mod engine;
pub mod error;
pub mod expr;
pub mod host;
pub mod interp;
pub mod lexer;
pub mod preprocessor;
pub mod repl;
pub mod span;
pub mod util;
pub mod world;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{CompileError, EngineError, ErrorInfo, Result};
pub use host::{Host, MenuItem, NullHost, Window};
pub use interp::{ErrorKind, RuntimeError, Value, ValueType};
pub use span::Span;
pub use world::{Location, World};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install the `tracing` subscriber
///
/// Does nothing unless `RUST_LOG` is set, e.g. `RUST_LOG=qsp=debug`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
