//! QSP interpreter
//!
//! Executes preprocessed location code against a variable store and the
//! player-visible game state.

pub mod error;
pub mod eval;
pub mod exec;
pub mod ops;
pub mod pattern;
pub mod rng;
pub mod scope;
pub mod stmts;
pub mod value;
pub mod vars;

pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::{Interpreter, Site};
pub use exec::Flow;
pub use value::{Value, ValueType};
pub use vars::{AssignOp, VarName, VarStore};
