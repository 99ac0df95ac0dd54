//! Standard library support

pub mod builtins;

pub use builtins::{BuiltinFunc, BuiltinRegistry, Header};
