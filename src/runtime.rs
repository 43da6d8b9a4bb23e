//! Embedded Python-subset runtime whose activation frames feed call-site
//! resolution.
//!
//! The interpreter is deliberately small: enough statements and expressions
//! to write realistic programs against the introspective builtins, with
//! frames that satisfy the [`crate::frame::StackFrame`] contract so every
//! execution doubles as a resolution fixture.

pub mod activation;
pub mod builtins;
pub mod dispatcher;
pub mod error;
pub mod interp;
pub mod introspect;
pub mod list;
pub mod module;
pub mod object;
pub mod record;
pub mod value;
