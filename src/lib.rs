//! A call-site-aware scripting runtime.
//!
//! Programs in a small Python-like language run under an interpreter whose
//! builtin `scry` namespace can look back at the code that called it: the
//! literal call expression, the statement around it, and the names the
//! result is being assigned to. The frontend ([`lexer`], [`parser`]) feeds a
//! line-indexed [`source`] map; [`dispatch`] resolves live [`frame`] stacks
//! against that map; [`runtime`] executes programs and keeps frame lines
//! pinned so resolution always sees the truth.

pub mod ast;
pub mod dispatch;
pub mod frame;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod source;
pub mod token;
