//! Compiler, static analyzer and simulator for finite-state machines written
//! in a small indentation-based language.
//!
//! A [`Machine`] holds signals and states whose behavior is given as source
//! code. [`Machine::analyze`] compiles that code, checks it, and on success
//! flattens it into a [`Model`] that a [`Simulator`] can step through or
//! [`emit`] can turn into FL.

mod analyzer;
mod config;
mod emitter;
mod flatting;
mod ir;
mod lexer;
mod machine;
mod optimizer;
mod parser;
mod sexp;
mod simulator;
mod vcd;

pub use analyzer::{Graph, Issue, IssueDisplay, IssueKind, Severity};
pub use config::{Config, ConfigError};
pub use emitter::{EmitError, EmitOptions, check_names, emit};
pub use flatting::{Model, SignalComputation, Transition};
pub(crate) use fxhash::FxHashMap as HashMap;
pub(crate) use fxhash::FxHashSet as HashSet;
pub use ir::{
    Environment, Expression, ExpressionDisplay, NameLookup, Operator, STATE_IS, Scope, SignalId,
    StateId, Statement,
};
pub use lexer::{ParseError, TAB_STOP, Token, TokenKind, TokenStream, bracketify, tokenize};
pub use machine::{
    Code, Listener, Machine, MachineEvent, MachineStatus, RESET_SIGNAL, Signal, SignalKind, State,
    TransformError, Transformer, UnpackError,
};
pub use optimizer::simplify;
pub use parser::{CompileError, compile_expression, compile_statement};
pub use sexp::{SExp, quote};
pub use simulator::{
    FixedInputs, History, InputSource, Simulator, SimulatorBuilder, SimulatorError,
    SimulatorOptions, Snapshot,
};
pub use vcd::VcdWriter;
