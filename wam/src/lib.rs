//! A small Warren Abstract Machine.
//!
//! Clauses are compiled into a flat instruction stream by [`compile`], and queries are then run
//! by a [`Machine`], which finds solutions by unification and backtracking.

mod logging;

pub mod compiler;
pub mod instructions;
pub mod machine;

pub use compiler::{
    compile, compile_query, compile_shapes, Clause, CompileError, CompiledProgram, CompiledQuery,
    Goal, Literal, Shape, ShapeError, Term,
};
pub use instructions::{Builtin, Instruction, PredicateKey};
pub use machine::{Machine, MachineConfig, Solution, Value};
