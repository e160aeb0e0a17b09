//! Expression compiler
//!
//! Expressions compile into a flat array of instructions in postfix
//! order. The evaluator in `interp::eval` runs them on a value stack.
//! Short-circuit operators are lowered into jumps inside the same array.

mod compile;
pub mod ops;

pub use compile::compile;
pub use ops::{ArgType, Op};

use crate::interp::value::Value;
use std::fmt;

/// Most instructions one expression may compile to
pub const MAX_ITEMS: usize = 200;

/// Deepest operator nesting the compiler accepts
pub const MAX_STACK: usize = 30;

/// One step of a compiled expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    pub literal: Option<Value>,
    pub arg_count: usize,
}

/// Compiled form of one expression
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledExpression {
    pub code: Vec<Instruction>,
}

impl CompiledExpression {
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

impl fmt::Display for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ins) in self.code.iter().enumerate() {
            write!(f, "{i:3}: {:?}", ins.op)?;
            if ins.arg_count > 0 {
                write!(f, "/{}", ins.arg_count)?;
            }
            match &ins.literal {
                Some(Value::String(s)) => writeln!(f, " '{}'", s.replace('\'', "''"))?,
                Some(value) => writeln!(f, " {value}")?,
                None => writeln!(f)?,
            }
        }
        Ok(())
    }
}
