//! Operator-precedence compiler
//!
//! A single scan alternates between expecting a value and expecting an
//! operator. Pending operators wait on a stack until an operator of lower
//! or equal priority arrives; brackets, tuples and the start of the
//! expression are barriers that only their closing token removes.

use super::ops::{self, BARRIER, MAX_ARGS, Op};
use super::{CompiledExpression, Instruction, MAX_ITEMS, MAX_STACK};
use crate::error::{CompileError, Result};
use crate::interp::error::ErrorKind;
use crate::interp::value::{Value, ValueType};
use crate::lexer::{self, Token};
use crate::span::Span;
use tracing::trace;

/// Compile an expression into its flat instruction form
pub fn compile(source: &str) -> Result<CompiledExpression> {
    let tokens = lexer::tokenize(source)?;
    let mut compiler = Compiler {
        source,
        tokens,
        pos: 0,
        out: Vec::new(),
        stack: Vec::new(),
    };
    compiler.run()?;
    trace!(expr = source, items = compiler.out.len(), "compiled");
    Ok(CompiledExpression { code: compiler.out })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Start,
    OpenParen,
    OpenSquare,
    Op(Op),
}

#[derive(Debug)]
struct Pending {
    kind: Kind,
    args: usize,
    literal: Option<Value>,
    /// Jump instruction waiting for its target
    patch: Option<usize>,
    cast: Option<ValueType>,
}

impl Pending {
    fn new(kind: Kind, args: usize) -> Self {
        Pending {
            kind,
            args,
            literal: None,
            patch: None,
            cast: None,
        }
    }

    fn priority(&self) -> u8 {
        match self.kind {
            Kind::Op(op) => op.priority(),
            _ => BARRIER,
        }
    }
}

/// Token seen where an operator is expected
enum Incoming {
    Binary(Op),
    End,
    CloseParen,
    CloseSquare,
    Comma,
}

impl Incoming {
    fn priority(&self) -> u8 {
        match self {
            Incoming::Binary(op) => op.priority(),
            _ => 0,
        }
    }
}

struct Compiler<'a> {
    source: &'a str,
    tokens: Vec<(Token, Span)>,
    pos: usize,
    out: Vec<Instruction>,
    stack: Vec<Pending>,
}

fn is_function(kind: Kind) -> bool {
    matches!(kind, Kind::Op(op) if op.is_function())
}

impl Compiler<'_> {
    fn run(&mut self) -> Result<()> {
        self.push(Pending::new(Kind::Start, 0), Span::new(0, 0))?;
        let mut want_operator = false;
        loop {
            if want_operator {
                match self.operator_step()? {
                    Some(next) => want_operator = next,
                    None => return Ok(()),
                }
            } else {
                want_operator = self.value_step()?;
            }
        }
    }

    fn end_span(&self) -> Span {
        Span::new(self.source.len(), self.source.len())
    }

    fn next_token(&mut self) -> Option<(Token, Span)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_is(&self, wanted: &Token) -> bool {
        matches!(self.tokens.get(self.pos), Some((token, _)) if token == wanted)
    }

    fn top_kind(&self) -> Kind {
        self.stack.last().map_or(Kind::Start, |p| p.kind)
    }

    fn below_top_kind(&self) -> Kind {
        let len = self.stack.len();
        if len < 2 {
            return Kind::Start;
        }
        self.stack[len - 2].kind
    }

    fn top_args_mut(&mut self) -> Option<&mut usize> {
        self.stack.last_mut().map(|p| &mut p.args)
    }

    fn push(&mut self, pending: Pending, span: Span) -> Result<()> {
        if self.stack.len() >= MAX_STACK {
            return Err(CompileError::expression(ErrorKind::StackOverflow, span));
        }
        self.stack.push(pending);
        Ok(())
    }

    fn emit(&mut self, op: Op, literal: Option<Value>, arg_count: usize, span: Span) -> Result<usize> {
        if self.out.len() >= MAX_ITEMS {
            return Err(CompileError::expression(ErrorKind::TooManyItems, span));
        }
        self.out.push(Instruction {
            op,
            literal,
            arg_count,
        });
        Ok(self.out.len() - 1)
    }

    /// Point a previously emitted jump at `target`
    fn patch(&mut self, index: Option<usize>, target: usize) {
        let Some(ins) = index.and_then(|i| self.out.get_mut(i)) else {
            return;
        };
        ins.op = match ins.op {
            Op::Jump(_) => Op::Jump(target),
            Op::JumpUnless(_) => Op::JumpUnless(target),
            Op::AndJump(_) => Op::AndJump(target),
            Op::OrJump(_) => Op::OrJump(target),
            other => other,
        };
    }

    fn emit_pending(&mut self, pending: Pending, span: Span) -> Result<()> {
        let Kind::Op(op) = pending.kind else {
            return Err(CompileError::expression(ErrorKind::Syntax, span));
        };
        match op {
            Op::And | Op::Or => {
                self.emit(Op::Truth, None, 1, span)?;
                let target = self.out.len();
                self.patch(pending.patch, target);
            }
            Op::Iif => {
                let target = self.out.len();
                self.patch(pending.patch, target);
            }
            _ => {
                self.emit(op, pending.literal, pending.args, span)?;
            }
        }
        if let Some(ty) = pending.cast {
            self.emit(Op::Cast(ty), None, 1, span)?;
        }
        Ok(())
    }

    /// Handle one token in operator position
    ///
    /// Returns `None` when the expression is complete, otherwise whether
    /// the next token is again expected to be an operator.
    fn operator_step(&mut self) -> Result<Option<bool>> {
        let (incoming, span) = match self.next_token() {
            None => (Incoming::End, self.end_span()),
            Some((token, span)) => {
                let incoming = match token {
                    Token::RParen => Incoming::CloseParen,
                    Token::RBracket => Incoming::CloseSquare,
                    Token::Comma => Incoming::Comma,
                    Token::Plus => Incoming::Binary(Op::Add),
                    Token::Minus => Incoming::Binary(Op::Sub),
                    Token::Star => Incoming::Binary(Op::Mul),
                    Token::Slash => Incoming::Binary(Op::Div),
                    Token::Amp => Incoming::Binary(Op::Append),
                    Token::Eq => Incoming::Binary(Op::Eq),
                    Token::NotEq => Incoming::Binary(Op::Ne),
                    Token::Lt => Incoming::Binary(Op::Lt),
                    Token::Gt => Incoming::Binary(Op::Gt),
                    Token::LtEq => Incoming::Binary(Op::Le),
                    Token::GtEq => Incoming::Binary(Op::Ge),
                    Token::Name(name) => match ops::lookup_word_operator(&name) {
                        Some(op) => {
                            self.check_word_spacing(span)?;
                            Incoming::Binary(op)
                        }
                        None => {
                            return Err(CompileError::expression_detail(ErrorKind::UnknownAction, name, span));
                        }
                    },
                    Token::Colon => return Err(CompileError::expression(ErrorKind::UnknownAction, span)),
                    _ => return Err(CompileError::expression(ErrorKind::Syntax, span)),
                };
                (incoming, span)
            }
        };

        let priority = incoming.priority();
        while let Some(top) = self.stack.last() {
            if top.priority() == BARRIER || priority > top.priority() {
                break;
            }
            if let Some(pending) = self.stack.pop() {
                self.emit_pending(pending, span)?;
            }
        }

        if matches!(incoming, Incoming::End | Incoming::CloseParen | Incoming::CloseSquare)
            && self.top_kind() == Kind::Op(Op::Tuple)
        {
            self.close_tuple(span)?;
        }

        match incoming {
            Incoming::End => {
                if self.stack.len() > 1 {
                    return Err(CompileError::expression(ErrorKind::BrackNotFound, span));
                }
                Ok(None)
            }
            Incoming::CloseParen => {
                if self.top_kind() != Kind::OpenParen {
                    return Err(CompileError::expression(ErrorKind::BrackNotFound, span));
                }
                self.stack.pop();
                if let Kind::Op(op) = self.top_kind()
                    && op.is_function()
                {
                    let info = op.info();
                    let args = self.top_args_mut().map_or(0, |args| {
                        *args += 1;
                        *args
                    });
                    if args < info.min_args || args > info.max_args {
                        return Err(CompileError::expression(ErrorKind::ArgsCount, span));
                    }
                }
                Ok(Some(true))
            }
            Incoming::CloseSquare => {
                if self.top_kind() != Kind::OpenSquare {
                    return Err(CompileError::expression(ErrorKind::BrackNotFound, span));
                }
                self.stack.pop();
                if self.top_kind() == Kind::Op(Op::Var)
                    && let Some(args) = self.top_args_mut()
                {
                    *args += 1;
                }
                Ok(Some(true))
            }
            Incoming::Comma => {
                if self.top_kind() == Kind::OpenParen && is_function(self.below_top_kind()) {
                    self.function_comma(span)?;
                } else {
                    if self.top_kind() != Kind::Op(Op::Tuple) {
                        self.push(Pending::new(Kind::Op(Op::Tuple), 0), span)?;
                    }
                    let args = self.top_args_mut().map_or(0, |args| {
                        *args += 1;
                        *args
                    });
                    if args > MAX_ARGS {
                        return Err(CompileError::expression(ErrorKind::ArgsCount, span));
                    }
                }
                Ok(Some(false))
            }
            Incoming::Binary(op) => {
                let mut pending = Pending::new(Kind::Op(op), op.info().min_args);
                match op {
                    Op::And => pending.patch = Some(self.emit(Op::AndJump(0), None, 0, span)?),
                    Op::Or => pending.patch = Some(self.emit(Op::OrJump(0), None, 0, span)?),
                    _ => {}
                }
                self.push(pending, span)?;
                Ok(Some(false))
            }
        }
    }

    fn close_tuple(&mut self, span: Span) -> Result<()> {
        if let Some(mut tuple) = self.stack.pop() {
            tuple.args += 1;
            if tuple.args > MAX_ARGS {
                return Err(CompileError::expression(ErrorKind::ArgsCount, span));
            }
            self.emit(Op::Tuple, None, tuple.args, span)?;
        }
        Ok(())
    }

    /// A comma between the arguments of a bracketed function call
    fn function_comma(&mut self, span: Span) -> Result<()> {
        let index = self.stack.len() - 2;
        let Kind::Op(op) = self.stack[index].kind else {
            return Ok(());
        };
        self.stack[index].args += 1;
        let args = self.stack[index].args;
        if args > op.info().max_args {
            return Err(CompileError::expression(ErrorKind::ArgsCount, span));
        }
        if op == Op::Iif {
            if args == 1 {
                self.stack[index].patch = Some(self.emit(Op::JumpUnless(0), None, 0, span)?);
            } else {
                let jump = self.emit(Op::Jump(0), None, 0, span)?;
                let else_start = self.out.len();
                self.patch(self.stack[index].patch, else_start);
                self.stack[index].patch = Some(jump);
            }
        }
        Ok(())
    }

    /// Word operators need a separator after them
    fn check_word_spacing(&self, span: Span) -> Result<()> {
        match self.source[span.end..].chars().next() {
            Some(' ' | '\t' | '\'' | '"' | '{' | '(' | '[') => Ok(()),
            _ => Err(CompileError::expression(ErrorKind::Syntax, span)),
        }
    }

    /// Handle one token in value position; returns whether an operator
    /// is expected next
    fn value_step(&mut self) -> Result<bool> {
        let Some((token, span)) = self.next_token() else {
            let kind = if is_function(self.top_kind()) {
                ErrorKind::ArgsCount
            } else {
                ErrorKind::Syntax
            };
            return Err(CompileError::expression(kind, self.end_span()));
        };
        match token {
            Token::Number(n) => {
                let value = if self.top_kind() == Kind::Op(Op::Neg) {
                    self.stack.pop();
                    n.wrapping_neg()
                } else {
                    n
                };
                self.emit(Op::Push, Some(Value::Number(value)), 0, span)?;
                Ok(true)
            }
            Token::Str(text) => {
                let op = if text.is_empty() { Op::Push } else { Op::Format };
                self.emit(op, Some(Value::String(text)), 0, span)?;
                Ok(true)
            }
            Token::Code(code) => {
                self.emit(Op::Push, Some(Value::String(code)), 0, span)?;
                Ok(true)
            }
            Token::Minus => {
                self.push(Pending::new(Kind::Op(Op::Neg), 1), span)?;
                Ok(false)
            }
            Token::Plus => Ok(false),
            Token::LParen => {
                self.push(Pending::new(Kind::OpenParen, 0), span)?;
                Ok(false)
            }
            Token::RParen => {
                if self.top_kind() != Kind::OpenParen {
                    let kind = if is_function(self.top_kind()) {
                        ErrorKind::ArgsCount
                    } else {
                        ErrorKind::Syntax
                    };
                    return Err(CompileError::expression(kind, span));
                }
                self.stack.pop();
                match self.top_kind() {
                    Kind::Op(op) if op.is_function() => {
                        let args = self.stack.last().map_or(0, |p| p.args);
                        if args < op.info().min_args {
                            return Err(CompileError::expression(ErrorKind::ArgsCount, span));
                        }
                    }
                    _ => {
                        self.emit(Op::Tuple, None, 0, span)?;
                    }
                }
                Ok(true)
            }
            Token::LBracket => {
                self.push(Pending::new(Kind::OpenSquare, 0), span)?;
                self.push(Pending::new(Kind::Op(Op::Tuple), 0), span)?;
                Ok(false)
            }
            Token::RBracket => {
                if self.top_kind() != Kind::Op(Op::Tuple) {
                    return Err(CompileError::expression(ErrorKind::Syntax, span));
                }
                let args = self.stack.pop().map_or(0, |p| p.args);
                self.emit(Op::Tuple, None, args, span)?;
                if self.top_kind() != Kind::OpenSquare {
                    return Err(CompileError::expression(ErrorKind::BrackNotFound, span));
                }
                self.stack.pop();
                // `name[a,]` indexes by the tuple
                if self.top_kind() == Kind::Op(Op::Var)
                    && let Some(args) = self.top_args_mut()
                {
                    *args += 1;
                }
                Ok(true)
            }
            Token::Name(name) => self.name_value(name, span),
            _ => Err(CompileError::expression(ErrorKind::Syntax, span)),
        }
    }

    /// A name in value position: call, function or variable read
    fn name_value(&mut self, name: String, span: Span) -> Result<bool> {
        if let Some(location) = name.strip_prefix('@') {
            if location.is_empty() {
                return Err(CompileError::expression(ErrorKind::Syntax, span));
            }
            self.emit(Op::Push, Some(Value::String(location.to_string())), 0, span)?;
            self.push(Pending::new(Kind::Op(Op::Func(None)), 1), span)?;
            if self.peek_is(&Token::LParen) {
                self.pos += 1;
                self.push(Pending::new(Kind::OpenParen, 0), span)?;
                return Ok(false);
            }
            return Ok(true);
        }

        if let Some(function) = ops::lookup_function(&name) {
            if function.op.is_word_operator() {
                self.check_word_spacing(span)?;
            }
            let info = function.op.info();
            let mut pending = Pending::new(Kind::Op(function.op), 0);
            pending.cast = function.cast;
            if self.peek_is(&Token::LParen) {
                self.pos += 1;
                self.push(pending, span)?;
                self.push(Pending::new(Kind::OpenParen, 0), span)?;
                return Ok(false);
            }
            return match info.min_args {
                0 => {
                    self.push(pending, span)?;
                    Ok(true)
                }
                1 => {
                    pending.args = 1;
                    self.push(pending, span)?;
                    Ok(false)
                }
                _ => Err(CompileError::expression_detail(ErrorKind::BracksNotFound, name, span)),
            };
        }

        let literal = Some(Value::String(name));
        if self.peek_is(&Token::LBracket) {
            self.pos += 1;
            if self.peek_is(&Token::RBracket) {
                self.pos += 1;
                self.emit(Op::LastVar, literal, 0, span)?;
                return Ok(true);
            }
            let mut pending = Pending::new(Kind::Op(Op::Var), 0);
            pending.literal = literal;
            self.push(pending, span)?;
            self.push(Pending::new(Kind::OpenSquare, 0), span)?;
            return Ok(false);
        }
        self.emit(Op::Var, literal, 0, span)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops_of(source: &str) -> Vec<Op> {
        compile(source).unwrap().code.iter().map(|i| i.op).collect()
    }

    fn error_kind(source: &str) -> ErrorKind {
        compile(source).unwrap_err().kind()
    }

    #[test]
    fn test_precedence_order() {
        assert_eq!(ops_of("2+3*4"), vec![Op::Push, Op::Push, Op::Push, Op::Mul, Op::Add]);
        assert_eq!(ops_of("(2+3)*4"), vec![Op::Push, Op::Push, Op::Add, Op::Push, Op::Mul]);
        assert_eq!(ops_of("1-2-3"), vec![Op::Push, Op::Push, Op::Sub, Op::Push, Op::Sub]);
    }

    #[test]
    fn test_negative_literal_folds() {
        let code = compile("-5").unwrap().code;
        assert_eq!(code.len(), 1);
        assert_eq!(code[0].literal, Some(Value::Number(-5)));
        assert_eq!(ops_of("-a"), vec![Op::Var, Op::Neg]);
        assert_eq!(ops_of("+7"), vec![Op::Push]);
    }

    #[test]
    fn test_and_or_lowered_to_jumps() {
        let code = compile("a AND b").unwrap().code;
        assert_eq!(code[1].op, Op::AndJump(4));
        assert_eq!(code[3].op, Op::Truth);
        let code = compile("a OR b").unwrap().code;
        assert_eq!(code[1].op, Op::OrJump(4));
    }

    #[test]
    fn test_iif_lowered_to_jumps() {
        let code = compile("iif(c, 1, 2)").unwrap().code;
        let ops: Vec<Op> = code.iter().map(|i| i.op).collect();
        assert_eq!(ops, vec![Op::Var, Op::JumpUnless(4), Op::Push, Op::Jump(5), Op::Push]);
    }

    #[test]
    fn test_variable_forms() {
        let code = compile("$arr['k']").unwrap().code;
        assert_eq!(code.last().map(|i| (i.op, i.arg_count)), Some((Op::Var, 1)));
        assert_eq!(ops_of("arr[]"), vec![Op::LastVar]);
        assert_eq!(ops_of("arr[1, 2]"), vec![Op::Push, Op::Push, Op::Tuple, Op::Var]);
        let code = compile("arr[1,]").unwrap().code;
        let shape: Vec<(Op, usize)> = code.iter().map(|i| (i.op, i.arg_count)).collect();
        assert_eq!(shape, vec![(Op::Push, 0), (Op::Tuple, 1), (Op::Var, 1)]);
        let code = compile("arr[[1,]]").unwrap().code;
        assert_eq!(code.last().map(|i| (i.op, i.arg_count)), Some((Op::Var, 1)));
    }

    #[test]
    fn test_tuples() {
        let code = compile("(1, 'a', 3)").unwrap().code;
        assert_eq!(code.last().map(|i| (i.op, i.arg_count)), Some((Op::Tuple, 3)));
        let code = compile("[]").unwrap().code;
        assert_eq!(code.last().map(|i| (i.op, i.arg_count)), Some((Op::Tuple, 0)));
        let code = compile("[5]").unwrap().code;
        assert_eq!(code.last().map(|i| (i.op, i.arg_count)), Some((Op::Tuple, 1)));
        assert_eq!(ops_of("()"), vec![Op::Tuple]);
    }

    #[test]
    fn test_function_calls() {
        let code = compile("mid('abc', 2, 1)").unwrap().code;
        assert_eq!(code.last().map(|i| (i.op, i.arg_count)), Some((Op::Mid, 3)));
        assert_eq!(ops_of("rnd"), vec![Op::Rnd]);
        assert_eq!(ops_of("rnd()"), vec![Op::Rnd]);
        assert_eq!(ops_of("len $s + 1"), vec![Op::Var, Op::Len, Op::Push, Op::Add]);
        assert_eq!(ops_of("no a = b"), vec![Op::Var, Op::Var, Op::Eq, Op::Not]);
        assert_eq!(ops_of("no'x'"), ops_of("no 'x'"));
        assert_eq!(ops_of("no(1)"), vec![Op::Push, Op::Not]);
        let code = compile("@proc(1)").unwrap().code;
        assert_eq!(code.last().map(|i| (i.op, i.arg_count)), Some((Op::Func(None), 2)));
        assert_eq!(ops_of("$max(1, 2)"), vec![Op::Push, Op::Push, Op::Max, Op::Cast(ValueType::String)]);
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(ops_of("'x<<a>>'"), vec![Op::Format]);
        assert_eq!(ops_of("''"), vec![Op::Push]);
        assert_eq!(ops_of("{p 1}"), vec![Op::Push]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(error_kind("(1 + 2"), ErrorKind::BrackNotFound);
        assert_eq!(error_kind("1 + 2)"), ErrorKind::BrackNotFound);
        assert_eq!(error_kind("1 +"), ErrorKind::Syntax);
        assert_eq!(error_kind("1 2"), ErrorKind::Syntax);
        assert_eq!(error_kind("1 foo 2"), ErrorKind::UnknownAction);
        assert_eq!(error_kind("mid 'abc'"), ErrorKind::BracksNotFound);
        assert_eq!(error_kind("len()"), ErrorKind::ArgsCount);
        assert_eq!(error_kind("len(1, 2)"), ErrorKind::ArgsCount);
        assert_eq!(error_kind("mid('a'"), ErrorKind::BrackNotFound);
        assert_eq!(error_kind("1 and-1"), ErrorKind::Syntax);
        assert_eq!(error_kind("no-1"), ErrorKind::Syntax);
        assert_eq!(error_kind("obj+'x'"), ErrorKind::Syntax);
        assert_eq!(error_kind("'open"), ErrorKind::QuotNotFound);
        assert_eq!(error_kind(""), ErrorKind::Syntax);
    }

    #[test]
    fn test_limits() {
        let deep = format!("{}1{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(error_kind(&deep), ErrorKind::StackOverflow);
        let long = vec!["1"; 120].join("+");
        assert_eq!(error_kind(&long), ErrorKind::TooManyItems);
        let wide = format!("({})", vec!["1"; 21].join(","));
        assert_eq!(error_kind(&wide), ErrorKind::ArgsCount);
    }
}
