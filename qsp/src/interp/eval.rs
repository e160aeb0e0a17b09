//! Expression evaluator
//!
//! Runs a compiled expression on a value stack. Short-circuit operators
//! were lowered into jumps by the compiler, so evaluation is one flat
//! loop over the instructions.

use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::ops::{self, expect_number};
use super::pattern::PatternCache;
use super::rng::Rng;
use super::scope::SaveStack;
use super::value::{Value, ValueType};
use super::vars::{Slot, VarName, VarStore, convert_for};
use crate::config::EngineConfig;
use crate::expr::{self, ArgType, CompiledExpression, Op};
use crate::host::Host;
use crate::preprocessor::text::str_pos;
use crate::world::World;
use crate::world::state::GameState;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

/// Stack growth parameters for nested calls
pub(crate) const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
pub(crate) const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// Compiled expressions kept before the cache is dropped
const EXPRESSION_CACHE_LIMIT: usize = 4096;

/// Place the interpreter is executing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Site {
    pub location: Option<String>,
    pub action: Option<usize>,
    pub line: usize,
}

/// The interpreter
///
/// Owns the whole mutable state of a game: the world, variables, save
/// groups, screen state and the host callbacks.
pub struct Interpreter {
    pub(crate) config: EngineConfig,
    pub(crate) world: World,
    pub(crate) vars: VarStore,
    pub(crate) saves: SaveStack,
    pub(crate) state: GameState,
    pub(crate) rng: Rng,
    pub(crate) host: Box<dyn Host>,
    /// Bumped whenever the current location is replaced
    pub(crate) refresh_count: u64,
    /// Current nesting of location and code calls
    pub(crate) call_depth: usize,
    pub(crate) site: Site,
    /// Site of the first error of the running entry point
    pub(crate) error_site: Option<Site>,
    started: DateTime<Utc>,
    expressions: HashMap<String, Rc<CompiledExpression>>,
    patterns: PatternCache,
}

fn clock_seed() -> u32 {
    let now = Utc::now();
    now.timestamp_subsec_nanos() ^ (now.timestamp() as u32)
}

impl Interpreter {
    pub fn new(config: EngineConfig, host: Box<dyn Host>) -> Self {
        let seed = config.rand_seed.unwrap_or_else(clock_seed);
        Interpreter {
            vars: VarStore::new(config.max_variables, config.max_array_items),
            config,
            world: World::new(),
            saves: SaveStack::new(),
            state: GameState::new(),
            rng: Rng::new(seed),
            host,
            refresh_count: 0,
            call_depth: 0,
            site: Site::default(),
            error_site: None,
            started: Utc::now(),
            expressions: HashMap::new(),
            patterns: PatternCache::new(),
        }
    }

    /// Forget variables and everything on screen
    pub fn reset(&mut self) {
        self.vars.clear();
        self.saves.clear();
        self.state.reset();
        let seed = self.config.rand_seed.unwrap_or_else(clock_seed);
        self.rng.reseed(seed);
        self.refresh_count += 1;
        self.site = Site::default();
    }

    /// Milliseconds since the interpreter was created
    pub fn elapsed_msecs(&self) -> i64 {
        (Utc::now() - self.started).num_milliseconds()
    }

    fn compiled(&mut self, source: &str) -> InterpResult<Rc<CompiledExpression>> {
        if let Some(code) = self.expressions.get(source) {
            return Ok(Rc::clone(code));
        }
        let code = Rc::new(expr::compile(source)?);
        if self.expressions.len() >= EXPRESSION_CACHE_LIMIT {
            self.expressions.clear();
        }
        self.expressions.insert(source.to_string(), Rc::clone(&code));
        Ok(code)
    }

    /// Compile and evaluate an expression
    pub fn eval_str(&mut self, source: &str) -> InterpResult<Value> {
        let code = self.compiled(source)?;
        self.evaluate(&code)
    }

    pub fn eval_number(&mut self, source: &str) -> InterpResult<i64> {
        let value = self.eval_str(source)?;
        expect_number(&value)
    }

    /// Run a compiled expression
    pub fn evaluate(&mut self, code: &CompiledExpression) -> InterpResult<Value> {
        let stamp = self.refresh_count;
        let mut stack: Vec<Value> = Vec::with_capacity(expr::MAX_STACK);
        let mut pc = 0;
        while let Some(ins) = code.code.get(pc) {
            pc += 1;
            match ins.op {
                Op::Push => stack.push(ins.literal.clone().unwrap_or(Value::Number(0))),
                Op::Format => {
                    let text = match &ins.literal {
                        Some(Value::String(s)) => s.as_str(),
                        _ => "",
                    };
                    let formatted = self.format_text(text)?;
                    self.check_refresh(stamp)?;
                    stack.push(Value::String(formatted));
                }
                Op::Var => {
                    let index = if ins.arg_count > 0 {
                        pop(&mut stack)?
                    } else {
                        Value::Number(0)
                    };
                    let name = VarName::parse(&literal_name(ins.literal.as_ref()))?;
                    stack.push(self.vars.get(&name, &index));
                }
                Op::LastVar => {
                    let name = VarName::parse(&literal_name(ins.literal.as_ref()))?;
                    stack.push(self.vars.get_last(&name));
                }
                Op::Jump(target) => pc = target,
                Op::JumpUnless(target) => {
                    if !truth(&pop(&mut stack)?)? {
                        pc = target;
                    }
                }
                Op::AndJump(target) => {
                    if !truth(&pop(&mut stack)?)? {
                        stack.push(Value::from_bool(false));
                        pc = target;
                    }
                }
                Op::OrJump(target) => {
                    if truth(&pop(&mut stack)?)? {
                        stack.push(Value::from_bool(true));
                        pc = target;
                    }
                }
                Op::Truth => {
                    let value = pop(&mut stack)?;
                    stack.push(Value::from_bool(truth(&value)?));
                }
                Op::Cast(ty) => {
                    let value = pop(&mut stack)?;
                    stack.push(convert_for(ty, value)?);
                }
                op => {
                    if stack.len() < ins.arg_count {
                        return Err(RuntimeError::syntax());
                    }
                    let raw = stack.split_off(stack.len() - ins.arg_count);
                    let mut args = Vec::with_capacity(raw.len());
                    for (i, value) in raw.into_iter().enumerate() {
                        args.push(coerce_arg(value, op.arg_type(i))?);
                    }
                    let result = self.call_op(op, args)?;
                    if op.may_refresh() {
                        self.check_refresh(stamp)?;
                    }
                    stack.push(result);
                }
            }
        }
        pop(&mut stack)
    }

    /// Abort when the location was replaced since `stamp` was taken
    pub(crate) fn check_refresh(&self, stamp: u64) -> InterpResult<()> {
        if self.refresh_count == stamp {
            Ok(())
        } else {
            Err(RuntimeError::aborted())
        }
    }

    /// Replace every `<<expr>>` part of a text by the value of `expr`
    pub fn format_text(&mut self, text: &str) -> InterpResult<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find("<<") {
            out.push_str(&rest[..open]);
            let inner = &rest[open + 2..];
            let close = str_pos(inner, ">>", false)
                .ok_or_else(|| RuntimeError::new(ErrorKind::BrackNotFound))?;
            let value = self.eval_str(&inner[..close])?;
            out.push_str(&value.into_text());
            rest = &inner[close + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn call_op(&mut self, op: Op, args: Vec<Value>) -> InterpResult<Value> {
        let value = match op {
            Op::Tuple => Value::Tuple(args),
            Op::Neg => Value::Number(number(&args, 0).wrapping_neg()),
            Op::Add => ops::add(arg(&args, 0), arg(&args, 1))?,
            Op::Sub => ops::arith('-', arg(&args, 0), arg(&args, 1))?,
            Op::Mul => ops::arith('*', arg(&args, 0), arg(&args, 1))?,
            Op::Div => ops::arith('/', arg(&args, 0), arg(&args, 1))?,
            Op::Mod => Value::Number(ops::modulo(number(&args, 0), number(&args, 1))?),
            Op::Append => ops::append(arg(&args, 0), arg(&args, 1)),
            Op::Eq | Op::Ne | Op::Lt | Op::Gt | Op::Le | Op::Ge => {
                let order = arg(&args, 0).compare(&arg(&args, 1));
                Value::from_bool(match op {
                    Op::Eq => order.is_eq(),
                    Op::Ne => order.is_ne(),
                    Op::Lt => order.is_lt(),
                    Op::Gt => order.is_gt(),
                    Op::Le => order.is_le(),
                    _ => order.is_ge(),
                })
            }
            Op::And => Value::from_bool(number(&args, 0) != 0 && number(&args, 1) != 0),
            Op::Or => Value::from_bool(number(&args, 0) != 0 || number(&args, 1) != 0),
            Op::Not => Value::from_bool(number(&args, 0) == 0),
            Op::Loc => Value::from_bool(self.world.contains(text(&args, 0))),
            Op::Obj => Value::from_bool(self.state.object_index(text(&args, 0)).is_some()),
            Op::Iif => {
                let mut args = args.into_iter();
                let cond = args.next().unwrap_or(Value::Number(0));
                let (yes, no) = (args.next(), args.next());
                let picked = if truth(&cond)? { yes } else { no };
                picked.unwrap_or(Value::Number(0))
            }

            Op::ArrItem => {
                let name = VarName::parse(text(&args, 0))?;
                let index = args.get(1).cloned().unwrap_or(Value::Number(0));
                self.vars.get(&name, &index)
            }
            Op::Min | Op::Max => {
                let want_min = op == Op::Min;
                if args.len() == 1 {
                    let name = VarName::parse(&args[0].to_text())?;
                    self.vars.min_max(&name, want_min)
                } else {
                    pick_extreme(args, want_min)
                }
            }
            Op::Rand => {
                let low = number(&args, 0);
                let high = args.get(1).map_or(1, |_| number(&args, 1));
                Value::Number(self.rng.range(low, high))
            }
            Op::Rnd => Value::Number(self.rng.range(1, 1000)),
            Op::Rgb => {
                let channel = |i: usize| number(&args, i).clamp(0, 255);
                let alpha = args.get(3).map_or(255, |_| channel(3));
                let packed = (alpha << 24) | (channel(2) << 16) | (channel(1) << 8) | channel(0);
                Value::Number(packed)
            }

            Op::Len => match args.first() {
                Some(Value::Tuple(items)) => Value::Number(items.len() as i64),
                Some(other) => Value::Number(other.to_text().chars().count() as i64),
                None => Value::Number(0),
            },
            Op::IsNum => Value::from_bool(args.first().is_some_and(Value::is_numeric)),
            Op::Val => Value::Number(args.first().and_then(Value::to_number).unwrap_or(0)),
            Op::Str => Value::String(text(&args, 0).to_string()),
            Op::LCase => Value::String(text(&args, 0).to_lowercase()),
            Op::UCase => Value::String(text(&args, 0).to_uppercase()),
            Op::Trim => Value::String(text(&args, 0).trim_matches([' ', '\t']).to_string()),
            Op::Mid => Value::String(mid(text(&args, 0), number(&args, 1), args.get(2).map(|_| number(&args, 2)))),
            Op::Instr => Value::Number(instr(&args)?),
            Op::Replace => {
                let (source, from, to) = (text(&args, 0), text(&args, 1), text(&args, 2));
                if from.is_empty() {
                    Value::String(source.to_string())
                } else {
                    Value::String(source.replace(from, to))
                }
            }

            Op::ArrSize => {
                let name = VarName::parse(text(&args, 0))?;
                Value::Number(self.vars.size(&name.key) as i64)
            }
            Op::ArrPos => {
                let name = VarName::parse(text(&args, 0))?;
                let value = args.get(1).cloned().unwrap_or(Value::Number(0));
                Value::Number(self.vars.position_of(&name, &value, number(&args, 2))?)
            }
            Op::ArrComp => {
                let name = VarName::parse(text(&args, 0))?;
                let pattern = self.patterns.get(text(&args, 1))?;
                Value::Number(self.vars.position_matching(&name.key, &pattern, number(&args, 2)))
            }
            Op::StrComp => {
                let pattern = self.patterns.get(text(&args, 1))?;
                Value::from_bool(pattern.matches(text(&args, 0)))
            }
            Op::StrFind | Op::StrPos => {
                let pattern = self.patterns.get(text(&args, 1))?;
                let group = usize::try_from(number(&args, 2)).unwrap_or(0);
                if op == Op::StrFind {
                    Value::String(pattern.find(text(&args, 0), group).unwrap_or_default().to_string())
                } else {
                    Value::Number(pattern.position(text(&args, 0), group))
                }
            }

            Op::Func(ty) => {
                let mut args = args.into_iter();
                let name = args.next().map(Value::into_text).unwrap_or_default();
                let result = self.call_location(&name, args.collect(), false)?;
                result_value(result, ty)
            }
            Op::DynEval(ty) => {
                let mut args = args.into_iter();
                let code = args.next().map(Value::into_text).unwrap_or_default();
                let result = self.call_code(&code, args.collect())?;
                result_value(result, ty)
            }
            Op::Desc => Value::String(self.location_description(text(&args, 0))?),

            Op::Input => Value::String(self.host.input(text(&args, 0))),
            Op::IsPlay => Value::from_bool(self.host.is_playing(text(&args, 0))),
            Op::MsecsCount => {
                let msecs = self.host.msecs().unwrap_or_else(|| self.elapsed_msecs());
                Value::Number(msecs)
            }
            Op::QspVer => {
                if text(&args, 0).eq_ignore_ascii_case("platform") {
                    Value::from("rust")
                } else {
                    Value::from(env!("CARGO_PKG_VERSION"))
                }
            }
            Op::UserText => {
                let typed = self.host.user_text();
                Value::String(typed.unwrap_or_else(|| self.state.user_input.clone()))
            }

            Op::CountObj => Value::Number(self.state.objects.len() as i64),
            Op::GetObj => {
                let object = usize::try_from(number(&args, 0).wrapping_sub(1))
                    .ok()
                    .and_then(|i| self.state.objects.get(i));
                Value::String(object.map(|o| o.name.clone()).unwrap_or_default())
            }
            Op::CurLoc => Value::String(self.state.current_location.clone().unwrap_or_default()),
            Op::SelObj => {
                let object = self.state.selected_object.and_then(|i| self.state.objects.get(i));
                Value::String(object.map(|o| o.name.clone()).unwrap_or_default())
            }
            Op::SelAct => {
                let action = self.state.selected_action.and_then(|i| self.state.actions.get(i));
                Value::String(action.map(|a| a.desc.clone()).unwrap_or_default())
            }
            Op::MainText => Value::String(self.state.main_text.clone()),
            Op::StatText => Value::String(self.state.stat_text.clone()),
            Op::CurActs => Value::String(self.state.actions_as_code()),
            Op::CurObjs => Value::String(self.state.objects_as_code()),

            Op::Push
            | Op::Format
            | Op::Var
            | Op::LastVar
            | Op::Jump(_)
            | Op::JumpUnless(_)
            | Op::AndJump(_)
            | Op::OrJump(_)
            | Op::Truth
            | Op::Cast(_) => return Err(RuntimeError::syntax()),
        };
        trace!(?op, "op");
        Ok(value)
    }
}

/// Coerce an argument to the type an operation or statement expects
pub(crate) fn coerce_arg(value: Value, ty: ArgType) -> InterpResult<Value> {
    match ty {
        ArgType::Number => Ok(Value::Number(expect_number(&value)?)),
        ArgType::String | ArgType::Code => Ok(Value::String(value.into_text())),
        ArgType::Any => Ok(value),
    }
}

pub(crate) fn truth(value: &Value) -> InterpResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| RuntimeError::type_mismatch("number", value.type_name()))
}

/// `RESULT` of a call, read through the sigil of the calling function
pub(crate) fn result_value(slot: Option<Slot>, ty: Option<ValueType>) -> Value {
    match (slot, ty) {
        (Some(slot), Some(ty)) => slot.get(ty),
        (Some(slot), None) => slot.preferred(),
        (None, Some(ty)) => Value::default_of(ty),
        (None, None) => Value::Number(0),
    }
}

fn pop(stack: &mut Vec<Value>) -> InterpResult<Value> {
    stack.pop().ok_or_else(RuntimeError::syntax)
}

fn literal_name(literal: Option<&Value>) -> String {
    literal.map(Value::to_text).unwrap_or_default()
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Number(0))
}

/// Numeric argument; arguments were coerced before the call
fn number(args: &[Value], index: usize) -> i64 {
    args.get(index).and_then(Value::to_number).unwrap_or(0)
}

fn text(args: &[Value], index: usize) -> &str {
    match args.get(index) {
        Some(Value::String(s)) => s,
        _ => "",
    }
}

fn pick_extreme(args: Vec<Value>, want_min: bool) -> Value {
    let mut best: Option<Value> = None;
    for value in args {
        best = match best {
            Some(current) => {
                let order = value.compare(&current);
                if (want_min && order.is_lt()) || (!want_min && order.is_gt()) {
                    Some(value)
                } else {
                    Some(current)
                }
            }
            None => Some(value),
        };
    }
    best.unwrap_or(Value::Number(0))
}

fn mid(source: &str, start: i64, len: Option<i64>) -> String {
    let skip = usize::try_from(start.max(1) - 1).unwrap_or(0);
    match len {
        Some(n) if n < 0 => String::new(),
        Some(n) => source
            .chars()
            .skip(skip)
            .take(usize::try_from(n).unwrap_or(0))
            .collect(),
        None => source.chars().skip(skip).collect(),
    }
}

/// `INSTR(text, sub[, start])`, or the older `INSTR(start, text, sub)`
fn instr(args: &[Value]) -> InterpResult<i64> {
    let legacy = args.len() == 3
        && matches!(args[0], Value::Number(_))
        && !matches!(args[2], Value::Number(_));
    let (haystack, needle, start) = if legacy {
        (args[1].to_text(), args[2].to_text(), expect_number(&args[0])?)
    } else {
        let start = match args.get(2) {
            Some(value) => expect_number(value)?,
            None => 1,
        };
        (arg(args, 0).to_text(), arg(args, 1).to_text(), start)
    };
    let haystack: Vec<char> = haystack.chars().collect();
    let needle: Vec<char> = needle.chars().collect();
    let from = usize::try_from(start.max(1) - 1).unwrap_or(0);
    if from > haystack.len() {
        return Ok(0);
    }
    if needle.is_empty() {
        return Ok(from as i64 + 1);
    }
    Ok(haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle.as_slice())
        .map_or(0, |p| (from + p) as i64 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;

    fn interp() -> Interpreter {
        let config = EngineConfig {
            rand_seed: Some(7),
            ..EngineConfig::default()
        };
        Interpreter::new(config, Box::new(NullHost))
    }

    fn eval(source: &str) -> Value {
        interp().eval_str(source).unwrap()
    }

    fn eval_err(source: &str) -> ErrorKind {
        interp().eval_str(source).unwrap_err().kind
    }

    #[test]
    fn test_eval_arithmetic() {
        assert_eq!(eval("2+3*4"), Value::Number(14));
        assert_eq!(eval("(2+3)*4"), Value::Number(20));
        assert_eq!(eval("-7 / 2"), Value::Number(-3));
        assert_eq!(eval("7 mod 3"), Value::Number(1));
        assert_eq!(eval("'5' + 1"), Value::Number(6));
        assert_eq!(eval("'a' + 1"), Value::from("a1"));
        assert_eq!(eval("'a' & 1"), Value::from("a1"));
    }

    #[test]
    fn test_eval_division_by_zero() {
        assert_eq!(eval_err("5/0"), ErrorKind::DivByZero);
        assert_eq!(eval_err("5 MOD 0"), ErrorKind::DivByZero);
    }

    #[test]
    fn test_eval_logic_short_circuits() {
        assert_eq!(eval("1=1 AND 2=2"), Value::Number(1));
        assert_eq!(eval("0 AND 1/0"), Value::Number(0));
        assert_eq!(eval("5 OR 1/0"), Value::Number(1));
        assert_eq!(eval("iif(1, 'yes', 1/0)"), Value::from("yes"));
        assert_eq!(eval("no 0"), Value::Number(1));
    }

    #[test]
    fn test_eval_comparisons() {
        assert_eq!(eval("'10' > 9"), Value::Number(1));
        assert_eq!(eval("'b' > 'a'"), Value::Number(1));
        assert_eq!(eval("(1, 2) < (1, 2, 0)"), Value::Number(1));
        assert_eq!(eval("'x' <> 'x'"), Value::Number(0));
    }

    #[test]
    fn test_eval_string_functions() {
        assert_eq!(eval("len('héllo')"), Value::Number(5));
        assert_eq!(eval("$mid('abcdef', 2, 3)"), Value::from("bcd"));
        assert_eq!(eval("$mid('abcdef', 0)"), Value::from("abcdef"));
        assert_eq!(eval("$mid('abcdef', 2, -1)"), Value::from(""));
        assert_eq!(eval("instr('abcabc', 'c')"), Value::Number(3));
        assert_eq!(eval("instr('abcabc', 'c', 4)"), Value::Number(6));
        assert_eq!(eval("instr(4, 'abcabc', 'c')"), Value::Number(6));
        assert_eq!(eval("instr('abc', 'z')"), Value::Number(0));
        assert_eq!(eval("$replace('a-b-c', '-')"), Value::from("abc"));
        assert_eq!(eval("$replace('abc', '', 'x')"), Value::from("abc"));
        assert_eq!(eval("$trim('  x ')"), Value::from("x"));
        assert_eq!(eval("$ucase('ab') & $lcase('CD')"), Value::from("ABcd"));
        assert_eq!(eval("val('12x')"), Value::Number(0));
        assert_eq!(eval("isnum(' -4 ')"), Value::Number(1));
        assert_eq!(eval("isnum('')"), Value::Number(1));
    }

    #[test]
    fn test_eval_interpolation() {
        let mut interp = interp();
        interp
            .vars
            .set(&VarName::parse("gold").unwrap(), &Value::Number(0), Value::Number(3))
            .unwrap();
        assert_eq!(interp.eval_str("'You have <<gold*2>> coins'").unwrap(), Value::from("You have 6 coins"));
        let err = interp.eval_str("'broken <<gold'").unwrap_err();
        assert_eq!(err.kind, ErrorKind::BrackNotFound);
    }

    #[test]
    fn test_eval_rgb_and_random() {
        assert_eq!(eval("rgb(255, 0, 0)"), Value::Number(0xFF00_00FF));
        assert_eq!(eval("rgb(300, -1, 1, 0)"), Value::Number(0x0001_00FF));
        let mut interp = interp();
        for _ in 0..50 {
            let n = interp.eval_number("rand(3, 5)").unwrap();
            assert!((3..=5).contains(&n));
            let r = interp.eval_number("rnd").unwrap();
            assert!((1..=1000).contains(&r));
        }
    }

    #[test]
    fn test_eval_min_max() {
        assert_eq!(eval("max(3, 9, 4)"), Value::Number(9));
        assert_eq!(eval("$min('pear', 'apple')"), Value::from("apple"));
        let mut interp = interp();
        let arr = VarName::parse("arr").unwrap();
        for (i, n) in [5, 1, 8].iter().enumerate() {
            interp.vars.set(&arr, &Value::Number(i as i64), Value::Number(*n)).unwrap();
        }
        assert_eq!(interp.eval_str("min('arr')").unwrap(), Value::Number(1));
        assert_eq!(interp.eval_str("arrsize('arr')").unwrap(), Value::Number(3));
        assert_eq!(interp.eval_str("arrpos('arr', 8)").unwrap(), Value::Number(2));
        assert_eq!(interp.eval_str("arritem('arr', 1)").unwrap(), Value::Number(1));
        assert_eq!(interp.eval_str("arr[]").unwrap(), Value::Number(8));
    }

    #[test]
    fn test_eval_regex_functions() {
        assert_eq!(eval("strcomp('abc', 'a.c')"), Value::Number(1));
        assert_eq!(eval("strcomp('abcd', 'a.c')"), Value::Number(0));
        assert_eq!(eval("$strfind('key=42', '(\\w+)=(\\d+)', 2)"), Value::from("42"));
        assert_eq!(eval("strfind('no match', '\\d+')"), Value::from(""));
        assert_eq!(eval("strpos('key=42', '\\d+')"), Value::Number(5));
        assert_eq!(eval("strpos('key=42', '(\\d)(\\d)', 2)"), Value::Number(6));
        assert_eq!(eval_err("strcomp('x', '(')"), ErrorKind::IncorrectRegExp);

        let mut interp = interp();
        let words = VarName::parse("$s").unwrap();
        for (i, word) in ["apple", "banana"].iter().enumerate() {
            interp.vars.set(&words, &Value::Number(i as i64), Value::from(*word)).unwrap();
        }
        assert_eq!(interp.eval_str("arrcomp('$s', 'b.*')").unwrap(), Value::Number(1));
        assert_eq!(interp.eval_str("arrcomp('$s', 'a.*', 1)").unwrap(), Value::Number(-1));
        assert_eq!(interp.eval_str("arrpos('$s', 'banana')").unwrap(), Value::Number(1));
    }

    #[test]
    fn test_eval_type_mismatch() {
        assert_eq!(eval_err("'abc' * 2"), ErrorKind::TypeMismatch);
        assert_eq!(eval_err("iif('x', 1, 2)"), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_eval_version() {
        assert_eq!(eval("$qspver('PLATFORM')"), Value::from("rust"));
        assert_eq!(eval("$qspver"), Value::from(env!("CARGO_PKG_VERSION")));
    }
}
