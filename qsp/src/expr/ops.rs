//! Opcodes, their priorities and arities, and the function name table

use crate::interp::value::ValueType;
use std::sync::LazyLock;

/// Most arguments any operation accepts
pub const MAX_ARGS: usize = 20;

/// Priority of brackets, tuples and the expression start
pub const BARRIER: u8 = 127;

/// How an argument is coerced before an operation sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Number,
    String,
    /// Code text; coerced like a string
    Code,
    Any,
}

/// Expression opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // Values
    /// Push the literal
    Push,
    /// Push the literal string with `<<expr>>` parts evaluated
    Format,
    /// Read a variable item; the literal holds the name, an optional
    /// argument holds the index
    Var,
    /// Read the last item of the variable named by the literal
    LastVar,
    Tuple,

    // Lowered control flow
    Jump(usize),
    /// Pop a condition and jump when it is false
    JumpUnless(usize),
    /// Pop the left side of `AND`; when false push 0 and jump
    AndJump(usize),
    /// Pop the left side of `OR`; when true push 1 and jump
    OrJump(usize),
    /// Replace the top of the stack by 1 or 0
    Truth,
    /// Convert the top of the stack to the given type
    Cast(ValueType),

    // Operators
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Append,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    Not,
    Loc,
    Obj,

    // Functions
    ArrItem,
    Min,
    Max,
    Rand,
    Iif,
    Rgb,
    Len,
    IsNum,
    LCase,
    UCase,
    Input,
    Str,
    Val,
    ArrSize,
    IsPlay,
    Desc,
    Trim,
    GetObj,
    Mid,
    ArrPos,
    ArrComp,
    Instr,
    Replace,
    StrComp,
    StrFind,
    StrPos,
    /// Call a location; the type picks the `RESULT` part, if given
    Func(Option<ValueType>),
    /// Run a code string; the type picks the `RESULT` part, if given
    DynEval(Option<ValueType>),
    Rnd,
    CountObj,
    MsecsCount,
    QspVer,
    UserText,
    CurLoc,
    SelObj,
    SelAct,
    MainText,
    StatText,
    CurActs,
    CurObjs,
}

/// Static description of an opcode
#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub priority: u8,
    pub min_args: usize,
    pub max_args: usize,
    /// Argument types; the last entry repeats for the remaining ones
    pub args: &'static [ArgType],
    /// `None` when the result type depends on the arguments
    pub result: Option<ValueType>,
}

const fn info(
    priority: u8,
    min_args: usize,
    max_args: usize,
    args: &'static [ArgType],
    result: Option<ValueType>,
) -> OpInfo {
    OpInfo {
        priority,
        min_args,
        max_args,
        args,
        result,
    }
}

use ArgType::{Any, Code, Number as Num, String as Str};

const NUM: Option<ValueType> = Some(ValueType::Number);
const STR: Option<ValueType> = Some(ValueType::String);

impl Op {
    pub fn info(self) -> OpInfo {
        match self {
            Op::Push | Op::Format | Op::LastVar => info(0, 0, 0, &[], None),
            Op::Var => info(30, 0, 1, &[Any], None),
            Op::Tuple => info(BARRIER, 0, MAX_ARGS, &[Any], Some(ValueType::Tuple)),
            Op::Jump(_) | Op::JumpUnless(_) | Op::AndJump(_) | Op::OrJump(_) => info(0, 0, 0, &[], None),
            Op::Truth => info(0, 1, 1, &[Num], NUM),
            Op::Cast(ty) => info(0, 1, 1, &[Any], Some(ty)),

            Op::Neg => info(18, 1, 1, &[Num], NUM),
            Op::Mul | Op::Div => info(17, 2, 2, &[Any], None),
            Op::Mod => info(16, 2, 2, &[Num], NUM),
            Op::Add | Op::Sub => info(14, 2, 2, &[Any], None),
            Op::Append => info(12, 2, 2, &[Any], None),
            Op::Loc | Op::Obj => info(11, 1, 1, &[Str], NUM),
            Op::Eq | Op::Ne | Op::Lt | Op::Gt | Op::Le | Op::Ge => info(10, 2, 2, &[Any], NUM),
            Op::Not => info(8, 1, 1, &[Num], NUM),
            Op::And => info(7, 2, 2, &[Num], NUM),
            Op::Or => info(6, 2, 2, &[Num], NUM),

            Op::ArrItem => info(30, 1, 2, &[Str, Any], None),
            Op::Min | Op::Max => info(30, 1, MAX_ARGS, &[Any], None),
            Op::Rand => info(30, 1, 2, &[Num], NUM),
            Op::Iif => info(30, 3, 3, &[Num, Any], None),
            Op::Rgb => info(30, 3, 4, &[Num], NUM),
            Op::Len | Op::IsNum | Op::Val => info(30, 1, 1, &[Any], NUM),
            Op::LCase | Op::UCase | Op::Input | Op::Str | Op::Desc | Op::Trim => info(30, 1, 1, &[Str], STR),
            Op::ArrSize | Op::IsPlay => info(30, 1, 1, &[Str], NUM),
            Op::GetObj => info(30, 1, 1, &[Num], STR),
            Op::Mid => info(30, 2, 3, &[Str, Num], STR),
            Op::ArrPos => info(30, 2, 3, &[Str, Any, Num], NUM),
            Op::ArrComp => info(30, 2, 3, &[Str, Str, Num], NUM),
            Op::Instr => info(30, 2, 3, &[Any], NUM),
            Op::Replace => info(30, 2, 3, &[Str], STR),
            Op::StrComp => info(30, 2, 2, &[Str], NUM),
            Op::StrFind => info(30, 2, 3, &[Str, Str, Num], STR),
            Op::StrPos => info(30, 2, 3, &[Str, Str, Num], NUM),
            Op::Func(_) => info(30, 1, MAX_ARGS, &[Str, Any], None),
            Op::DynEval(_) => info(30, 1, MAX_ARGS, &[Code, Any], None),
            Op::Rnd | Op::CountObj | Op::MsecsCount => info(30, 0, 0, &[], NUM),
            Op::QspVer => info(30, 0, 1, &[Str], STR),
            Op::UserText | Op::CurLoc | Op::SelObj | Op::SelAct | Op::MainText | Op::StatText => {
                info(30, 0, 0, &[], STR)
            }
            Op::CurActs | Op::CurObjs => info(30, 0, 0, &[], STR),
        }
    }

    pub fn priority(self) -> u8 {
        self.info().priority
    }

    /// Type the `index`-th argument is coerced to
    pub fn arg_type(self, index: usize) -> ArgType {
        let args = self.info().args;
        match args.get(index).or(args.last()) {
            Some(ty) => *ty,
            None => Any,
        }
    }

    /// Named operation taking its arguments in call syntax
    pub fn is_function(self) -> bool {
        matches!(
            self,
            Op::Not
                | Op::Loc
                | Op::Obj
                | Op::ArrItem
                | Op::Min
                | Op::Max
                | Op::Rand
                | Op::Iif
                | Op::Rgb
                | Op::Len
                | Op::IsNum
                | Op::LCase
                | Op::UCase
                | Op::Input
                | Op::Str
                | Op::Val
                | Op::ArrSize
                | Op::IsPlay
                | Op::Desc
                | Op::Trim
                | Op::GetObj
                | Op::Mid
                | Op::ArrPos
                | Op::ArrComp
                | Op::Instr
                | Op::Replace
                | Op::StrComp
                | Op::StrFind
                | Op::StrPos
                | Op::Func(_)
                | Op::DynEval(_)
                | Op::Rnd
                | Op::CountObj
                | Op::MsecsCount
                | Op::QspVer
                | Op::UserText
                | Op::CurLoc
                | Op::SelObj
                | Op::SelAct
                | Op::MainText
                | Op::StatText
                | Op::CurActs
                | Op::CurObjs
        )
    }

    /// Unary operators spelled as words
    pub fn is_word_operator(self) -> bool {
        matches!(self, Op::Not | Op::Loc | Op::Obj)
    }

    /// Calls that may run scripts or ask the host, after which the
    /// refresh counter has to be checked
    pub fn may_refresh(self) -> bool {
        matches!(self, Op::Func(_) | Op::DynEval(_) | Op::Input | Op::Desc)
    }
}

/// Entry of the function name table
#[derive(Debug, Clone)]
pub struct FunctionName {
    pub name: String,
    pub op: Op,
    /// Result conversion requested by a `$`/`%` prefix on an untyped function
    pub cast: Option<ValueType>,
}

const BASE_FUNCTIONS: &[(&str, Op)] = &[
    ("ARRCOMP", Op::ArrComp),
    ("ARRITEM", Op::ArrItem),
    ("ARRPOS", Op::ArrPos),
    ("ARRSIZE", Op::ArrSize),
    ("COUNTOBJ", Op::CountObj),
    ("CURACTS", Op::CurActs),
    ("CURLOC", Op::CurLoc),
    ("CUROBJS", Op::CurObjs),
    ("DESC", Op::Desc),
    ("DYNEVAL", Op::DynEval(None)),
    ("FUNC", Op::Func(None)),
    ("GETOBJ", Op::GetObj),
    ("IIF", Op::Iif),
    ("INPUT", Op::Input),
    ("INSTR", Op::Instr),
    ("ISNUM", Op::IsNum),
    ("ISPLAY", Op::IsPlay),
    ("LCASE", Op::LCase),
    ("LEN", Op::Len),
    ("LOC", Op::Loc),
    ("MAINTXT", Op::MainText),
    ("MAX", Op::Max),
    ("MID", Op::Mid),
    ("MIN", Op::Min),
    ("MSECSCOUNT", Op::MsecsCount),
    ("NO", Op::Not),
    ("OBJ", Op::Obj),
    ("QSPVER", Op::QspVer),
    ("RAND", Op::Rand),
    ("REPLACE", Op::Replace),
    ("RGB", Op::Rgb),
    ("RND", Op::Rnd),
    ("SELACT", Op::SelAct),
    ("SELOBJ", Op::SelObj),
    ("STATTXT", Op::StatText),
    ("STR", Op::Str),
    ("STRCOMP", Op::StrComp),
    ("STRFIND", Op::StrFind),
    ("STRPOS", Op::StrPos),
    ("TRIM", Op::Trim),
    ("UCASE", Op::UCase),
    ("USER_TEXT", Op::UserText),
    ("USRTXT", Op::UserText),
    ("VAL", Op::Val),
];

/// Functions plus their sigil-prefixed aliases, sorted by name
static FUNCTION_NAMES: LazyLock<Vec<FunctionName>> = LazyLock::new(|| {
    let mut names = Vec::new();
    for &(name, op) in BASE_FUNCTIONS {
        names.push(FunctionName {
            name: name.to_string(),
            op,
            cast: None,
        });
        // word operators never take a sigil
        if op.is_word_operator() {
            continue;
        }
        match op.info().result {
            Some(ValueType::String) => names.push(FunctionName {
                name: format!("${name}"),
                op,
                cast: None,
            }),
            Some(_) => {}
            None => {
                for ty in [ValueType::String, ValueType::Tuple] {
                    let prefix = if ty == ValueType::String { '$' } else { '%' };
                    let (op, cast) = match op {
                        Op::Func(_) => (Op::Func(Some(ty)), None),
                        Op::DynEval(_) => (Op::DynEval(Some(ty)), None),
                        other => (other, Some(ty)),
                    };
                    names.push(FunctionName {
                        name: format!("{prefix}{name}"),
                        op,
                        cast,
                    });
                }
            }
        }
    }
    names.sort_by(|a, b| a.name.cmp(&b.name));
    names
});

/// Look a function up by name, ignoring case
pub fn lookup_function(name: &str) -> Option<&'static FunctionName> {
    let upper = name.to_uppercase();
    let names = &*FUNCTION_NAMES;
    names
        .binary_search_by(|entry| entry.name.as_str().cmp(upper.as_str()))
        .ok()
        .map(|i| &names[i])
}

/// Binary operators spelled as words
pub fn lookup_word_operator(name: &str) -> Option<Op> {
    match name.to_uppercase().as_str() {
        "AND" => Some(Op::And),
        "OR" => Some(Op::Or),
        "MOD" => Some(Op::Mod),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_table_sorted_and_unique() {
        let names = &*FUNCTION_NAMES;
        assert!(names.windows(2).all(|w| w[0].name < w[1].name));
    }

    #[test]
    fn test_lookup_function() {
        assert_eq!(lookup_function("len").map(|f| f.op), Some(Op::Len));
        assert_eq!(lookup_function("$Mid").map(|f| f.op), Some(Op::Mid));
        assert!(lookup_function("%mid").is_none());
        assert!(lookup_function("$len").is_none());
        let func = lookup_function("$func").unwrap();
        assert_eq!(func.op, Op::Func(Some(ValueType::String)));
        assert_eq!(func.cast, None);
        let max = lookup_function("%MAX").unwrap();
        assert_eq!((max.op, max.cast), (Op::Max, Some(ValueType::Tuple)));
        assert!(lookup_function("$no").is_none());
        assert!(lookup_function("hero").is_none());
        assert_eq!(lookup_function("$strfind").map(|f| f.op), Some(Op::StrFind));
        assert!(lookup_function("$strpos").is_none());
    }

    #[test]
    fn test_priorities() {
        assert!(Op::Mul.priority() > Op::Add.priority());
        assert!(Op::Add.priority() > Op::Append.priority());
        assert!(Op::Eq.priority() > Op::Not.priority());
        assert!(Op::And.priority() > Op::Or.priority());
        assert_eq!(Op::Neg.priority(), 18);
        assert_eq!(Op::Tuple.priority(), BARRIER);
    }

    #[test]
    fn test_arg_types_repeat_last() {
        assert_eq!(Op::Mid.arg_type(0), ArgType::String);
        assert_eq!(Op::Mid.arg_type(2), ArgType::Number);
        assert_eq!(Op::Func(None).arg_type(5), ArgType::Any);
        assert_eq!(Op::DynEval(None).arg_type(0), ArgType::Code);
    }
}
