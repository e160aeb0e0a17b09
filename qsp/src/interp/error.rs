//! Runtime errors for the interpreter

use std::fmt;

/// Runtime error during interpretation
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of runtime errors
///
/// Numeric codes follow the host API numbering, starting at 100.
#[derive(Debug, Clone, serde::Serialize)]
pub enum ErrorKind {
    /// Division or modulo by zero
    DivByZero,
    /// Value cannot be converted to the required type
    TypeMismatch,
    /// Expression nesting or call depth exceeded
    StackOverflow,
    /// Too many items in one compiled expression or one array
    TooManyItems,
    /// World source could not be loaded
    CantLoadFile,
    /// No world is loaded
    GameNotLoaded,
    /// Block statement without `:`
    ColonNotFound,
    /// Action list is full
    CantAddAction,
    /// Assignment without `=`
    EqNotFound,
    /// Unknown location
    LocNotFound,
    /// Block without matching `END`
    EndNotFound,
    /// `JUMP` target is not in scope
    LabelNotFound,
    /// Malformed variable name
    IncorrectName,
    /// Unterminated string or code literal
    QuotNotFound,
    /// Unbalanced bracket
    BrackNotFound,
    /// Function needs brackets around its arguments
    BracksNotFound,
    /// Malformed statement or expression
    Syntax,
    /// Unknown operator
    UnknownAction,
    /// Wrong number of arguments
    ArgsCount,
    /// Object list is full
    CantAddObject,
    /// Menu item rejected
    CantAddMenuItem,
    /// Variable table is full
    TooManyVars,
    /// Pattern of a regular expression function does not compile
    IncorrectRegExp,
    /// Inline block with an empty branch
    CodeNotFound,
    /// `LOOP` without `WHILE`
    LoopWhileNotFound,
    /// Control flow: the world was refreshed under the running code
    Aborted,
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl Eq for ErrorKind {}

impl ErrorKind {
    /// Numeric error code reported to hosts (0 for control flow)
    pub fn code(&self) -> i32 {
        match self {
            ErrorKind::DivByZero => 100,
            ErrorKind::TypeMismatch => 101,
            ErrorKind::StackOverflow => 102,
            ErrorKind::TooManyItems => 103,
            ErrorKind::CantLoadFile => 104,
            ErrorKind::GameNotLoaded => 105,
            ErrorKind::ColonNotFound => 106,
            ErrorKind::CantAddAction => 108,
            ErrorKind::EqNotFound => 109,
            ErrorKind::LocNotFound => 110,
            ErrorKind::EndNotFound => 111,
            ErrorKind::LabelNotFound => 112,
            ErrorKind::IncorrectName => 113,
            ErrorKind::QuotNotFound => 114,
            ErrorKind::BrackNotFound => 115,
            ErrorKind::BracksNotFound => 116,
            ErrorKind::Syntax => 117,
            ErrorKind::UnknownAction => 118,
            ErrorKind::ArgsCount => 119,
            ErrorKind::CantAddObject => 120,
            ErrorKind::CantAddMenuItem => 121,
            ErrorKind::TooManyVars => 122,
            ErrorKind::IncorrectRegExp => 123,
            ErrorKind::CodeNotFound => 124,
            ErrorKind::LoopWhileNotFound => 125,
            ErrorKind::Aborted => 0,
        }
    }

    /// Default human readable description
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::DivByZero => "division by zero",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::StackOverflow => "stack overflow",
            ErrorKind::TooManyItems => "too many items",
            ErrorKind::CantLoadFile => "can't load file",
            ErrorKind::GameNotLoaded => "game not loaded",
            ErrorKind::ColonNotFound => "sign [:] not found",
            ErrorKind::CantAddAction => "can't add action",
            ErrorKind::EqNotFound => "sign [=] not found",
            ErrorKind::LocNotFound => "location not found",
            ErrorKind::EndNotFound => "[end] not found",
            ErrorKind::LabelNotFound => "label not found",
            ErrorKind::IncorrectName => "incorrect variable name",
            ErrorKind::QuotNotFound => "quote not found",
            ErrorKind::BrackNotFound => "bracket not found",
            ErrorKind::BracksNotFound => "brackets not found",
            ErrorKind::Syntax => "syntax error",
            ErrorKind::UnknownAction => "unknown action",
            ErrorKind::ArgsCount => "incorrect arguments count",
            ErrorKind::CantAddObject => "can't add object",
            ErrorKind::CantAddMenuItem => "can't add menu item",
            ErrorKind::TooManyVars => "too many variables",
            ErrorKind::IncorrectRegExp => "incorrect regular expression",
            ErrorKind::CodeNotFound => "code not found",
            ErrorKind::LoopWhileNotFound => "[while] not found",
            ErrorKind::Aborted => "execution aborted by a location change",
        }
    }

    /// True for kinds that only steer control flow
    pub fn is_control_flow(&self) -> bool {
        matches!(self, ErrorKind::Aborted)
    }
}

impl RuntimeError {
    /// Error of the given kind with its default description
    pub fn new(kind: ErrorKind) -> Self {
        RuntimeError {
            message: kind.description().to_string(),
            kind,
        }
    }

    /// Error of the given kind with extra detail appended
    pub fn with_detail(kind: ErrorKind, detail: impl fmt::Display) -> Self {
        RuntimeError {
            message: format!("{}: {detail}", kind.description()),
            kind,
        }
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivByZero)
    }

    pub fn type_mismatch(expected: &str, got: &str) -> Self {
        Self::with_detail(ErrorKind::TypeMismatch, format!("expected {expected}, got {got}"))
    }

    pub fn stack_overflow() -> Self {
        Self::new(ErrorKind::StackOverflow)
    }

    pub fn location_not_found(name: &str, hint: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::LocNotFound,
            message: format!("location not found: {name}{hint}"),
        }
    }

    pub fn label_not_found(label: &str) -> Self {
        Self::with_detail(ErrorKind::LabelNotFound, label)
    }

    pub fn incorrect_name(name: &str) -> Self {
        Self::with_detail(ErrorKind::IncorrectName, format!("{name:?}"))
    }

    pub fn args_count(name: &str) -> Self {
        Self::with_detail(ErrorKind::ArgsCount, name)
    }

    pub fn syntax() -> Self {
        Self::new(ErrorKind::Syntax)
    }

    /// Control-flow marker raised after the current location was replaced
    pub fn aborted() -> Self {
        Self::new(ErrorKind::Aborted)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime error {}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorKind::DivByZero.code(), 100);
        assert_eq!(ErrorKind::LocNotFound.code(), 110);
        assert_eq!(ErrorKind::LabelNotFound.code(), 112);
        assert_eq!(ErrorKind::IncorrectRegExp.code(), 123);
        assert_eq!(ErrorKind::LoopWhileNotFound.code(), 125);
    }

    #[test]
    fn test_error_kind_equality_ignores_payload() {
        assert_eq!(ErrorKind::Syntax, ErrorKind::Syntax);
        assert_ne!(ErrorKind::Syntax, ErrorKind::ArgsCount);
    }

    #[test]
    fn test_error_display() {
        let err = RuntimeError::division_by_zero();
        assert_eq!(err.to_string(), "Runtime error 100: division by zero");
        let err = RuntimeError::location_not_found("HALL", "");
        assert_eq!(err.kind, ErrorKind::LocNotFound);
        assert!(err.message.contains("HALL"));
    }

    #[test]
    fn test_control_flow_kind() {
        assert!(RuntimeError::aborted().kind.is_control_flow());
        assert!(!RuntimeError::syntax().kind.is_control_flow());
    }
}
