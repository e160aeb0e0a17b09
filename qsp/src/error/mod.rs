//! Error types and reporting

use crate::interp::error::{ErrorKind, RuntimeError};
use crate::span::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CompileError>;

/// Error found before any code runs
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    #[error("Lexer error at {span}: {message}")]
    Lexer {
        kind: ErrorKind,
        message: String,
        span: Span,
    },

    #[error("Expression error at {span}: {message}")]
    Expression {
        kind: ErrorKind,
        message: String,
        span: Span,
    },

    /// Malformed world source
    #[error("World error at line {line}: {message}")]
    World { message: String, line: usize },
}

impl CompileError {
    pub fn lexer(kind: ErrorKind, span: Span) -> Self {
        Self::Lexer {
            message: kind.description().to_string(),
            kind,
            span,
        }
    }

    pub fn expression(kind: ErrorKind, span: Span) -> Self {
        Self::Expression {
            message: kind.description().to_string(),
            kind,
            span,
        }
    }

    /// Expression error with extra detail after the kind description
    pub fn expression_detail(kind: ErrorKind, detail: impl std::fmt::Display, span: Span) -> Self {
        Self::Expression {
            message: format!("{}: {detail}", kind.description()),
            kind,
            span,
        }
    }

    pub fn world(message: impl Into<String>, line: usize) -> Self {
        Self::World {
            message: message.into(),
            line,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Lexer { kind, .. } | Self::Expression { kind, .. } => kind.clone(),
            Self::World { .. } => ErrorKind::CantLoadFile,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexer { span, .. } | Self::Expression { span, .. } => Some(*span),
            Self::World { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Lexer { message, .. } => message,
            Self::Expression { message, .. } => message,
            Self::World { message, .. } => message,
        }
    }
}

impl From<CompileError> for RuntimeError {
    fn from(err: CompileError) -> Self {
        RuntimeError {
            kind: err.kind(),
            message: err.message().to_string(),
        }
    }
}

/// Where the first error of a run happened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Host API error code
    pub code: i32,
    pub location_name: Option<String>,
    /// Index of the running action, if the error came from one
    pub action_index: Option<usize>,
    /// 1-based source line inside the location, 0 when unknown
    pub source_line: usize,
    pub message: String,
}

impl ErrorInfo {
    pub fn is_in_action_handler(&self) -> bool {
        self.action_index.is_some()
    }
}

/// Error returned by the engine entry points
#[derive(Debug, Clone, Error)]
#[error("{error}{}", describe_site(.info))]
pub struct EngineError {
    pub error: RuntimeError,
    pub info: ErrorInfo,
}

impl EngineError {
    pub fn kind(&self) -> &ErrorKind {
        &self.error.kind
    }

    pub fn code(&self) -> i32 {
        self.info.code
    }
}

fn describe_site(info: &ErrorInfo) -> String {
    let mut out = String::new();
    if let Some(loc) = &info.location_name {
        out.push_str(&format!(" in location '{loc}'"));
    }
    if let Some(action) = info.action_index {
        out.push_str(&format!(", action {action}"));
    }
    if info.source_line > 0 {
        out.push_str(&format!(", line {}", info.source_line));
    }
    out
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &CompileError) -> std::io::Result<()> {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let kind = match error {
        CompileError::Lexer { .. } => "Lexer",
        CompileError::Expression { .. } => "Expression",
        CompileError::World { .. } => "World",
    };

    if let Some(span) = error.span() {
        let end = span.end.min(source.len());
        let start = span.start.min(end);
        Report::build(ReportKind::Error, (filename, start..end))
            .with_code(error.kind().code())
            .with_message(format!("{kind} error"))
            .with_label(
                Label::new((filename, start..end))
                    .with_message(error.message())
                    .with_color(Color::Red),
            )
            .finish()
            .eprint((filename, Source::from(source)))
    } else {
        Report::build(ReportKind::Error, (filename, 0..0))
            .with_code(error.kind().code())
            .with_message(format!("{kind} error: {}", error.message()))
            .finish()
            .eprint((filename, Source::from(source)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_into_runtime() {
        let err = CompileError::expression(ErrorKind::BrackNotFound, Span::new(3, 4));
        assert_eq!(err.span(), Some(Span::new(3, 4)));
        let runtime: RuntimeError = err.into();
        assert_eq!(runtime.kind, ErrorKind::BrackNotFound);
        assert_eq!(runtime.kind.code(), 115);
    }

    #[test]
    fn test_world_error_kind() {
        let err = CompileError::world("location 'a' is not closed", 3);
        assert_eq!(err.kind(), ErrorKind::CantLoadFile);
        assert_eq!(err.span(), None);
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError {
            error: RuntimeError::division_by_zero(),
            info: ErrorInfo {
                code: 100,
                location_name: Some("START".into()),
                action_index: None,
                source_line: 2,
                message: "division by zero".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Runtime error 100: division by zero in location 'START', line 2"
        );
        assert!(!err.info.is_in_action_handler());
    }
}
