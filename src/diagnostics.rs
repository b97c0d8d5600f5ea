//!
//! # Argot Diagnostics
//!
//! This module defines the unified, `miette`-based diagnostic system for argot. Every failure
//! produced by the schema compiler, the resolution pipeline, the registrar or the configuration
//! loader is a [`CommandError`]. Argument failures keep the raw command text and the span of the
//! offending token, so a rendered report points at exactly what the user typed.
//!
//! # Construction
//!
//! - **Use `err_msg!` for message-only errors** (`Internal`, `Config`).
//!   - `err_msg!(Internal, "resolver for '{}' vanished", name)`
//!
//! - **Use [`CommandError::invalid_argument`] for resolver failures.** Resolvers normally go
//!   through `ResolutionContext::fail`, which also attaches the source and span.
//!
//! - **Use [`CommandError::violation`] for compile-time schema failures.**
//!
//! "Show usage" is not an error and never appears here; see `resolve::Resolution`.

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Type aliases for clarity and brevity
pub type SourceArc = Arc<NamedSource<String>>;
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Byte range inside the raw command text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest span covering both `self` and `other`.
    pub fn join(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Type-safe error classification, used by callers that branch on the failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    InvalidArgument,
    PermissionDenied,
    Schema,
    Registration,
    Config,
    Internal,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::InvalidArgument => "InvalidArgument",
            ErrorType::PermissionDenied => "PermissionDenied",
            ErrorType::Schema => "SchemaConstraintViolation",
            ErrorType::Registration => "RegistrationFailure",
            ErrorType::Config => "Config",
            ErrorType::Internal => "Internal",
        }
    }

    /// Recoverable failures are reported back to the invoking user.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, ErrorType::InvalidArgument | ErrorType::PermissionDenied)
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The raw command text (if any).
    pub source: Option<SourceArc>,
    /// The offending span inside `source`.
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
}

impl ErrorContext {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            help: None,
        }
    }

    pub fn with_help(help: impl Into<String>) -> Self {
        Self {
            source: None,
            span: None,
            help: Some(help.into()),
        }
    }
}

// ============================================================================
// ARGUMENT FAILURES
// ============================================================================

/// Why a single argument failed to resolve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentErrorKind {
    #[error("'{input}' is not a valid number")]
    NotANumber { input: String },
    #[error("{input} is below the minimum of {min}")]
    BelowMinimum { input: String, min: String },
    #[error("{input} is above the maximum of {max}")]
    AboveMaximum { input: String, max: String },
    #[error("must be at least {min} characters long (got {actual})")]
    TooShort { min: usize, actual: usize },
    #[error("must be at most {max} characters long (got {actual})")]
    TooLong { max: usize, actual: usize },
    #[error("no {entity} matching '{input}' was found")]
    NotFound { entity: &'static str, input: String },
    #[error("'{input}' matches {} {entity}s: {}", .candidates.len(), .candidates.join(", "))]
    AmbiguousMatch {
        entity: &'static str,
        input: String,
        candidates: Vec<String>,
    },
    #[error("'{input}' is not valid; must be one of: {}", .options.join(", "))]
    MustSpecifyOne { input: String, options: Vec<String> },
    #[error("{entity} arguments can only be used inside a server")]
    NotInScope { entity: &'static str },
    #[error("{message}")]
    ConditionFailed { condition: String, message: String },
}

impl ArgumentErrorKind {
    /// Stable suffix used in diagnostic codes and message lookups.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotANumber { .. } => "not_a_number",
            Self::BelowMinimum { .. } => "below_minimum",
            Self::AboveMaximum { .. } => "above_maximum",
            Self::TooShort { .. } => "too_short",
            Self::TooLong { .. } => "too_long",
            Self::NotFound { .. } => "not_found",
            Self::AmbiguousMatch { .. } => "ambiguous_match",
            Self::MustSpecifyOne { .. } => "must_specify_one",
            Self::NotInScope { .. } => "not_in_scope",
            Self::ConditionFailed { .. } => "condition_failed",
        }
    }

    fn default_help(&self) -> Option<&'static str> {
        match self {
            Self::AmbiguousMatch { .. } => Some("Mention the target directly or use its ID."),
            Self::NotFound { .. } => Some("Check the spelling, or mention the target directly."),
            Self::NotANumber { .. } => Some("Use digits only, e.g. 42 or 3.5."),
            _ => None,
        }
    }
}

// ============================================================================
// SCHEMA FAILURES
// ============================================================================

/// Structural rule broken while compiling a command tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("name '{name}' must be 1-32 characters (got {length})")]
    NameLength { name: String, length: usize },
    #[error("description of '{name}' must be 1-100 characters (got {length})")]
    DescriptionLength { name: String, length: usize },
    #[error("'{name}' is declared more than once under the same parent")]
    DuplicateSibling { name: String },
    #[error("required parameter '{parameter}' follows an optional parameter")]
    RequiredAfterOptional { parameter: String },
    #[error("subcommand group '{group}' has no subcommands")]
    EmptyGroup { group: String },
    #[error("variadic parameter '{parameter}' must be the last parameter")]
    VariadicNotTrailing { parameter: String },
    #[error("path '{path}' is deeper than root > group > subcommand")]
    PathTooDeep { path: String },
    #[error("'{name}' has {count} children; at most {max} are allowed")]
    TooManyChildren { name: String, count: usize, max: usize },
    #[error("parameter '{parameter}' declares {count} choices; at most {max} are allowed")]
    TooManyChoices {
        parameter: String,
        count: usize,
        max: usize,
    },
    #[error("parameter '{parameter}' has type '{type_name}' with no registered resolver")]
    UnknownType { parameter: String, type_name: String },
    #[error("parameter '{parameter}' references unknown condition '{condition}'")]
    UnknownCondition { parameter: String, condition: String },
    #[error("invalid declaration: {message}")]
    InvalidDeclaration { message: String },
}

impl Violation {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NameLength { .. } => "name_length",
            Self::DescriptionLength { .. } => "description_length",
            Self::DuplicateSibling { .. } => "duplicate_sibling",
            Self::RequiredAfterOptional { .. } => "required_after_optional",
            Self::EmptyGroup { .. } => "empty_group",
            Self::VariadicNotTrailing { .. } => "variadic_not_trailing",
            Self::PathTooDeep { .. } => "path_too_deep",
            Self::TooManyChildren { .. } => "too_many_children",
            Self::TooManyChoices { .. } => "too_many_choices",
            Self::UnknownType { .. } => "unknown_type",
            Self::UnknownCondition { .. } => "unknown_condition",
            Self::InvalidDeclaration { .. } => "invalid_declaration",
        }
    }
}

// ============================================================================
// UNIFIED ERROR
// ============================================================================

/// Unified error type for every argot failure mode.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Invalid argument '{parameter}': {kind}")]
    InvalidArgument {
        parameter: String,
        kind: ArgumentErrorKind,
        ctx: ErrorContext,
    },
    #[error("Permission denied: {target}")]
    PermissionDenied { target: String, ctx: ErrorContext },
    #[error("Schema constraint violated in '{command}': {violation}")]
    SchemaConstraintViolation {
        command: String,
        violation: Violation,
        ctx: ErrorContext,
    },
    #[error("Registration of '{command}' failed: {message}")]
    RegistrationFailure {
        command: String,
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedSource>,
    },
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedSource>,
    },
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl CommandError {
    pub fn invalid_argument(parameter: impl Into<String>, kind: ArgumentErrorKind) -> Self {
        let ctx = match kind.default_help() {
            Some(help) => ErrorContext::with_help(help),
            None => ErrorContext::none(),
        };
        CommandError::InvalidArgument {
            parameter: parameter.into(),
            kind,
            ctx,
        }
    }

    pub fn permission_denied(target: impl Into<String>) -> Self {
        CommandError::PermissionDenied {
            target: target.into(),
            ctx: ErrorContext::none(),
        }
    }

    pub fn violation(command: impl Into<String>, violation: Violation) -> Self {
        CommandError::SchemaConstraintViolation {
            command: command.into(),
            violation,
            ctx: ErrorContext::none(),
        }
    }

    pub fn registration(
        command: impl Into<String>,
        message: impl Into<String>,
        source: Option<BoxedSource>,
    ) -> Self {
        CommandError::RegistrationFailure {
            command: command.into(),
            message: message.into(),
            ctx: ErrorContext::none(),
            source,
        }
    }

    /// Attaches the raw input and the offending span, keeping any help already present.
    pub fn located(mut self, source: &SourceArc, span: Span) -> Self {
        let ctx = self.get_ctx_mut();
        if ctx.source.is_none() {
            ctx.source = Some(Arc::clone(source));
            ctx.span = Some(span);
        }
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.get_ctx_mut().help = Some(help.into());
        self
    }

    fn get_ctx(&self) -> &ErrorContext {
        match self {
            CommandError::InvalidArgument { ctx, .. } => ctx,
            CommandError::PermissionDenied { ctx, .. } => ctx,
            CommandError::SchemaConstraintViolation { ctx, .. } => ctx,
            CommandError::RegistrationFailure { ctx, .. } => ctx,
            CommandError::Config { ctx, .. } => ctx,
            CommandError::Internal { ctx, .. } => ctx,
        }
    }

    fn get_ctx_mut(&mut self) -> &mut ErrorContext {
        match self {
            CommandError::InvalidArgument { ctx, .. } => ctx,
            CommandError::PermissionDenied { ctx, .. } => ctx,
            CommandError::SchemaConstraintViolation { ctx, .. } => ctx,
            CommandError::RegistrationFailure { ctx, .. } => ctx,
            CommandError::Config { ctx, .. } => ctx,
            CommandError::Internal { ctx, .. } => ctx,
        }
    }

    pub fn error_type(&self) -> ErrorType {
        match self {
            CommandError::InvalidArgument { .. } => ErrorType::InvalidArgument,
            CommandError::PermissionDenied { .. } => ErrorType::PermissionDenied,
            CommandError::SchemaConstraintViolation { .. } => ErrorType::Schema,
            CommandError::RegistrationFailure { .. } => ErrorType::Registration,
            CommandError::Config { .. } => ErrorType::Config,
            CommandError::Internal { .. } => ErrorType::Internal,
        }
    }

    pub fn argument_kind(&self) -> Option<&ArgumentErrorKind> {
        match self {
            CommandError::InvalidArgument { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn schema_violation(&self) -> Option<&Violation> {
        match self {
            CommandError::SchemaConstraintViolation { violation, .. } => Some(violation),
            _ => None,
        }
    }

    pub fn span(&self) -> Option<Span> {
        self.get_ctx().span
    }

    fn label_text(&self) -> String {
        match self {
            CommandError::InvalidArgument { kind, .. } => kind.to_string(),
            CommandError::PermissionDenied { .. } => "not permitted".to_string(),
            CommandError::SchemaConstraintViolation { violation, .. } => violation.to_string(),
            CommandError::RegistrationFailure { message, .. }
            | CommandError::Config { message, .. }
            | CommandError::Internal { message, .. } => message.clone(),
        }
    }
}

impl Diagnostic for CommandError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self {
            CommandError::InvalidArgument { kind, .. } => format!("argot::argument::{}", kind.code()),
            CommandError::PermissionDenied { .. } => "argot::permission_denied".to_string(),
            CommandError::SchemaConstraintViolation { violation, .. } => {
                format!("argot::schema::{}", violation.code())
            }
            CommandError::RegistrationFailure { .. } => "argot::registration".to_string(),
            CommandError::Config { .. } => "argot::config".to_string(),
            CommandError::Internal { .. } => "argot::internal".to_string(),
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.get_ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.get_ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.get_ctx().span?;
        let len = if span.end > span.start { span.len() } else { 1 };
        let label = LabeledSpan::new(Some(self.label_text()), span.start, len);
        Some(Box::new(std::iter::once(label)))
    }
}

/// Wraps raw command text as a named source for error contexts.
pub fn to_error_source<S: AsRef<str>>(source: S) -> SourceArc {
    Arc::new(NamedSource::new("command", source.as_ref().to_string()))
}

/// Constructs a message-only `CommandError` variant (`Internal` or `Config`).
#[macro_export]
macro_rules! err_msg {
    ($variant:ident, $msg:expr, $($arg:expr),+ $(,)?) => {
        $crate::CommandError::$variant {
            message: format!($msg, $($arg),+),
            ctx: $crate::ErrorContext::default(),
            source: None,
        }
    };
    ($variant:ident, $msg:expr) => {
        $crate::CommandError::$variant {
            message: format!("{}", $msg),
            ctx: $crate::ErrorContext::default(),
            source: None,
        }
    };
}
