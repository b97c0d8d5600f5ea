//! # Argot
//!
//! A command schema compiler and typed argument resolver for chat-bot frameworks. Commands are
//! declared once and served from two front ends: prefix text messages and structured slash
//! invocations.
//!
//! ## Module Structure
//!
//! - [`declare`]: command and parameter declarations, signatures and YAML manifests
//! - [`schema`]: node trees, platform limits and the schema compiler
//! - [`resolve`]: the resolver registry and the argument resolution pipeline
//! - [`router`]: prefix stripping and text routing
//! - [`dispatch`]: the command manager and handler invocation
//! - [`registrar`]: change-detecting schema registration

pub use crate::diagnostics::{
    to_error_source, ArgumentErrorKind, CommandError, ErrorContext, ErrorType, Span, Violation,
};

pub mod cli;
pub mod config;
pub mod declare;
pub mod diagnostics;
pub mod dispatch;
pub mod logging;
pub mod messages;
pub mod model;
pub mod registrar;
pub mod resolve;
pub mod router;
pub mod schema;

pub use crate::config::FrameworkConfig;
pub use crate::declare::{CommandBuilder, CommandGroup, ParameterBuilder, RegisteredCommand, TypeTag};
pub use crate::dispatch::{
    handler_fn, CommandCall, CommandHandler, CommandManager, DispatchOutcome, Reply, Responder,
};
pub use crate::model::{Arguments, InvocationContext, Value};
pub use crate::registrar::{PlatformClient, RegistrationOutcome, SchemaRegistrar};
