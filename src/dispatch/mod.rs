//! # Dispatch
//!
//! Handler invocation for both front ends. [`CommandManager`] owns the compiled artifacts and
//! the client's collaborators; handlers receive a [`CommandCall`] carrying the resolved
//! arguments.
//!
//! Work a handler hands off with [`CommandCall::defer`] keeps a failure continuation: an error
//! from deferred work is logged and answered exactly like an error returned by the handler.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::error;

use crate::declare::RegisteredCommand;
use crate::messages::format_handler_failure;
use crate::model::{Arguments, InvocationContext, Value};

pub mod manager;

pub use manager::{CommandManager, CommandManagerBuilder, DispatchOutcome};

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(&self, call: CommandCall) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Usage(String),
    Error(String),
    Text(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Usage(text) | Reply::Error(text) | Reply::Text(text) => text,
        }
    }
}

/// Sends replies back to wherever the invocation came from.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn send(&self, ctx: &InvocationContext, reply: Reply);
}

// ============================================================================
// CLOSURE HANDLERS
// ============================================================================

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(CommandCall) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn call(&self, call: CommandCall) -> anyhow::Result<()> {
        (self.0)(call).await
    }
}

/// Adapts an async closure into a shareable handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(CommandCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

// ============================================================================
// INVOCATION
// ============================================================================

#[derive(Clone)]
pub(crate) struct FailureReporter {
    responder: Arc<dyn Responder>,
}

impl FailureReporter {
    pub(crate) fn new(responder: Arc<dyn Responder>) -> Self {
        Self { responder }
    }

    pub(crate) async fn report(&self, ctx: &InvocationContext, command: &str, err: &anyhow::Error) {
        error!(command, error = ?err, "command handler failed");
        self.responder
            .send(ctx, Reply::Error(format_handler_failure(command)))
            .await;
    }
}

/// One resolved invocation, handed to the handler.
#[derive(Clone)]
pub struct CommandCall {
    pub ctx: InvocationContext,
    pub args: Arguments,
    pub command: Arc<RegisteredCommand>,
    reporter: FailureReporter,
}

impl CommandCall {
    pub(crate) fn new(
        ctx: InvocationContext,
        args: Arguments,
        command: Arc<RegisteredCommand>,
        reporter: FailureReporter,
    ) -> Self {
        Self {
            ctx,
            args,
            command,
            reporter,
        }
    }

    /// The argument value, `None` when missing or absent.
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.present(name)
    }

    pub async fn reply(&self, text: impl Into<String>) {
        self.reporter
            .responder
            .send(&self.ctx, Reply::Text(text.into()))
            .await;
    }

    /// Runs `work` on its own task; an error is reported like a handler failure.
    pub fn defer<F>(&self, work: F) -> JoinHandle<()>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let reporter = self.reporter.clone();
        let ctx = self.ctx.clone();
        let command = self.command.qualified_name();
        tokio::spawn(async move {
            if let Err(err) = work.await {
                reporter.report(&ctx, &command, &err).await;
            }
        })
    }
}

impl std::fmt::Debug for CommandCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandCall")
            .field("command", &self.command.qualified_name())
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
