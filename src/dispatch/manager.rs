//! The command manager: build once, then dispatch from any number of tasks.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::FrameworkConfig;
use crate::declare::manifest::Manifest;
use crate::declare::{CommandBuilder, CommandGroup, RegisteredCommand, TypeTag};
use crate::diagnostics::CommandError;
use crate::dispatch::{CommandCall, CommandHandler, FailureReporter, Reply, Responder};
use crate::messages::{format_error, format_usage, render_usage};
use crate::model::{EntitySource, InvocationContext, PermissionResolver};
use crate::registrar::{PlatformClient, RegistrationOutcome, SchemaRegistrar};
use crate::resolve::conditions::build_default_conditions;
use crate::resolve::{
    build_default_registry, resolve, ArgumentInput, ConditionFn, ConditionRegistry, Resolution,
    ResolveEnv, ResolveFn, ResolverEntry, ResolverKind, ResolverRegistry, TypedOption,
};
use crate::router::{Route, TextRouter};
use crate::schema::{CommandTree, CompiledCommands, RootFailure, RoutingTable, SchemaCompiler};

#[derive(Debug)]
pub enum DispatchOutcome {
    /// No prefix, or an ignored author.
    NotACommand,
    Unknown,
    ShowedUsage,
    Rejected(CommandError),
    Invoked,
    HandlerFailed,
}

// ============================================================================
// BUILDER
// ============================================================================

pub struct CommandManagerBuilder {
    config: FrameworkConfig,
    entities: Arc<dyn EntitySource>,
    permissions: Arc<dyn PermissionResolver>,
    responder: Arc<dyn Responder>,
    resolvers: ResolverRegistry,
    conditions: ConditionRegistry,
    groups: Vec<CommandGroup>,
    commands: Vec<CommandBuilder>,
}

impl CommandManagerBuilder {
    pub fn group(mut self, group: CommandGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn command(mut self, command: CommandBuilder) -> Self {
        self.commands.push(command);
        self
    }

    /// Adds a manifest's enumerations, groups and commands, all bound to `handler`.
    pub fn manifest(mut self, manifest: &Manifest, handler: Arc<dyn CommandHandler>) -> Self {
        manifest.register_enums(&mut self.resolvers);
        self.groups.extend(manifest.groups());
        self.commands.extend(manifest.command_builders(handler));
        self
    }

    pub fn resolver(mut self, type_tag: TypeTag, kind: ResolverKind, resolve: ResolveFn) -> Self {
        self.resolvers.register(type_tag, kind, resolve);
        self
    }

    pub fn resolver_entry(mut self, entry: ResolverEntry) -> Self {
        self.resolvers.register_entry(entry);
        self
    }

    pub fn enumeration(mut self, name: impl Into<String>, members: Vec<String>) -> Self {
        self.resolvers.register_enum(name, members);
        self
    }

    pub fn condition(mut self, name: impl Into<String>, condition: ConditionFn) -> Self {
        self.conditions.register(name, condition);
        self
    }

    /// Builds every declaration and compiles the schema. Roots whose declarations fail are
    /// skipped and reported through [`CommandManager::failures`].
    pub fn build(self) -> Result<CommandManager, CommandError> {
        self.config.validate()?;

        let mut failed: Vec<RootFailure> = Vec::new();
        let mut commands: Vec<Arc<RegisteredCommand>> = Vec::new();
        for builder in self.commands {
            let root = builder
                .path()
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_lowercase();
            match builder.build() {
                Ok(command) => commands.push(Arc::new(command)),
                Err(err) => {
                    error!(root = %root, error = %err, "command declaration rejected, skipping root");
                    failed.push(RootFailure { root, error: err });
                }
            }
        }
        commands.retain(|c| !failed.iter().any(|f| f.root == c.root()));

        let mut compiled =
            SchemaCompiler::new(&self.resolvers, &self.conditions).compile_all(&commands, &self.groups);
        compiled.failures.extend(failed);
        info!(
            roots = compiled.trees.len(),
            failures = compiled.failures.len(),
            "command schema compiled"
        );

        Ok(CommandManager {
            router: TextRouter::from_config(&self.config),
            config: self.config,
            resolvers: self.resolvers,
            conditions: self.conditions,
            compiled,
            entities: self.entities,
            permissions: self.permissions,
            responder: self.responder,
        })
    }
}

// ============================================================================
// MANAGER
// ============================================================================

pub struct CommandManager {
    config: FrameworkConfig,
    router: TextRouter,
    resolvers: ResolverRegistry,
    conditions: ConditionRegistry,
    compiled: CompiledCommands,
    entities: Arc<dyn EntitySource>,
    permissions: Arc<dyn PermissionResolver>,
    responder: Arc<dyn Responder>,
}

impl CommandManager {
    pub fn builder(
        config: FrameworkConfig,
        entities: Arc<dyn EntitySource>,
        permissions: Arc<dyn PermissionResolver>,
        responder: Arc<dyn Responder>,
    ) -> CommandManagerBuilder {
        CommandManagerBuilder {
            config,
            entities,
            permissions,
            responder,
            resolvers: build_default_registry(),
            conditions: build_default_conditions(),
            groups: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.compiled.routing
    }

    /// Node trees ready for the registrar.
    pub fn trees(&self) -> &[CommandTree] {
        &self.compiled.trees
    }

    pub fn failures(&self) -> &[RootFailure] {
        &self.compiled.failures
    }

    /// Builds a registrar from the configured snapshot directory and pushes every compiled root.
    pub async fn register_schemas(
        &self,
        client: Arc<dyn PlatformClient>,
    ) -> Result<(SchemaRegistrar, Vec<Result<RegistrationOutcome, CommandError>>), CommandError> {
        let registrar = SchemaRegistrar::from_config(client, &self.config)?;
        let results = registrar.register_all(self.compiled.trees.clone()).await;
        Ok((registrar, results))
    }

    pub fn resolvers(&self) -> &ResolverRegistry {
        &self.resolvers
    }

    pub fn usage(&self, command: &RegisteredCommand) -> String {
        let prefix = self.config.prefixes.first().map(String::as_str).unwrap_or("");
        render_usage(prefix, command, &self.resolvers)
    }

    pub async fn dispatch_text(&self, raw: &str, ctx: InvocationContext) -> DispatchOutcome {
        if self.config.ignore_bots && ctx.issuer.bot {
            return DispatchOutcome::NotACommand;
        }
        match self.router.route(raw, &self.compiled.routing, &self.resolvers) {
            Route::NotACommand => DispatchOutcome::NotACommand,
            Route::Unknown { alias } => {
                debug!(alias = %alias, "unknown command");
                DispatchOutcome::Unknown
            }
            Route::Matched(found) => self.run(found.command, found.remaining, ctx).await,
        }
    }

    /// `path` is the full command path, e.g. `"role add"`.
    pub async fn dispatch_structured(
        &self,
        path: &str,
        options: Vec<TypedOption>,
        ctx: InvocationContext,
    ) -> DispatchOutcome {
        let segments: Vec<&str> = path.split_whitespace().collect();
        let Some(command) = self.compiled.routing.find(&segments).cloned() else {
            debug!(path, "unknown structured command");
            return DispatchOutcome::Unknown;
        };
        self.run(command, ArgumentInput::Structured(options), ctx)
            .await
    }

    async fn run(
        &self,
        command: Arc<RegisteredCommand>,
        input: ArgumentInput,
        ctx: InvocationContext,
    ) -> DispatchOutcome {
        let name = command.qualified_name();

        let allowed = command
            .permissions()
            .iter()
            .all(|p| self.permissions.has_permission(&ctx, p));
        if !allowed {
            return self.reject(&ctx, CommandError::permission_denied(&name)).await;
        }

        let resolution = {
            let env = ResolveEnv {
                resolvers: &self.resolvers,
                conditions: &self.conditions,
                entities: self.entities.as_ref(),
                permissions: self.permissions.as_ref(),
            };
            resolve(&command, &ctx, input, &env)
        };

        match resolution {
            Ok(Resolution::ShowUsage) => {
                let usage = self.usage(&command);
                debug!(command = %name, "showing usage");
                self.responder
                    .send(&ctx, Reply::Usage(format_usage(&usage)))
                    .await;
                DispatchOutcome::ShowedUsage
            }
            Ok(Resolution::Resolved(args)) => {
                let reporter = FailureReporter::new(Arc::clone(&self.responder));
                let call = CommandCall::new(ctx.clone(), args, Arc::clone(&command), reporter.clone());
                match command.handler().call(call).await {
                    Ok(()) => {
                        debug!(command = %name, "command invoked");
                        DispatchOutcome::Invoked
                    }
                    Err(err) => {
                        reporter.report(&ctx, &name, &err).await;
                        DispatchOutcome::HandlerFailed
                    }
                }
            }
            Err(err) => self.reject(&ctx, err).await,
        }
    }

    async fn reject(&self, ctx: &InvocationContext, err: CommandError) -> DispatchOutcome {
        if err.error_type().is_user_facing() {
            debug!(error = %err, "invocation rejected");
        } else {
            error!(error = %err, "invocation failed");
        }
        self.responder
            .send(ctx, Reply::Error(format_error(&err)))
            .await;
        DispatchOutcome::Rejected(err)
    }
}
