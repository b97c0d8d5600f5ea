// # Argot Resolver System
//
// Resolvers turn one parameter's input into a typed `Value`. They are registered against a
// `TypeTag` and looked up most-specific-first, with a single level of family fallback
// (a registered enumeration falls back to the generic `AnyEnum` resolver).
//
// ## Module Structure
//
// - **`numeric`**: integer, float and decimal parsing with range validation
// - **`strings`**: single tokens, greedy tails and split arrays
// - **`enums`**: separator-insensitive enumeration matching
// - **`entities`**: users, members, channels, roles, mentionables and emojis
// - **`primitives`**: booleans and the current guild
// - **`conditions`**: post-resolution checks attached to parameters
// - **`pipeline`**: the per-command resolution walk shared by both front ends
//
// ## Resolver Kinds
//
// A resolver is `IssuerOnly` (derives its value from the invocation, never consumes input),
// `InputConsuming`, or `IssuerAware`. `IssuerAware` resolvers behave as issuer-only unless the
// parameter carries the `other` flag, in which case they look the target up from input.
// Issuer-only parameters are elided from the structured schema.

use std::borrow::Cow;
use std::collections::VecDeque;

use im::HashMap;

use crate::declare::{ParameterDescriptor, TypeTag};
use crate::diagnostics::{ArgumentErrorKind, CommandError, SourceArc, Span};
use crate::model::{EntitySource, InvocationContext, Snowflake, Value};

pub mod conditions;
pub mod entities;
pub mod enums;
pub mod numeric;
pub mod pipeline;
pub mod primitives;
pub mod strings;

pub use conditions::{ConditionContext, ConditionFn, ConditionRegistry};
pub use pipeline::{resolve, Resolution, ResolveEnv};

// ============================================================================
// REGISTRY TYPES
// ============================================================================

pub type ResolveFn = fn(&mut ResolutionContext<'_>) -> Result<Value, CommandError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverKind {
    IssuerOnly,
    InputConsuming,
    /// Issuer-only unless the parameter is flagged `other`.
    IssuerAware,
}

#[derive(Debug, Clone)]
pub struct ResolverEntry {
    pub type_tag: TypeTag,
    pub kind: ResolverKind,
    /// Whether the resolver may run for an optional parameter that received no input.
    pub accepts_absent: bool,
    pub resolve: ResolveFn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    pub members: Vec<String>,
}

/// Case-insensitive comparison over full Unicode lowercase mappings.
pub fn caseless_eq(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Whether `param` is satisfied from the invocation context alone.
pub fn is_issuer_only(param: &ParameterDescriptor, entry: &ResolverEntry) -> bool {
    match entry.kind {
        ResolverKind::IssuerOnly => true,
        ResolverKind::InputConsuming => false,
        ResolverKind::IssuerAware => !param.has_flag("other"),
    }
}

/// Type-keyed table of resolvers and declared enumerations.
#[derive(Debug, Clone, Default)]
pub struct ResolverRegistry {
    entries: HashMap<TypeTag, ResolverEntry>,
    enums: HashMap<String, EnumDef>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolver; an existing entry for the same tag is replaced.
    pub fn register(&mut self, type_tag: TypeTag, kind: ResolverKind, resolve: ResolveFn) {
        let accepts_absent = matches!(kind, ResolverKind::IssuerAware);
        self.register_entry(ResolverEntry {
            type_tag,
            kind,
            accepts_absent,
            resolve,
        });
    }

    pub fn register_entry(&mut self, entry: ResolverEntry) {
        self.entries.insert(entry.type_tag.clone(), entry);
    }

    /// Declares an enumeration; `Named(name)` parameters then resolve through `AnyEnum`.
    pub fn register_enum(&mut self, name: impl Into<String>, members: Vec<String>) {
        let name = name.into();
        self.enums
            .insert(name.to_lowercase(), EnumDef { name, members });
    }

    /// Exact match first, then the enumeration family fallback.
    pub fn lookup(&self, type_tag: &TypeTag) -> Option<&ResolverEntry> {
        if let Some(entry) = self.entries.get(type_tag) {
            return Some(entry);
        }
        match type_tag {
            TypeTag::Named(name) if self.enum_def(name).is_some() => {
                self.entries.get(&TypeTag::AnyEnum)
            }
            _ => None,
        }
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(&name.to_lowercase())
    }

    pub fn enum_members(&self, name: &str) -> Option<&[String]> {
        self.enum_def(name).map(|def| def.members.as_slice())
    }

    pub fn has(&self, type_tag: &TypeTag) -> bool {
        self.lookup(type_tag).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds the registry with every built-in resolver.
pub fn build_default_registry() -> ResolverRegistry {
    let mut registry = ResolverRegistry::new();
    numeric::register_numeric_resolvers(&mut registry);
    strings::register_string_resolvers(&mut registry);
    enums::register_enum_resolver(&mut registry);
    primitives::register_primitive_resolvers(&mut registry);
    entities::register_entity_resolvers(&mut registry);
    registry
}

// ============================================================================
// INPUT
// ============================================================================

/// One whitespace-delimited piece of raw command text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub span: Span,
}

/// A pre-typed option value from the structured front end.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(Snowflake),
    Channel(Snowflake),
    Role(Snowflake),
    Mentionable(Snowflake),
}

impl OptionValue {
    /// Textual form used when a resolver falls back to string handling.
    pub fn to_text(&self) -> String {
        match self {
            OptionValue::String(s) => s.clone(),
            OptionValue::Integer(i) => i.to_string(),
            OptionValue::Number(n) => n.to_string(),
            OptionValue::Boolean(b) => b.to_string(),
            OptionValue::User(id)
            | OptionValue::Channel(id)
            | OptionValue::Role(id)
            | OptionValue::Mentionable(id) => id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedOption {
    pub name: String,
    pub value: OptionValue,
}

impl TypedOption {
    pub fn new(name: impl Into<String>, value: OptionValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// The remaining input of one invocation.
#[derive(Debug, Clone)]
pub enum ArgumentInput {
    Text {
        source: SourceArc,
        tokens: VecDeque<Token>,
    },
    Structured(Vec<TypedOption>),
}

impl ArgumentInput {
    pub fn remaining_tokens(&self) -> usize {
        match self {
            ArgumentInput::Text { tokens, .. } => tokens.len(),
            ArgumentInput::Structured(options) => options.len(),
        }
    }
}

/// A single popped input value.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Text(Token),
    Typed(OptionValue),
}

impl InputValue {
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            InputValue::Text(token) => Cow::Borrowed(token.text.as_str()),
            InputValue::Typed(value) => Cow::Owned(value.to_text()),
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            InputValue::Text(token) => Some(token.span),
            InputValue::Typed(_) => None,
        }
    }
}

// ============================================================================
// RESOLUTION CONTEXT
// ============================================================================

/// Everything a resolver may look at while resolving one parameter.
pub struct ResolutionContext<'a> {
    pub param: &'a ParameterDescriptor,
    pub invocation: &'a InvocationContext,
    pub entities: &'a dyn EntitySource,
    pub registry: &'a ResolverRegistry,
    /// Last input-consuming parameter of the command.
    pub is_last: bool,
    input: &'a mut ArgumentInput,
    injected: Option<InputValue>,
    last_span: Option<Span>,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(
        param: &'a ParameterDescriptor,
        invocation: &'a InvocationContext,
        entities: &'a dyn EntitySource,
        registry: &'a ResolverRegistry,
        input: &'a mut ArgumentInput,
        is_last: bool,
    ) -> Self {
        Self {
            param,
            invocation,
            entities,
            registry,
            is_last,
            input,
            injected: None,
            last_span: None,
        }
    }

    pub fn has_input(&self) -> bool {
        if self.injected.is_some() {
            return true;
        }
        match &*self.input {
            ArgumentInput::Text { tokens, .. } => !tokens.is_empty(),
            ArgumentInput::Structured(options) => options
                .iter()
                .any(|o| o.name.eq_ignore_ascii_case(self.param.name())),
        }
    }

    /// Makes `value` the next thing [`pop`](Self::pop) returns.
    pub(crate) fn inject(&mut self, value: InputValue) {
        self.injected = Some(value);
    }

    pub(crate) fn inject_text(&mut self, text: &str) {
        let span = self.last_span.unwrap_or_default();
        self.inject(InputValue::Text(Token {
            text: text.to_string(),
            span,
        }));
    }

    /// Takes the next input value for this parameter.
    pub fn pop(&mut self) -> Option<InputValue> {
        if let Some(value) = self.injected.take() {
            if let Some(span) = value.span() {
                self.last_span = Some(span);
            }
            return Some(value);
        }
        let param = self.param;
        let name = param.name();
        let value = match &mut *self.input {
            ArgumentInput::Text { tokens, .. } => tokens.pop_front().map(InputValue::Text),
            ArgumentInput::Structured(options) => options
                .iter()
                .position(|o| o.name.eq_ignore_ascii_case(name))
                .map(|index| InputValue::Typed(options.remove(index).value)),
        };
        if let Some(span) = value.as_ref().and_then(InputValue::span) {
            self.last_span = Some(span);
        }
        value
    }

    /// Takes every remaining input value for this parameter.
    pub fn pop_rest(&mut self) -> Vec<InputValue> {
        let mut values = Vec::new();
        let mut span: Option<Span> = None;
        while let Some(value) = self.pop() {
            if let Some(s) = value.span() {
                span = Some(span.map_or(s, |joined| joined.join(s)));
            }
            values.push(value);
            if matches!(&*self.input, ArgumentInput::Structured(_)) {
                break;
            }
        }
        if span.is_some() {
            self.last_span = span;
        }
        values
    }

    pub fn flag(&self, key: &str) -> Option<&str> {
        self.param.flag(key)
    }

    pub fn has_flag(&self, key: &str) -> bool {
        self.param.has_flag(key)
    }

    pub fn source(&self) -> Option<&SourceArc> {
        match &*self.input {
            ArgumentInput::Text { source, .. } => Some(source),
            ArgumentInput::Structured(_) => None,
        }
    }

    /// Builds an `InvalidArgument` for this parameter, pointing at the last consumed token.
    pub fn fail(&self, kind: ArgumentErrorKind) -> CommandError {
        let err = CommandError::invalid_argument(self.param.name(), kind);
        match (self.source(), self.last_span) {
            (Some(source), Some(span)) => err.located(source, span),
            _ => err,
        }
    }
}
