//! Entity resolvers: users, members, channels, roles, mentionables and emojis.
//!
//! Lookup order is fixed: a mention pattern, then a bare numeric ID, then a case-insensitive
//! name search. Exactly one name match succeeds, several are ambiguous, none is `NotFound`
//! unless the parameter is optional.
//!
//! Flags:
//! - `other`: look the target up instead of using the issuer (users, members, channels)
//! - `crossscope`: search every guild instead of the current one
//! - `defaultself`: an optional parameter without input resolves to the issuer's entity
//! - `kinds=text|voice`: restrict channel kinds

use once_cell::sync::Lazy;
use regex::Regex;

use crate::declare::TypeTag;
use crate::diagnostics::{ArgumentErrorKind, CommandError};
use crate::model::{Channel, ChannelKind, Emoji, InvocationContext, Member, Role, Scope, Snowflake, User, Value};
use crate::resolve::{
    caseless_eq, ResolutionContext, ResolveFn, ResolverEntry, ResolverKind, ResolverRegistry,
};

static USER_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<@!?(\d+)>$").expect("valid user mention pattern"));
static CHANNEL_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<#(\d+)>$").expect("valid channel mention pattern"));
static ROLE_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<@&(\d+)>$").expect("valid role mention pattern"));
static EMOJI_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<a?:\w+:(\d+)>$").expect("valid emoji pattern"));

pub fn register_entity_resolvers(registry: &mut ResolverRegistry) {
    let table: [(TypeTag, ResolverKind, ResolveFn); 6] = [
        (TypeTag::User, ResolverKind::IssuerAware, resolve_user),
        (TypeTag::Member, ResolverKind::IssuerAware, resolve_member),
        (TypeTag::Channel, ResolverKind::IssuerAware, resolve_channel),
        (TypeTag::Role, ResolverKind::InputConsuming, resolve_role),
        (TypeTag::Mentionable, ResolverKind::InputConsuming, resolve_mentionable),
        (TypeTag::Emoji, ResolverKind::InputConsuming, resolve_emoji),
    ];
    for (type_tag, kind, resolve) in table {
        registry.register_entry(ResolverEntry {
            type_tag,
            kind,
            accepts_absent: true,
            resolve,
        });
    }
}

// ============================================================================
// SHARED LOOKUP MACHINERY
// ============================================================================

enum Lookup<T> {
    Found(T),
    Missing,
    Ambiguous(Vec<String>),
}

impl<T> Lookup<T> {
    fn from_option(found: Option<T>) -> Self {
        found.map_or(Lookup::Missing, Lookup::Found)
    }
}

fn capture_id(pattern: &Regex, text: &str) -> Option<Snowflake> {
    pattern.captures(text)?.get(1)?.as_str().parse().ok()
}

fn pick<T>(mut matches: Vec<T>, label: impl Fn(&T) -> String) -> Lookup<T> {
    match matches.len() {
        0 => Lookup::Missing,
        1 => Lookup::from_option(matches.pop()),
        _ => Lookup::Ambiguous(matches.iter().map(label).collect()),
    }
}

fn finish<T>(
    ctx: &ResolutionContext<'_>,
    entity: &'static str,
    input: String,
    lookup: Lookup<T>,
    wrap: impl FnOnce(T) -> Value,
) -> Result<Value, CommandError> {
    match lookup {
        Lookup::Found(found) => Ok(wrap(found)),
        Lookup::Ambiguous(candidates) => Err(ctx.fail(ArgumentErrorKind::AmbiguousMatch {
            entity,
            input,
            candidates,
        })),
        Lookup::Missing if ctx.param.is_optional() => Ok(Value::Absent),
        Lookup::Missing => Err(ctx.fail(ArgumentErrorKind::NotFound { entity, input })),
    }
}

/// Value for an optional parameter that received no input.
fn absent_or_self(
    ctx: &ResolutionContext<'_>,
    issuer: impl FnOnce(&InvocationContext) -> Option<Value>,
) -> Value {
    if ctx.has_flag("defaultself") {
        issuer(ctx.invocation).unwrap_or(Value::Absent)
    } else {
        Value::Absent
    }
}

fn search_scope(ctx: &ResolutionContext<'_>, entity: &'static str) -> Result<Scope, CommandError> {
    if ctx.has_flag("crossscope") {
        return Ok(Scope::Global);
    }
    ctx.invocation
        .local_scope()
        .ok_or_else(|| ctx.fail(ArgumentErrorKind::NotInScope { entity }))
}

fn labelled(name: &str, id: Snowflake) -> String {
    format!("{name} ({id})")
}

// ============================================================================
// USERS AND MEMBERS
// ============================================================================

pub fn resolve_user(ctx: &mut ResolutionContext<'_>) -> Result<Value, CommandError> {
    if !ctx.has_flag("other") {
        return Ok(Value::User(ctx.invocation.issuer.clone()));
    }
    let Some(input) = ctx.pop() else {
        return Ok(absent_or_self(ctx, |i| Some(Value::User(i.issuer.clone()))));
    };
    let text = input.text().trim().to_string();

    let entities = ctx.entities;
    let lookup = if let Some(id) = capture_id(&USER_MENTION, &text) {
        Lookup::from_option(entities.user(id))
    } else if let Some(user) = text.parse().ok().and_then(|id| entities.user(id)) {
        Lookup::Found(user)
    } else {
        let pool: Vec<User> = match ctx.invocation.guild_id() {
            Some(guild) if !ctx.has_flag("crossscope") => {
                entities.members(guild).into_iter().map(|m| m.user).collect()
            }
            _ => entities.users(),
        };
        let matches: Vec<User> = pool
            .into_iter()
            .filter(|u| caseless_eq(&u.name, &text))
            .collect();
        pick(matches, |u| labelled(&u.name, u.id))
    };
    finish(ctx, "user", text, lookup, Value::User)
}

pub fn resolve_member(ctx: &mut ResolutionContext<'_>) -> Result<Value, CommandError> {
    if !ctx.has_flag("other") {
        return match &ctx.invocation.member {
            Some(member) => Ok(Value::Member(member.clone())),
            None if ctx.param.is_optional() => Ok(Value::Absent),
            None => Err(ctx.fail(ArgumentErrorKind::NotInScope { entity: "member" })),
        };
    }
    let Some(input) = ctx.pop() else {
        return Ok(absent_or_self(ctx, |i| i.member.clone().map(Value::Member)));
    };
    let text = input.text().trim().to_string();
    let Some(guild) = ctx.invocation.guild_id() else {
        return Err(ctx.fail(ArgumentErrorKind::NotInScope { entity: "member" }));
    };

    let entities = ctx.entities;
    let lookup = if let Some(id) = capture_id(&USER_MENTION, &text) {
        Lookup::from_option(entities.member(guild, id))
    } else if let Some(member) = text.parse().ok().and_then(|id| entities.member(guild, id)) {
        Lookup::Found(member)
    } else {
        let matches: Vec<Member> = entities
            .members(guild)
            .into_iter()
            .filter(|m| {
                caseless_eq(m.display_name(), &text)
                    || caseless_eq(&m.user.name, &text)
            })
            .collect();
        pick(matches, |m| labelled(m.display_name(), m.id()))
    };
    finish(ctx, "member", text, lookup, Value::Member)
}

// ============================================================================
// CHANNELS
// ============================================================================

fn allowed_kinds(ctx: &ResolutionContext<'_>) -> Option<Vec<ChannelKind>> {
    ctx.flag("kinds")
        .map(|kinds| kinds.split('|').filter_map(ChannelKind::parse).collect())
}

pub fn resolve_channel(ctx: &mut ResolutionContext<'_>) -> Result<Value, CommandError> {
    if !ctx.has_flag("other") {
        return Ok(Value::Channel(ctx.invocation.channel.clone()));
    }
    let Some(input) = ctx.pop() else {
        return Ok(absent_or_self(ctx, |i| Some(Value::Channel(i.channel.clone()))));
    };
    let text = input.text().trim().to_string();
    let scope = search_scope(ctx, "channel")?;
    let kinds = allowed_kinds(ctx);
    let permitted = |kind: ChannelKind| kinds.as_ref().map_or(true, |k| k.contains(&kind));

    let entities = ctx.entities;
    let by_id = |id: Snowflake| {
        entities
            .channel(id)
            .filter(|c| scope.contains(c.guild_id) && permitted(c.kind))
    };
    let lookup = if let Some(id) = capture_id(&CHANNEL_MENTION, &text) {
        Lookup::from_option(by_id(id))
    } else if let Some(channel) = text.parse().ok().and_then(by_id) {
        Lookup::Found(channel)
    } else {
        let name = text.trim_start_matches('#');
        let matches: Vec<Channel> = entities
            .channels(scope)
            .into_iter()
            .filter(|c| caseless_eq(&c.name, name) && permitted(c.kind))
            .collect();
        pick(matches, |c| labelled(&c.name, c.id))
    };
    finish(ctx, "channel", text, lookup, Value::Channel)
}

// ============================================================================
// ROLES, MENTIONABLES AND EMOJIS
// ============================================================================

pub fn resolve_role(ctx: &mut ResolutionContext<'_>) -> Result<Value, CommandError> {
    let Some(input) = ctx.pop() else {
        return Ok(Value::Absent);
    };
    let text = input.text().trim().to_string();
    let scope = search_scope(ctx, "role")?;

    let entities = ctx.entities;
    let by_id = |id: Snowflake| entities.role(id).filter(|r| scope.contains(Some(r.guild_id)));
    let lookup = if let Some(id) = capture_id(&ROLE_MENTION, &text) {
        Lookup::from_option(by_id(id))
    } else if let Some(role) = text.parse().ok().and_then(by_id) {
        Lookup::Found(role)
    } else {
        let name = text.trim_start_matches('@');
        let matches: Vec<Role> = entities
            .roles(scope)
            .into_iter()
            .filter(|r| caseless_eq(&r.name, name))
            .collect();
        pick(matches, |r| labelled(&r.name, r.id))
    };
    finish(ctx, "role", text, lookup, Value::Role)
}

pub fn resolve_mentionable(ctx: &mut ResolutionContext<'_>) -> Result<Value, CommandError> {
    let Some(input) = ctx.pop() else {
        return Ok(Value::Absent);
    };
    let text = input.text().trim().to_string();
    let scope = search_scope(ctx, "mentionable")?;

    let entities = ctx.entities;
    let role_by_id = |id: Snowflake| entities.role(id).filter(|r| scope.contains(Some(r.guild_id)));
    let lookup = if let Some(id) = capture_id(&USER_MENTION, &text) {
        Lookup::from_option(entities.user(id).map(Value::User))
    } else if let Some(id) = capture_id(&ROLE_MENTION, &text) {
        Lookup::from_option(role_by_id(id).map(Value::Role))
    } else if let Some(found) = text.parse().ok().and_then(|id: Snowflake| {
        entities
            .user(id)
            .map(Value::User)
            .or_else(|| role_by_id(id).map(Value::Role))
    }) {
        Lookup::Found(found)
    } else {
        let name = text.trim_start_matches('@');
        let users: Vec<User> = match scope {
            Scope::Guild(guild) => entities.members(guild).into_iter().map(|m| m.user).collect(),
            Scope::Global => entities.users(),
        };
        let mut matches: Vec<Value> = entities
            .roles(scope)
            .into_iter()
            .filter(|r| caseless_eq(&r.name, name))
            .map(Value::Role)
            .collect();
        matches.extend(
            users
                .into_iter()
                .filter(|u| caseless_eq(&u.name, name))
                .map(Value::User),
        );
        pick(matches, |v| match v {
            Value::Role(r) => labelled(&format!("@{}", r.name), r.id),
            Value::User(u) => labelled(&u.name, u.id),
            other => other.type_name().to_string(),
        })
    };
    finish(ctx, "mentionable", text, lookup, |v| v)
}

pub fn resolve_emoji(ctx: &mut ResolutionContext<'_>) -> Result<Value, CommandError> {
    let Some(input) = ctx.pop() else {
        return Ok(Value::Absent);
    };
    let text = input.text().trim().to_string();
    let scope = search_scope(ctx, "emoji")?;

    let entities = ctx.entities;
    let by_id = |id: Snowflake| entities.emoji(id).filter(|e| scope.contains(e.guild_id));
    let lookup = if let Some(id) = capture_id(&EMOJI_MENTION, &text) {
        Lookup::from_option(by_id(id))
    } else if let Some(emoji) = text.parse().ok().and_then(by_id) {
        Lookup::Found(emoji)
    } else {
        let name = text.trim_matches(':');
        let matches: Vec<Emoji> = entities
            .emojis(scope)
            .into_iter()
            .filter(|e| caseless_eq(&e.name, name))
            .collect();
        pick(matches, |e| labelled(&e.name, e.id))
    };
    finish(ctx, "emoji", text, lookup, Value::Emoji)
}
