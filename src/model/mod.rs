//! Chat-platform entities as seen by the core.
//!
//! These are plain values supplied by the external client through [`EntitySource`]. The core
//! only needs identity, names and scope; everything else a real platform exposes stays on the
//! client's side.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod value;

pub use value::{Arguments, Value};

/// Platform-wide unique identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Snowflake(pub u64);

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Snowflake {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Snowflake)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: Snowflake(id),
            name: name.into(),
            bot: false,
        }
    }

    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// A user qualified by the guild they are a member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    pub guild_id: Snowflake,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl Member {
    pub fn new(user: User, guild_id: Snowflake) -> Self {
        Self {
            user,
            guild_id,
            nickname: None,
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn id(&self) -> Snowflake {
        self.user.id
    }

    /// Nickname when set, otherwise the account name.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.user.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Text,
    Direct,
    Voice,
    Category,
    News,
    Stage,
    Thread,
    Forum,
}

impl ChannelKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "dm" | "direct" => Some(Self::Direct),
            "voice" => Some(Self::Voice),
            "category" => Some(Self::Category),
            "news" | "announcement" => Some(Self::News),
            "stage" => Some(Self::Stage),
            "thread" => Some(Self::Thread),
            "forum" => Some(Self::Forum),
            _ => None,
        }
    }

    /// Numeric channel type used in the schema payload.
    pub fn schema_code(&self) -> u8 {
        match self {
            Self::Text => 0,
            Self::Direct => 1,
            Self::Voice => 2,
            Self::Category => 4,
            Self::News => 5,
            Self::Thread => 11,
            Self::Stage => 13,
            Self::Forum => 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub name: String,
    pub kind: ChannelKind,
}

impl Channel {
    pub fn text(id: u64, guild_id: u64, name: impl Into<String>) -> Self {
        Self {
            id: Snowflake(id),
            guild_id: Some(Snowflake(guild_id)),
            name: name.into(),
            kind: ChannelKind::Text,
        }
    }

    pub fn direct(id: u64) -> Self {
        Self {
            id: Snowflake(id),
            guild_id: None,
            name: String::new(),
            kind: ChannelKind::Direct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub name: String,
}

impl Role {
    pub fn new(id: u64, guild_id: u64, name: impl Into<String>) -> Self {
        Self {
            id: Snowflake(id),
            guild_id: Snowflake(guild_id),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    pub id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub name: String,
    #[serde(default)]
    pub animated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
}

/// Where an entity search looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Guild(Snowflake),
    Global,
}

impl Scope {
    /// Whether an entity owned by `guild_id` is visible from this scope.
    pub fn contains(&self, guild_id: Option<Snowflake>) -> bool {
        match self {
            Scope::Global => true,
            Scope::Guild(id) => guild_id == Some(*id),
        }
    }
}

/// Who invoked a command, and where.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationContext {
    pub issuer: User,
    pub member: Option<Member>,
    pub guild: Option<Guild>,
    pub channel: Channel,
}

impl InvocationContext {
    pub fn direct(issuer: User, channel: Channel) -> Self {
        Self {
            issuer,
            member: None,
            guild: None,
            channel,
        }
    }

    pub fn in_guild(member: Member, guild: Guild, channel: Channel) -> Self {
        Self {
            issuer: member.user.clone(),
            member: Some(member),
            guild: Some(guild),
            channel,
        }
    }

    pub fn guild_id(&self) -> Option<Snowflake> {
        self.guild.as_ref().map(|g| g.id)
    }

    /// The local search scope, `None` outside a guild.
    pub fn local_scope(&self) -> Option<Scope> {
        self.guild_id().map(Scope::Guild)
    }
}

/// Read access to the client's entity caches.
///
/// Listing methods return every entity visible in the scope; the core performs the
/// case-insensitive matching itself so lookup semantics do not depend on the client.
pub trait EntitySource: Send + Sync {
    fn user(&self, id: Snowflake) -> Option<User>;
    fn users(&self) -> Vec<User>;
    fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member>;
    fn members(&self, guild_id: Snowflake) -> Vec<Member>;
    fn channel(&self, id: Snowflake) -> Option<Channel>;
    fn channels(&self, scope: Scope) -> Vec<Channel>;
    fn role(&self, id: Snowflake) -> Option<Role>;
    fn roles(&self, scope: Scope) -> Vec<Role>;
    fn emoji(&self, id: Snowflake) -> Option<Emoji>;
    fn emojis(&self, scope: Scope) -> Vec<Emoji>;
}

/// Answers "does this context satisfy permission X".
pub trait PermissionResolver: Send + Sync {
    fn has_permission(&self, ctx: &InvocationContext, permission: &str) -> bool;
}

/// Grants everything; useful for tooling and tests.
pub struct AllowAll;

impl PermissionResolver for AllowAll {
    fn has_permission(&self, _ctx: &InvocationContext, _permission: &str) -> bool {
        true
    }
}

/// An entity source with nothing in it.
pub struct NoEntities;

impl EntitySource for NoEntities {
    fn user(&self, _id: Snowflake) -> Option<User> {
        None
    }
    fn users(&self) -> Vec<User> {
        Vec::new()
    }
    fn member(&self, _guild_id: Snowflake, _user_id: Snowflake) -> Option<Member> {
        None
    }
    fn members(&self, _guild_id: Snowflake) -> Vec<Member> {
        Vec::new()
    }
    fn channel(&self, _id: Snowflake) -> Option<Channel> {
        None
    }
    fn channels(&self, _scope: Scope) -> Vec<Channel> {
        Vec::new()
    }
    fn role(&self, _id: Snowflake) -> Option<Role> {
        None
    }
    fn roles(&self, _scope: Scope) -> Vec<Role> {
        Vec::new()
    }
    fn emoji(&self, _id: Snowflake) -> Option<Emoji> {
        None
    }
    fn emojis(&self, _scope: Scope) -> Vec<Emoji> {
        Vec::new()
    }
}
