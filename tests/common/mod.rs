//! # Test Fixtures
//!
//! In-memory collaborators shared by the integration tests: an entity cache, a permission table
//! and a responder that records every reply.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use argot::dispatch::{Reply, Responder};
use argot::model::{
    Channel, Emoji, EntitySource, Guild, InvocationContext, Member, PermissionResolver, Role,
    Scope, Snowflake, User,
};
use async_trait::async_trait;

pub const GUILD: u64 = 1;
pub const OTHER_GUILD: u64 = 2;

// ============================================================================
// ENTITIES
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct MemoryEntities {
    pub users: Vec<User>,
    pub members: Vec<Member>,
    pub channels: Vec<Channel>,
    pub roles: Vec<Role>,
    pub emojis: Vec<Emoji>,
}

impl MemoryEntities {
    /// Two guilds: alice (issuer), bob, a bot named robo, duplicate "Helper" roles and one
    /// non-ASCII role name.
    pub fn populated() -> Self {
        let alice = User::new(10, "alice");
        let bob = User::new(20, "bob");
        let carol = User::new(30, "carol");
        let mut robo = User::new(40, "robo");
        robo.bot = true;

        let guild = Snowflake(GUILD);
        let other = Snowflake(OTHER_GUILD);
        Self {
            users: vec![alice.clone(), bob.clone(), carol.clone(), robo.clone()],
            members: vec![
                Member::new(alice, guild),
                Member::new(bob, guild).with_nickname("bobby"),
                Member::new(robo, guild),
                Member::new(carol, other),
            ],
            channels: vec![
                Channel::text(100, GUILD, "general"),
                Channel::text(101, GUILD, "mods"),
                Channel::text(200, OTHER_GUILD, "general"),
            ],
            roles: vec![
                Role::new(500, GUILD, "Moderator"),
                Role::new(501, GUILD, "Helper"),
                Role::new(502, GUILD, "helper"),
                Role::new(503, GUILD, "Émissaire"),
                Role::new(600, OTHER_GUILD, "Outsider"),
            ],
            emojis: vec![Emoji {
                id: Snowflake(700),
                guild_id: Some(guild),
                name: "party".to_string(),
                animated: false,
            }],
        }
    }
}

impl EntitySource for MemoryEntities {
    fn user(&self, id: Snowflake) -> Option<User> {
        self.users.iter().find(|u| u.id == id).cloned()
    }
    fn users(&self) -> Vec<User> {
        self.users.clone()
    }
    fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member> {
        self.members
            .iter()
            .find(|m| m.guild_id == guild_id && m.id() == user_id)
            .cloned()
    }
    fn members(&self, guild_id: Snowflake) -> Vec<Member> {
        self.members
            .iter()
            .filter(|m| m.guild_id == guild_id)
            .cloned()
            .collect()
    }
    fn channel(&self, id: Snowflake) -> Option<Channel> {
        self.channels.iter().find(|c| c.id == id).cloned()
    }
    fn channels(&self, scope: Scope) -> Vec<Channel> {
        self.channels
            .iter()
            .filter(|c| scope.contains(c.guild_id))
            .cloned()
            .collect()
    }
    fn role(&self, id: Snowflake) -> Option<Role> {
        self.roles.iter().find(|r| r.id == id).cloned()
    }
    fn roles(&self, scope: Scope) -> Vec<Role> {
        self.roles
            .iter()
            .filter(|r| scope.contains(Some(r.guild_id)))
            .cloned()
            .collect()
    }
    fn emoji(&self, id: Snowflake) -> Option<Emoji> {
        self.emojis.iter().find(|e| e.id == id).cloned()
    }
    fn emojis(&self, scope: Scope) -> Vec<Emoji> {
        self.emojis
            .iter()
            .filter(|e| scope.contains(e.guild_id))
            .cloned()
            .collect()
    }
}

// ============================================================================
// PERMISSIONS AND REPLIES
// ============================================================================

#[derive(Debug, Default)]
pub struct StaticPermissions {
    granted: BTreeSet<String>,
}

impl StaticPermissions {
    pub fn granting(permissions: &[&str]) -> Self {
        Self {
            granted: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl PermissionResolver for StaticPermissions {
    fn has_permission(&self, _ctx: &InvocationContext, permission: &str) -> bool {
        self.granted.contains(permission)
    }
}

#[derive(Debug, Default)]
pub struct RecordingResponder {
    replies: Mutex<Vec<Reply>>,
}

impl RecordingResponder {
    pub fn replies(&self) -> Vec<Reply> {
        self.replies.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<Reply> {
        self.replies().pop()
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn send(&self, _ctx: &InvocationContext, reply: Reply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push(reply);
        }
    }
}

// ============================================================================
// CONTEXTS
// ============================================================================

/// alice, invoking from #general of the main guild.
pub fn guild_ctx() -> InvocationContext {
    let member = Member::new(User::new(10, "alice"), Snowflake(GUILD));
    InvocationContext::in_guild(
        member,
        Guild {
            id: Snowflake(GUILD),
            name: "Main".to_string(),
        },
        Channel::text(100, GUILD, "general"),
    )
}

pub fn direct_ctx() -> InvocationContext {
    InvocationContext::direct(User::new(10, "alice"), Channel::direct(900))
}

pub fn entities() -> Arc<MemoryEntities> {
    Arc::new(MemoryEntities::populated())
}
