//! Prefix text routing.
//!
//! Strips a configured prefix (or a mention of the bot), splits the rest on whitespace while
//! keeping byte spans into the raw text, and picks the command whose subcommand path matches
//! the longest run of leading tokens. Among overloads of equal path length the first whose
//! arity fits the remaining tokens wins.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::FrameworkConfig;
use crate::declare::RegisteredCommand;
use crate::diagnostics::{to_error_source, Span};
use crate::model::Snowflake;
use crate::resolve::{is_issuer_only, ArgumentInput, ResolverRegistry, Token};
use crate::schema::RoutingTable;

#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub command: Arc<RegisteredCommand>,
    pub remaining: ArgumentInput,
}

#[derive(Debug, Clone)]
pub enum Route {
    /// The text does not start with a prefix.
    NotACommand,
    Unknown { alias: String },
    Matched(RouteMatch),
}

/// Splits on whitespace, keeping byte spans.
pub fn tokenize(text: &str) -> VecDeque<Token> {
    let mut tokens = VecDeque::new();
    let mut start: Option<usize> = None;
    for (index, ch) in text.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(s)) => {
                tokens.push_back(Token {
                    text: text[s..index].to_string(),
                    span: Span::new(s, index),
                });
                start = None;
            }
            (false, None) => start = Some(index),
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push_back(Token {
            text: text[s..].to_string(),
            span: Span::new(s, text.len()),
        });
    }
    tokens
}

#[derive(Debug, Clone)]
pub struct TextRouter {
    prefixes: Vec<String>,
    mention_of: Option<Snowflake>,
}

impl TextRouter {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self {
            prefixes,
            mention_of: None,
        }
    }

    pub fn from_config(config: &FrameworkConfig) -> Self {
        let router = Self::new(config.prefixes.clone());
        match (config.mention_prefix, config.bot_id) {
            (true, Some(id)) => router.with_mention(Snowflake(id)),
            _ => router,
        }
    }

    /// Also accept `<@id>` / `<@!id>` of the bot as a prefix.
    pub fn with_mention(mut self, bot_id: Snowflake) -> Self {
        self.mention_of = Some(bot_id);
        self
    }

    /// Byte offset where the command body begins.
    pub fn strip_prefix(&self, raw: &str) -> Option<usize> {
        let lead = raw.len() - raw.trim_start().len();
        let body = &raw[lead..];
        if let Some(id) = self.mention_of {
            for mention in [format!("<@{id}>"), format!("<@!{id}>")] {
                if let Some(rest) = body.strip_prefix(mention.as_str()) {
                    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                        return Some(lead + mention.len());
                    }
                }
            }
        }
        self.prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .find(|p| body.starts_with(p.as_str()))
            .map(|p| lead + p.len())
    }

    pub fn route(&self, raw: &str, table: &RoutingTable, resolvers: &ResolverRegistry) -> Route {
        let Some(offset) = self.strip_prefix(raw) else {
            return Route::NotACommand;
        };
        let mut tokens: VecDeque<Token> = tokenize(&raw[offset..])
            .into_iter()
            .map(|t| Token {
                span: Span::new(t.span.start + offset, t.span.end + offset),
                text: t.text,
            })
            .collect();

        let Some(alias) = tokens.pop_front() else {
            return Route::NotACommand;
        };
        let Some(candidates) = table.get(&alias.text) else {
            return Route::Unknown {
                alias: alias.text.to_lowercase(),
            };
        };

        let matching: Vec<&Arc<RegisteredCommand>> = candidates
            .iter()
            .filter(|c| {
                let sub = c.subcommand_path();
                sub.len() <= tokens.len()
                    && sub
                        .iter()
                        .zip(tokens.iter())
                        .all(|(segment, token)| segment.eq_ignore_ascii_case(&token.text))
            })
            .collect();
        let Some(depth) = matching.iter().map(|c| c.subcommand_path().len()).max() else {
            return Route::Unknown {
                alias: alias.text.to_lowercase(),
            };
        };
        let deepest: Vec<&Arc<RegisteredCommand>> = matching
            .into_iter()
            .filter(|c| c.subcommand_path().len() == depth)
            .collect();

        let remaining = tokens.len() - depth;
        let Some(chosen) = deepest
            .iter()
            .find(|c| arity_fits(c, resolvers, remaining))
            .or_else(|| deepest.first())
        else {
            return Route::Unknown {
                alias: alias.text.to_lowercase(),
            };
        };

        tokens.drain(..depth);
        Route::Matched(RouteMatch {
            command: Arc::clone(chosen),
            remaining: ArgumentInput::Text {
                source: to_error_source(raw),
                tokens,
            },
        })
    }
}

/// Whether `available` tokens can satisfy the command's input-consuming parameters.
fn arity_fits(command: &RegisteredCommand, resolvers: &ResolverRegistry, available: usize) -> bool {
    let consuming: Vec<_> = command
        .parameters()
        .iter()
        .filter(|p| {
            resolvers
                .lookup(p.type_tag())
                .map_or(true, |entry| !is_issuer_only(p, entry))
        })
        .collect();
    let required = consuming.iter().filter(|p| p.requires_input()).count();
    let greedy = consuming.last().map_or(false, |p| {
        p.type_tag().is_variadic()
            || (p.type_tag() == &crate::declare::TypeTag::String
                && !p.has_flag("single")
                && !p.has_flag("raw"))
    });
    required <= available && (greedy || available <= consuming.len())
}
