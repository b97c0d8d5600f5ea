use std::fmt;

use serde::{Deserialize, Serialize};

/// The declared semantic type of a parameter; the key of the resolver registry.
///
/// `Named` covers everything that is not built in: registered enumerations (which fall back to
/// the `AnyEnum` resolver) and application types with their own resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Bool,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Decimal,
    Number,
    String,
    StringArray,
    User,
    Member,
    Channel,
    Role,
    Mentionable,
    Emoji,
    Guild,
    AnyEnum,
    Named(String),
}

impl TypeTag {
    /// Maps a signature keyword to a tag. Unknown keywords become `Named`.
    pub fn from_keyword(keyword: &str) -> TypeTag {
        match keyword.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => TypeTag::Bool,
            "i8" | "byte" => TypeTag::I8,
            "i16" | "short" => TypeTag::I16,
            "i32" | "int" | "integer" => TypeTag::I32,
            "i64" | "long" => TypeTag::I64,
            "f32" | "float" => TypeTag::F32,
            "f64" | "double" => TypeTag::F64,
            "decimal" | "bigdecimal" => TypeTag::Decimal,
            "number" => TypeTag::Number,
            "string" | "str" | "text" => TypeTag::String,
            "strings" | "string[]" => TypeTag::StringArray,
            "user" => TypeTag::User,
            "member" => TypeTag::Member,
            "channel" => TypeTag::Channel,
            "role" => TypeTag::Role,
            "mentionable" => TypeTag::Mentionable,
            "emoji" | "emote" => TypeTag::Emoji,
            "guild" | "server" => TypeTag::Guild,
            _ => TypeTag::Named(keyword.to_string()),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, TypeTag::I8 | TypeTag::I16 | TypeTag::I32 | TypeTag::I64)
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            TypeTag::F32 | TypeTag::F64 | TypeTag::Decimal | TypeTag::Number
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_entity(&self) -> bool {
        matches!(
            self,
            TypeTag::User
                | TypeTag::Member
                | TypeTag::Channel
                | TypeTag::Role
                | TypeTag::Mentionable
                | TypeTag::Emoji
        )
    }

    /// Tail parameters that swallow every remaining token.
    pub fn is_variadic(&self) -> bool {
        matches!(self, TypeTag::StringArray)
    }

    pub fn keyword(&self) -> &str {
        match self {
            TypeTag::Bool => "bool",
            TypeTag::I8 => "i8",
            TypeTag::I16 => "i16",
            TypeTag::I32 => "i32",
            TypeTag::I64 => "i64",
            TypeTag::F32 => "f32",
            TypeTag::F64 => "f64",
            TypeTag::Decimal => "decimal",
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::StringArray => "strings",
            TypeTag::User => "user",
            TypeTag::Member => "member",
            TypeTag::Channel => "channel",
            TypeTag::Role => "role",
            TypeTag::Mentionable => "mentionable",
            TypeTag::Emoji => "emoji",
            TypeTag::Guild => "guild",
            TypeTag::AnyEnum => "enum",
            TypeTag::Named(name) => name,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_round_trip_for_builtins() {
        for tag in [
            TypeTag::Bool,
            TypeTag::I16,
            TypeTag::I64,
            TypeTag::F32,
            TypeTag::Decimal,
            TypeTag::StringArray,
            TypeTag::Member,
            TypeTag::Mentionable,
        ] {
            assert_eq!(TypeTag::from_keyword(tag.keyword()), tag);
        }
    }

    #[test]
    fn unknown_keyword_is_named() {
        assert_eq!(
            TypeTag::from_keyword("Color"),
            TypeTag::Named("Color".to_string())
        );
        assert_eq!(TypeTag::from_keyword("INT"), TypeTag::I32);
    }
}
