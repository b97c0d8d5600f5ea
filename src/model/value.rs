use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::model::{Channel, Emoji, Guild, Member, Role, User};

/// A resolved, strongly-typed argument value.
#[derive(Clone)]
pub enum Value {
    /// An optional parameter that received nothing.
    Absent,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Str(String),
    Strings(Vec<String>),
    Enum { type_name: String, member: String },
    User(User),
    Member(Member),
    Channel(Channel),
    Role(Role),
    Emoji(Emoji),
    Guild(Guild),
    /// Produced by resolvers registered for application types.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Widens any integer variant.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I8(v) => Some(i64::from(*v)),
            Value::I16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F32(v) => Some(f64::from(*v)),
            Value::F64(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Enum { member, .. } => Some(member),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Value::Strings(items) => Some(items),
            _ => None,
        }
    }

    /// The user behind a `User` or `Member` value.
    pub fn as_user(&self) -> Option<&User> {
        match self {
            Value::User(user) => Some(user),
            Value::Member(member) => Some(&member.user),
            _ => None,
        }
    }

    pub fn as_member(&self) -> Option<&Member> {
        match self {
            Value::Member(member) => Some(member),
            _ => None,
        }
    }

    pub fn as_channel(&self) -> Option<&Channel> {
        match self {
            Value::Channel(channel) => Some(channel),
            _ => None,
        }
    }

    pub fn as_role(&self) -> Option<&Role> {
        match self {
            Value::Role(role) => Some(role),
            _ => None,
        }
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            Value::Custom(inner) => inner.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::Str(_) => "string",
            Value::Strings(_) => "strings",
            Value::Enum { .. } => "enum",
            Value::User(_) => "user",
            Value::Member(_) => "member",
            Value::Channel(_) => "channel",
            Value::Role(_) => "role",
            Value::Emoji(_) => "emoji",
            Value::Guild(_) => "guild",
            Value::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => write!(f, "Absent"),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::I8(v) => f.debug_tuple("I8").field(v).finish(),
            Value::I16(v) => f.debug_tuple("I16").field(v).finish(),
            Value::I32(v) => f.debug_tuple("I32").field(v).finish(),
            Value::I64(v) => f.debug_tuple("I64").field(v).finish(),
            Value::F32(v) => f.debug_tuple("F32").field(v).finish(),
            Value::F64(v) => f.debug_tuple("F64").field(v).finish(),
            Value::Decimal(v) => f.debug_tuple("Decimal").field(v).finish(),
            Value::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Value::Strings(v) => f.debug_tuple("Strings").field(v).finish(),
            Value::Enum { type_name, member } => f
                .debug_struct("Enum")
                .field("type_name", type_name)
                .field("member", member)
                .finish(),
            Value::User(v) => f.debug_tuple("User").field(v).finish(),
            Value::Member(v) => f.debug_tuple("Member").field(v).finish(),
            Value::Channel(v) => f.debug_tuple("Channel").field(v).finish(),
            Value::Role(v) => f.debug_tuple("Role").field(v).finish(),
            Value::Emoji(v) => f.debug_tuple("Emoji").field(v).finish(),
            Value::Guild(v) => f.debug_tuple("Guild").field(v).finish(),
            Value::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Absent, Value::Absent) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Strings(a), Value::Strings(b)) => a == b,
            (
                Value::Enum {
                    type_name: ta,
                    member: ma,
                },
                Value::Enum {
                    type_name: tb,
                    member: mb,
                },
            ) => ta == tb && ma == mb,
            (Value::User(a), Value::User(b)) => a == b,
            (Value::Member(a), Value::Member(b)) => a == b,
            (Value::Channel(a), Value::Channel(b)) => a == b,
            (Value::Role(a), Value::Role(b)) => a == b,
            (Value::Emoji(a), Value::Emoji(b)) => a == b,
            (Value::Guild(a), Value::Guild(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Resolved arguments in parameter declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// `None` for both missing names and `Absent` values.
    pub fn present(&self, name: &str) -> Option<&Value> {
        self.get(name).filter(|v| !v.is_absent())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }
}
