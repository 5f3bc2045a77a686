use chrono::{DateTime, FixedOffset, Offset, TimeZone};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Resolution gives up on a [`LogValuer`] chain after this many steps.
const MAX_RESOLVE_STEPS: usize = 100;

/// The closed set of value categories an attribute can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Any,
    Bool,
    Duration,
    Float64,
    Int64,
    String,
    Time,
    Uint64,
    Group,
    LogValuer,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Any => "Any",
            Kind::Bool => "Bool",
            Kind::Duration => "Duration",
            Kind::Float64 => "Float64",
            Kind::Int64 => "Int64",
            Kind::String => "String",
            Kind::Time => "Time",
            Kind::Uint64 => "Uint64",
            Kind::Group => "Group",
            Kind::LogValuer => "LogValuer",
        };
        f.write_str(name)
    }
}

/// A value that computes its logged representation on demand.
///
/// Implementations must be pure: resolving the same valuer twice has to
/// produce equal values.
pub trait LogValuer: Send + Sync + 'static {
    fn log_value(&self) -> Value;
}

/// Adapts a closure into a [`LogValuer`].
pub struct FnValuer<F>(pub F);

impl<F> LogValuer for FnValuer<F>
where
    F: Fn() -> Value + Send + Sync + 'static,
{
    fn log_value(&self) -> Value {
        (self.0)()
    }
}

/// An uninterpreted value, compared by `PartialEq` against values of the
/// same concrete type.
pub trait AnyValue: fmt::Debug + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;

    /// `true` when `other` has the same concrete type and compares equal.
    fn eq_any(&self, other: &dyn AnyValue) -> bool;
}

impl<T> AnyValue for T
where
    T: fmt::Debug + PartialEq + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_any(&self, other: &dyn AnyValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }
}

/// A typed attribute value.
#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Duration(Duration),
    Float64(f64),
    Int64(i64),
    String(String),
    Time(DateTime<FixedOffset>),
    Uint64(u64),
    Group(Vec<Attr>),
    LogValuer(Arc<dyn LogValuer>),
    Any(Arc<dyn AnyValue>),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Duration(_) => Kind::Duration,
            Value::Float64(_) => Kind::Float64,
            Value::Int64(_) => Kind::Int64,
            Value::String(_) => Kind::String,
            Value::Time(_) => Kind::Time,
            Value::Uint64(_) => Kind::Uint64,
            Value::Group(_) => Kind::Group,
            Value::LogValuer(_) => Kind::LogValuer,
            Value::Any(_) => Kind::Any,
        }
    }

    pub fn any<T: AnyValue>(value: T) -> Self {
        Value::Any(Arc::new(value))
    }

    pub fn group(attrs: impl IntoIterator<Item = Attr>) -> Self {
        Value::Group(attrs.into_iter().collect())
    }

    pub fn valuer<V: LogValuer>(valuer: V) -> Self {
        Value::LogValuer(Arc::new(valuer))
    }

    /// Force a lazily computed value until it yields a concrete kind.
    ///
    /// Values of any other kind are returned unchanged, so resolving twice
    /// is the same as resolving once. A chain that never settles turns into
    /// a string describing the problem.
    pub fn resolve(self) -> Value {
        let mut value = self;
        for _ in 0..MAX_RESOLVE_STEPS {
            match value {
                Value::LogValuer(valuer) => value = valuer.log_value(),
                resolved => return resolved,
            }
        }
        match value {
            Value::LogValuer(_) => Value::String(format!(
                "LogValuer not resolved after {} steps",
                MAX_RESOLVE_STEPS
            )),
            resolved => resolved,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint64(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::Time(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&[Attr]> {
        match self {
            Value::Group(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn as_any_value(&self) -> Option<&dyn AnyValue> {
        match self {
            Value::Any(a) => Some(a.as_ref()),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Uint64(a), Value::Uint64(b)) => a == b,
            (Value::Group(a), Value::Group(b)) => a == b,
            (Value::LogValuer(a), Value::LogValuer(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Any(a), Value::Any(b)) => a.eq_any(b.as_ref()),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Duration(d) => f.debug_tuple("Duration").field(d).finish(),
            Value::Float64(v) => f.debug_tuple("Float64").field(v).finish(),
            Value::Int64(v) => f.debug_tuple("Int64").field(v).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Time(t) => f.debug_tuple("Time").field(t).finish(),
            Value::Uint64(v) => f.debug_tuple("Uint64").field(v).finish(),
            Value::Group(attrs) => f.debug_tuple("Group").field(attrs).finish(),
            Value::LogValuer(_) => f.write_str("LogValuer(..)"),
            Value::Any(a) => f.debug_tuple("Any").field(a).finish(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Duration(d) => write!(f, "{:?}", d),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::String(s) => f.write_str(s),
            Value::Time(t) => f.write_str(&t.to_rfc3339()),
            Value::Uint64(v) => write!(f, "{}", v),
            Value::Group(attrs) => {
                f.write_str("[")?;
                for (i, attr) in attrs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", attr)?;
                }
                f.write_str("]")
            }
            Value::LogValuer(_) => write!(f, "{}", self.clone().resolve()),
            Value::Any(a) => write!(f, "{:?}", a),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Duration(d) => serializer.collect_str(&format_args!("{:?}", d)),
            Value::Float64(v) => serializer.serialize_f64(*v),
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::String(s) => serializer.serialize_str(s),
            Value::Time(t) => t.serialize(serializer),
            Value::Uint64(v) => serializer.serialize_u64(*v),
            Value::Group(attrs) => {
                let mut map = serializer.serialize_map(Some(attrs.len()))?;
                for attr in attrs {
                    map.serialize_entry(&attr.key, &attr.value)?;
                }
                map.end()
            }
            Value::LogValuer(_) => self.clone().resolve().serialize(serializer),
            Value::Any(a) => serializer.collect_str(&format_args!("{:?}", a)),
        }
    }
}

macro_rules! value_from {
    ($variant:ident, $target:ty; $($source:ty),+) => {
        $(
            impl From<$source> for Value {
                fn from(v: $source) -> Self {
                    Value::$variant(v as $target)
                }
            }
        )+
    };
}

value_from!(Int64, i64; i8, i16, i32, i64, isize);
value_from!(Uint64, u64; u8, u16, u32, u64, usize);
value_from!(Float64, f64; f32, f64);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Value::Duration(d)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(t: DateTime<Tz>) -> Self {
        Value::Time(to_fixed(&t))
    }
}

impl From<Vec<Attr>> for Value {
    fn from(attrs: Vec<Attr>) -> Self {
        Value::Group(attrs)
    }
}

pub(crate) fn to_fixed<Tz: TimeZone>(t: &DateTime<Tz>) -> DateTime<FixedOffset> {
    let offset = t.offset().fix();
    t.with_timezone(&offset)
}

/// A keyed attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Attr {
            key: key.into(),
            value: value.into(),
        }
    }

    /// A group attribute. Its members are flattened under `key`.
    pub fn group(key: impl Into<String>, attrs: impl IntoIterator<Item = Attr>) -> Self {
        Attr {
            key: key.into(),
            value: Value::group(attrs),
        }
    }

    pub fn any<T: AnyValue>(key: impl Into<String>, value: T) -> Self {
        Attr {
            key: key.into(),
            value: Value::any(value),
        }
    }

    pub fn valuer<V: LogValuer>(key: impl Into<String>, valuer: V) -> Self {
        Attr {
            key: key.into(),
            value: Value::valuer(valuer),
        }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
