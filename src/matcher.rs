use crate::value::{to_fixed, AnyValue, Kind, Value};
use chrono::{DateTime, FixedOffset, TimeZone};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Predicate over a value of a specific kind.
#[derive(Clone)]
pub enum TypedPredicate {
    Bool(Arc<dyn Fn(bool) -> bool + Send + Sync>),
    Duration(Arc<dyn Fn(Duration) -> bool + Send + Sync>),
    Float64(Arc<dyn Fn(f64) -> bool + Send + Sync>),
    Int64(Arc<dyn Fn(i64) -> bool + Send + Sync>),
    Uint64(Arc<dyn Fn(u64) -> bool + Send + Sync>),
    String(Arc<dyn Fn(&str) -> bool + Send + Sync>),
    Time(Arc<dyn Fn(&DateTime<FixedOffset>) -> bool + Send + Sync>),
    Any(Arc<dyn Fn(&dyn AnyValue) -> bool + Send + Sync>),
}

/// A concrete expected value.
#[derive(Clone)]
pub enum Literal {
    Bool(bool),
    Duration(Duration),
    Float64(f64),
    Int64(i64),
    Uint64(u64),
    /// An integer whose width is not pinned down, as written in a test.
    /// Matches `Int64`, `Uint64` and `Float64` values of the same magnitude.
    Integer(i128),
    String(String),
    Time(DateTime<FixedOffset>),
    Any(Arc<dyn AnyValue>),
}

/// Expectation for a single attribute value.
///
/// Built with the `From` conversions for literals (`"text"`, `200`,
/// `true`, `Duration::from_secs(1)`, ...) or with the predicate
/// constructors such as [`Matcher::str`] and [`Matcher::value`].
#[derive(Clone)]
pub enum Matcher {
    /// Predicate on the value as stored, whatever its kind.
    Value(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
    Typed(TypedPredicate),
    Literal(Literal),
}

/// Result of comparing one matcher against one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched,
    NotMatched,
    /// The matcher cannot be applied to values of `kind`.
    InvalidMatcherType { kind: Kind, matcher: &'static str },
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched)
    }
}

impl From<bool> for MatchOutcome {
    fn from(matched: bool) -> Self {
        if matched {
            MatchOutcome::Matched
        } else {
            MatchOutcome::NotMatched
        }
    }
}

impl Matcher {
    pub fn value<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Matcher::Value(Arc::new(f))
    }

    pub fn bool<F>(f: F) -> Self
    where
        F: Fn(bool) -> bool + Send + Sync + 'static,
    {
        Matcher::Typed(TypedPredicate::Bool(Arc::new(f)))
    }

    pub fn duration<F>(f: F) -> Self
    where
        F: Fn(Duration) -> bool + Send + Sync + 'static,
    {
        Matcher::Typed(TypedPredicate::Duration(Arc::new(f)))
    }

    pub fn f64<F>(f: F) -> Self
    where
        F: Fn(f64) -> bool + Send + Sync + 'static,
    {
        Matcher::Typed(TypedPredicate::Float64(Arc::new(f)))
    }

    pub fn i64<F>(f: F) -> Self
    where
        F: Fn(i64) -> bool + Send + Sync + 'static,
    {
        Matcher::Typed(TypedPredicate::Int64(Arc::new(f)))
    }

    pub fn u64<F>(f: F) -> Self
    where
        F: Fn(u64) -> bool + Send + Sync + 'static,
    {
        Matcher::Typed(TypedPredicate::Uint64(Arc::new(f)))
    }

    pub fn str<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Matcher::Typed(TypedPredicate::String(Arc::new(f)))
    }

    pub fn time<F>(f: F) -> Self
    where
        F: Fn(&DateTime<FixedOffset>) -> bool + Send + Sync + 'static,
    {
        Matcher::Typed(TypedPredicate::Time(Arc::new(f)))
    }

    /// Predicate on an uninterpreted value.
    pub fn any<F>(f: F) -> Self
    where
        F: Fn(&dyn AnyValue) -> bool + Send + Sync + 'static,
    {
        Matcher::Typed(TypedPredicate::Any(Arc::new(f)))
    }

    /// Equality with an uninterpreted value of the same concrete type.
    pub fn any_eq<T: AnyValue>(value: T) -> Self {
        Matcher::Literal(Literal::Any(Arc::new(value)))
    }

    fn describe(&self) -> &'static str {
        match self {
            Matcher::Value(_) => "value predicate",
            Matcher::Typed(p) => match p {
                TypedPredicate::Bool(_) => "bool predicate",
                TypedPredicate::Duration(_) => "duration predicate",
                TypedPredicate::Float64(_) => "f64 predicate",
                TypedPredicate::Int64(_) => "i64 predicate",
                TypedPredicate::Uint64(_) => "u64 predicate",
                TypedPredicate::String(_) => "str predicate",
                TypedPredicate::Time(_) => "time predicate",
                TypedPredicate::Any(_) => "any predicate",
            },
            Matcher::Literal(l) => match l {
                Literal::Bool(_) => "bool literal",
                Literal::Duration(_) => "duration literal",
                Literal::Float64(_) => "f64 literal",
                Literal::Int64(_) => "i64 literal",
                Literal::Uint64(_) => "u64 literal",
                Literal::Integer(_) => "integer literal",
                Literal::String(_) => "string literal",
                Literal::Time(_) => "time literal",
                Literal::Any(_) => "any literal",
            },
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Literal(Literal::Bool(v)) => write!(f, "Literal({:?})", v),
            Matcher::Literal(Literal::Duration(v)) => write!(f, "Literal({:?})", v),
            Matcher::Literal(Literal::Float64(v)) => write!(f, "Literal({:?})", v),
            Matcher::Literal(Literal::Int64(v)) => write!(f, "Literal({:?})", v),
            Matcher::Literal(Literal::Uint64(v)) => write!(f, "Literal({:?})", v),
            Matcher::Literal(Literal::Integer(v)) => write!(f, "Literal({:?})", v),
            Matcher::Literal(Literal::String(v)) => write!(f, "Literal({:?})", v),
            Matcher::Literal(Literal::Time(v)) => write!(f, "Literal({:?})", v),
            Matcher::Literal(Literal::Any(v)) => write!(f, "Literal({:?})", v),
            other => write!(f, "<{}>", other.describe()),
        }
    }
}

macro_rules! matcher_from {
    ($variant:ident, $target:ty; $($source:ty),+) => {
        $(
            impl From<$source> for Matcher {
                fn from(v: $source) -> Self {
                    Matcher::Literal(Literal::$variant(v as $target))
                }
            }
        )+
    };
}

matcher_from!(Integer, i128; i8, i16, i32, isize, u8, u16, u32, usize);
matcher_from!(Int64, i64; i64);
matcher_from!(Uint64, u64; u64);
matcher_from!(Float64, f64; f32, f64);

impl From<bool> for Matcher {
    fn from(b: bool) -> Self {
        Matcher::Literal(Literal::Bool(b))
    }
}

impl From<&str> for Matcher {
    fn from(s: &str) -> Self {
        Matcher::Literal(Literal::String(s.to_string()))
    }
}

impl From<String> for Matcher {
    fn from(s: String) -> Self {
        Matcher::Literal(Literal::String(s))
    }
}

impl From<Duration> for Matcher {
    fn from(d: Duration) -> Self {
        Matcher::Literal(Literal::Duration(d))
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Matcher {
    fn from(t: DateTime<Tz>) -> Self {
        Matcher::Literal(Literal::Time(to_fixed(&t)))
    }
}

impl From<Literal> for Matcher {
    fn from(literal: Literal) -> Self {
        Matcher::Literal(literal)
    }
}

impl From<TypedPredicate> for Matcher {
    fn from(predicate: TypedPredicate) -> Self {
        Matcher::Typed(predicate)
    }
}

/// Compare `value` against `matcher`.
///
/// Lazily computed values are resolved first. Predicates on [`Value`] apply
/// to every kind; typed predicates and literals only apply to their own
/// kind, except that integer literals also compare against the other
/// numeric kinds and any literal can be compared with an uninterpreted
/// value of the same concrete type.
pub fn match_attr(matcher: &Matcher, value: &Value) -> MatchOutcome {
    if let Value::LogValuer(_) = value {
        return match_attr(matcher, &value.clone().resolve());
    }

    let matched = match matcher {
        Matcher::Value(f) => f(value),
        Matcher::Typed(predicate) => match (predicate, value) {
            (TypedPredicate::Bool(f), Value::Bool(b)) => f(*b),
            (TypedPredicate::Duration(f), Value::Duration(d)) => f(*d),
            (TypedPredicate::Float64(f), Value::Float64(v)) => f(*v),
            (TypedPredicate::Int64(f), Value::Int64(v)) => f(*v),
            (TypedPredicate::Uint64(f), Value::Uint64(v)) => f(*v),
            (TypedPredicate::String(f), Value::String(s)) => f(s.as_str()),
            (TypedPredicate::Time(f), Value::Time(t)) => f(t),
            (TypedPredicate::Any(f), Value::Any(a)) => f(a.as_ref()),
            _ => return invalid(matcher, value),
        },
        Matcher::Literal(literal) => match (literal, value) {
            (Literal::Bool(expected), Value::Bool(b)) => expected == b,
            (Literal::Duration(expected), Value::Duration(d)) => expected == d,
            (Literal::Float64(expected), Value::Float64(v)) => expected == v,
            (Literal::Int64(expected), Value::Int64(v)) => expected == v,
            (Literal::Uint64(expected), Value::Uint64(v)) => expected == v,
            (Literal::Integer(expected), Value::Int64(v)) => *expected == i128::from(*v),
            (Literal::Integer(expected), Value::Uint64(v)) => *expected == i128::from(*v),
            (Literal::Integer(expected), Value::Float64(v)) => integer_equals_float(*expected, *v),
            (Literal::String(expected), Value::String(s)) => expected == s,
            // DateTime equality compares instants, not offsets.
            (Literal::Time(expected), Value::Time(t)) => expected == t,
            (literal, Value::Any(a)) => literal_equals_any(literal, a.as_ref()),
            _ => return invalid(matcher, value),
        },
    };

    matched.into()
}

/// Exact comparison: the float must be integral and convert back to `n`.
fn integer_equals_float(n: i128, v: f64) -> bool {
    let bound = -(i128::MIN as f64);
    v.fract() == 0.0 && v >= -bound && v < bound && v as i128 == n
}

fn invalid(matcher: &Matcher, value: &Value) -> MatchOutcome {
    MatchOutcome::InvalidMatcherType {
        kind: value.kind(),
        matcher: matcher.describe(),
    }
}

fn literal_equals_any(literal: &Literal, any: &dyn AnyValue) -> bool {
    match literal {
        Literal::Bool(b) => any.eq_any(b),
        Literal::Duration(d) => any.eq_any(d),
        Literal::Float64(f) => any.eq_any(f),
        Literal::Int64(i) => any.eq_any(i),
        Literal::Uint64(u) => any.eq_any(u),
        Literal::Integer(n) => {
            i32::try_from(*n).map_or(false, |n| any.eq_any(&n))
                || i64::try_from(*n).map_or(false, |n| any.eq_any(&n))
                || u64::try_from(*n).map_or(false, |n| any.eq_any(&n))
        }
        Literal::String(s) => any.eq_any(s),
        Literal::Time(t) => any.eq_any(t),
        Literal::Any(expected) => expected.eq_any(any),
    }
}
