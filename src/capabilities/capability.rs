//! Capability members: the unit of network-reachable functionality.
//!
//! A capability surface declares a flat list of [`Member`]s. Each member is
//! either a readable value or an invocable function with an ordered parameter
//! signature. The registry filters members down to [`CapabilityEntry`]s once at
//! startup; request handling never inspects the surface again.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::dispatch::request::RequestContext;

/// Reads the current value of a value member. `None` renders as an empty body.
pub type ValueFn = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Invokes a function member with its bound arguments.
///
/// Errors are invocation faults: the dispatcher never recovers them.
pub type InvokeFn = Arc<dyn Fn(&mut Arguments) -> anyhow::Result<Option<String>> + Send + Sync>;

/// Declared accessibility of a surface member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Plain public member; reachable over HTTP.
    Public,
    /// Anything narrower than public (crate-private plumbing and the like).
    Internal,
}

/// Declared type of a function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// The per-request context. Bound directly, never read from the request.
    Context,
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
}

impl ParamType {
    /// Coerce raw request text into this type.
    ///
    /// Returns `None` when the text does not convert; the caller binds null
    /// in that case instead of failing the request.
    pub fn coerce(&self, raw: &str) -> Option<Arg> {
        match self {
            Self::Context => None,
            Self::Text => Some(Arg::Text(raw.to_string())),
            Self::Integer => raw.trim().parse().ok().map(Arg::Integer),
            Self::Float => raw.trim().parse().ok().map(Arg::Float),
            Self::Boolean => {
                let raw = raw.trim();
                if raw.eq_ignore_ascii_case("true") {
                    Some(Arg::Boolean(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Some(Arg::Boolean(false))
                } else {
                    None
                }
            }
            Self::DateTime => parse_date_time(raw.trim()).map(Arg::DateTime),
        }
    }
}

/// Accepted date-time layouts besides RFC 3339. The `%H:%M` form is what an
/// HTML `datetime-local` input submits.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_local());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// A typed argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => write!(f, "{}", value),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", value),
            Self::Boolean(value) => write!(f, "{}", value),
            Self::DateTime(value) => write!(f, "{}", value),
        }
    }
}

/// One parameter of an invocable member.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// Parameter name, matched exactly against query and form keys.
    pub name: String,
    pub ty: ParamType,
    /// Declared default, used when the request does not carry the parameter.
    pub default: Option<Arg>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    /// A parameter that receives the request context.
    pub fn context(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Context)
    }

    pub fn with_default(mut self, default: Arg) -> Self {
        self.default = Some(default);
        self
    }
}

/// A bound argument slot, in parameter order.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// The request context was bound here.
    Context,
    /// A coerced value, a default, or `None` for absent / failed coercion.
    Value(Option<Arg>),
}

/// Arguments handed to an invocable member.
#[derive(Debug)]
pub struct Arguments {
    names: Vec<String>,
    slots: Vec<Slot>,
    context: Option<RequestContext>,
}

impl Arguments {
    pub(crate) fn new(names: Vec<String>, slots: Vec<Slot>, context: Option<RequestContext>) -> Self {
        Self {
            names,
            slots,
            context,
        }
    }

    /// Bound slots in declaration order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Value bound to `name`, or `None` if absent or not coercible.
    pub fn get(&self, name: &str) -> Option<&Arg> {
        let position = self.names.iter().position(|n| n == name)?;
        match &self.slots[position] {
            Slot::Value(value) => value.as_ref(),
            Slot::Context => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            Arg::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Arg::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            Arg::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Arg::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn date_time(&self, name: &str) -> Option<NaiveDateTime> {
        match self.get(name)? {
            Arg::DateTime(value) => Some(*value),
            _ => None,
        }
    }

    /// The request context, present only when the member declared a
    /// [`ParamType::Context`] parameter.
    pub fn context_mut(&mut self) -> Option<&mut RequestContext> {
        self.context.as_mut()
    }

    pub(crate) fn into_context(self) -> Option<RequestContext> {
        self.context
    }
}

/// What a member does when addressed.
#[derive(Clone)]
pub enum MemberKind {
    /// Readable value (field or property).
    Value(ValueFn),
    /// Invocable function with an ordered signature.
    Invocable {
        params: Vec<ParameterSpec>,
        call: InvokeFn,
    },
}

impl MemberKind {
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    pub fn params(&self) -> &[ParameterSpec] {
        match self {
            Self::Value(_) => &[],
            Self::Invocable { params, .. } => params,
        }
    }
}

impl fmt::Debug for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Value"),
            Self::Invocable { params, .. } => {
                f.debug_struct("Invocable").field("params", params).finish()
            }
        }
    }
}

/// A member as declared by a capability surface, before filtering.
#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    pub visibility: Visibility,
    /// Compiler- or macro-generated plumbing (backing accessors and such).
    pub synthesized: bool,
    pub kind: MemberKind,
}

impl Member {
    /// A public value member.
    pub fn value<F>(name: impl Into<String>, read: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            synthesized: false,
            kind: MemberKind::Value(Arc::new(read)),
        }
    }

    /// A public invocable member.
    pub fn function<F>(name: impl Into<String>, params: Vec<ParameterSpec>, call: F) -> Self
    where
        F: Fn(&mut Arguments) -> anyhow::Result<Option<String>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            synthesized: false,
            kind: MemberKind::Invocable {
                params,
                call: Arc::new(call),
            },
        }
    }

    pub fn internal(mut self) -> Self {
        self.visibility = Visibility::Internal;
        self
    }

    pub fn synthesized(mut self) -> Self {
        self.synthesized = true;
        self
    }

    /// Whether the member belongs on the network surface.
    pub fn is_exposed(&self) -> bool {
        self.visibility == Visibility::Public && !self.synthesized
    }
}

/// A registered, routable member. Immutable after startup.
#[derive(Debug, Clone)]
pub struct CapabilityEntry {
    /// Declared name, case preserved.
    pub name: String,
    pub kind: MemberKind,
}

impl CapabilityEntry {
    /// Request path for this entry, with the name case preserved.
    pub fn route(&self) -> String {
        format!("/{}", self.name)
    }

    /// Lowercase lookup key (`/<name>`).
    pub fn route_key(&self) -> String {
        self.route().to_lowercase()
    }
}

impl From<Member> for CapabilityEntry {
    fn from(member: Member) -> Self {
        Self {
            name: member.name,
            kind: member.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_text_is_verbatim() {
        assert_eq!(
            ParamType::Text.coerce(" Ada "),
            Some(Arg::Text(" Ada ".to_string()))
        );
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(ParamType::Integer.coerce(" 42"), Some(Arg::Integer(42)));
        assert_eq!(ParamType::Integer.coerce("notanumber"), None);
        assert_eq!(ParamType::Integer.coerce("4.5"), None);
        assert_eq!(ParamType::Float.coerce("4.5"), Some(Arg::Float(4.5)));
        assert_eq!(ParamType::Float.coerce(""), None);
    }

    #[test]
    fn test_coerce_boolean_is_case_insensitive() {
        assert_eq!(ParamType::Boolean.coerce("TRUE"), Some(Arg::Boolean(true)));
        assert_eq!(ParamType::Boolean.coerce("false"), Some(Arg::Boolean(false)));
        assert_eq!(ParamType::Boolean.coerce("yes"), None);
    }

    #[test]
    fn test_coerce_date_time_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        for raw in [
            "2024-05-01T14:30",
            "2024-05-01T14:30:00",
            "2024-05-01 14:30:00",
            "2024-05-01T14:30:00+02:00",
        ] {
            assert_eq!(
                ParamType::DateTime.coerce(raw),
                Some(Arg::DateTime(expected)),
                "layout {raw}"
            );
        }

        let midnight = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            ParamType::DateTime.coerce("2024-05-01"),
            Some(Arg::DateTime(midnight))
        );
        assert_eq!(ParamType::DateTime.coerce("tomorrow"), None);
    }

    #[test]
    fn test_context_never_coerces() {
        assert_eq!(ParamType::Context.coerce("anything"), None);
    }

    #[test]
    fn test_member_exposure() {
        let public = Member::value("Version", || None);
        assert!(public.is_exposed());
        assert!(!Member::value("Secret", || None).internal().is_exposed());
        assert!(!Member::value("get_Version", || None)
            .synthesized()
            .is_exposed());
    }

    #[test]
    fn test_entry_routes() {
        let entry = CapabilityEntry::from(Member::value("FormTest", || None));
        assert_eq!(entry.route(), "/FormTest");
        assert_eq!(entry.route_key(), "/formtest");
    }

    #[test]
    fn test_arguments_accessors() {
        let args = Arguments::new(
            vec!["name".into(), "times".into(), "ctx".into()],
            vec![
                Slot::Value(Some(Arg::Text("Ada".into()))),
                Slot::Value(None),
                Slot::Context,
            ],
            None,
        );
        assert_eq!(args.text("name"), Some("Ada"));
        assert_eq!(args.integer("name"), None);
        assert_eq!(args.integer("times"), None);
        assert_eq!(args.get("ctx"), None);
        assert_eq!(args.get("missing"), None);
    }
}
