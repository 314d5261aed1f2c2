use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use crate::context::Context;
use crate::error::FnError;

/// A native function body. It drives the argument stream of the context it
/// runs on and yields results back through it.
pub type NativeFn = dyn Fn(&Arc<Context>) -> Result<(), FnError> + Send + Sync;

static FUNCTION_ID: AtomicU64 = AtomicU64::new(0);

/// A callable value: a native closure plus a debug name and a unique id.
///
/// Functions carry no arity or signature; the callee enforces whatever it
/// wants by reading from its own argument stream.
pub struct Function {
    id: u64,
    name: String,
    func: Box<NativeFn>,
}

impl Function {
    pub fn new(f: impl Fn(&Arc<Context>) -> Result<(), FnError> + Send + Sync + 'static) -> Self {
        Function {
            id: FUNCTION_ID.fetch_add(1, AtomicOrdering::Relaxed) + 1,
            name: String::new(),
            func: Box::new(f),
        }
    }

    pub fn with_name(
        f: impl Fn(&Arc<Context>) -> Result<(), FnError> + Send + Sync + 'static,
        name: impl Into<String>,
    ) -> Self {
        let mut func = Function::new(f);
        func.name = name.into();
        func
    }

    pub fn exec(&self, ctx: &Arc<Context>) -> Result<(), FnError> {
        (self.func)(ctx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function: {}>", self.label())
    }
}

impl Function {
    // Includes the id so distinct functions never print alike, keeping
    // print equality aligned with function identity.
    fn label(&self) -> String {
        if self.name.is_empty() {
            format!("#{}", self.id)
        } else {
            format!("{}#{}", self.name, self.id)
        }
    }
}

/// The runtime value: a tagged union whose canonical printed form defines
/// both display and equality.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(Arc<str>),
    Symbol(Arc<str>),
    Atom(Arc<str>),
    List(Arc<Vec<Value>>),
    Map(Arc<BTreeMap<Value, Value>>),
    Function(Arc<Function>),
}

impl Value {
    pub fn int(v: i64) -> Value {
        Value::Int(v)
    }

    pub fn float(v: f64) -> Value {
        Value::Float(v)
    }

    pub fn string(v: impl AsRef<str>) -> Value {
        Value::String(Arc::from(v.as_ref()))
    }

    pub fn symbol(v: impl AsRef<str>) -> Value {
        Value::Symbol(Arc::from(v.as_ref()))
    }

    pub fn atom(v: impl AsRef<str>) -> Value {
        Value::Atom(Arc::from(v.as_ref()))
    }

    pub fn list(v: Vec<Value>) -> Value {
        Value::List(Arc::new(v))
    }

    pub fn map(v: BTreeMap<Value, Value>) -> Value {
        Value::Map(Arc::new(v))
    }

    pub fn function(f: Function) -> Value {
        Value::Function(Arc::new(f))
    }

    /// The `:nil` atom.
    pub fn nil() -> Value {
        Value::atom(":nil")
    }

    /// The `:true` / `:false` atoms.
    pub fn truth(v: bool) -> Value {
        if v {
            Value::atom(":true")
        } else {
            Value::atom(":false")
        }
    }

    /// A `{:error "<message>"}` map, the inline form a runtime error takes
    /// when it surfaces inside an output stream.
    pub fn error_map(err: &FnError) -> Value {
        let mut entries = BTreeMap::new();
        entries.insert(Value::atom(":error"), Value::string(err.to_string()));
        Value::map(entries)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => ":int",
            Value::Float(_) => ":float",
            Value::String(_) => ":string",
            Value::Symbol(_) => ":symbol",
            Value::Atom(_) => ":atom",
            Value::List(_) => ":list",
            Value::Map(_) => ":map",
            Value::Function(_) => ":func",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Atom(a) if a.as_ref() == ":nil")
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The name a binding form sees: symbols, atoms and strings all name
    /// their raw text.
    pub fn symbol_name(&self) -> Option<&str> {
        match self {
            Value::Symbol(s) | Value::Atom(s) | Value::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<Value, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Arc<Function>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    fn tag_rank(&self) -> u8 {
        match self {
            Value::Int(_) => 0,
            Value::Float(_) => 1,
            Value::String(_) => 2,
            Value::Symbol(_) => 3,
            Value::Atom(_) => 4,
            Value::List(_) => 5,
            Value::Map(_) => 6,
            Value::Function(_) => 7,
        }
    }

    fn function_id(&self) -> u64 {
        match self {
            Value::Function(f) => f.id,
            _ => 0,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Symbol(s) | Value::Atom(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{k} {v}")?;
                }
                write!(f, "}}")
            }
            Value::Function(func) => write!(f, "<function: {}>", func.label()),
        }
    }
}

// Equality is canonical-print equality within a tag. Two values of
// different tags are never equal even when they print alike (3 vs 3.0),
// and two distinct functions are never equal.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Atom(a), Value::Atom(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.id == b.id,
            (a, b) => a.tag_rank() == b.tag_rank() && a.to_string() == b.to_string(),
        }
    }
}

impl Eq for Value {}

// Total order consistent with equality: printed form first, then tag, then
// function identity. Map keys therefore iterate in canonical print order,
// which is exactly the order the printer needs.
impl Ord for Value {
    fn cmp(&self, other: &Value) -> Ordering {
        self.to_string()
            .cmp(&other.to_string())
            .then_with(|| self.tag_rank().cmp(&other.tag_rank()))
            .then_with(|| self.function_id().cmp(&other.function_id()))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_print_scalars() {
        assert_eq!(Value::int(42).to_string(), "42");
        assert_eq!(Value::int(-7).to_string(), "-7");
        assert_eq!(Value::float(10.01).to_string(), "10.01");
        assert_eq!(Value::float(-9.61).to_string(), "-9.61");
        assert_eq!(Value::float(6.0 / 33.0).to_string(), "0.18181818181818182");
        assert_eq!(Value::string("hi").to_string(), "\"hi\"");
        assert_eq!(Value::atom(":nil").to_string(), ":nil");
        assert_eq!(Value::symbol("foo").to_string(), "foo");
    }

    #[test]
    fn canonical_print_collections() {
        let list = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
        assert_eq!(list.to_string(), "[1 2 3]");
        assert_eq!(Value::list(vec![]).to_string(), "[]");

        let mut entries = BTreeMap::new();
        entries.insert(Value::atom(":b"), Value::int(2));
        entries.insert(Value::atom(":a"), Value::int(1));
        // keys come out sorted by printed form regardless of insertion order
        assert_eq!(Value::map(entries).to_string(), "{:a 1 :b 2}");
    }

    #[test]
    fn equality_is_print_equality_within_tag() {
        assert_eq!(Value::int(1), Value::int(1));
        assert_ne!(Value::int(1), Value::int(2));
        assert_eq!(Value::atom(":true"), Value::truth(true));
        assert_ne!(Value::int(3), Value::float(3.0));
        assert_ne!(Value::symbol("x"), Value::atom("x"));

        let a = Value::list(vec![Value::int(1), Value::atom(":a")]);
        let b = Value::list(vec![Value::int(1), Value::atom(":a")]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn distinct_functions_never_equal() {
        let a = Value::function(Function::new(|_| Ok(())));
        let b = Value::function(Function::new(|_| Ok(())));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn error_map_prints_message() {
        let v = Value::error_map(&FnError::user("boom"));
        assert_eq!(v.to_string(), "{:error \"boom\"}");
    }

    #[test]
    fn numeric_accessors_widen() {
        assert_eq!(Value::int(3).as_float(), Some(3.0));
        assert_eq!(Value::float(3.9).as_int(), Some(3));
        assert_eq!(Value::atom(":a").as_int(), None);
    }
}
