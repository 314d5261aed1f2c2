use std::collections::BTreeMap;
use std::sync::Arc;

use fnlang_core::{spawn_exec, Context, FnError, Function, Value};
use fnlang_reader::{parse, Node, NodeKind};

/// The interpreter owns the root scope with the stdlib registered.
pub struct Interpreter {
    root: Arc<Context>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let root = Context::root();
        fnlang_stdlib::register_stdlib(&root);
        Interpreter { root }
    }

    pub fn root(&self) -> &Arc<Context> {
        &self.root
    }

    /// Register a native builtin in the root scope.
    pub fn defn(
        &self,
        name: &str,
        f: impl Fn(&Arc<Context>) -> Result<(), FnError> + Send + Sync + 'static,
    ) {
        self.root.defn(name, f);
    }

    /// Evaluate one tree, returning the evaluation context together with
    /// every top-level value it yielded, in source order. Runtime errors
    /// inside expressions surface as inline {:error ...} values; only
    /// failures that prevent producing anything at all return `Err`.
    pub fn eval(&self, node: &Node) -> Result<(Arc<Context>, Vec<Value>), FnError> {
        let ctx = Context::new(&self.root, "eval");
        let node = node.clone();
        let runner = Function::with_name(move |ctx: &Arc<Context>| eval_node(ctx, &node), "eval");
        let done = spawn_exec(Arc::clone(&ctx), Arc::new(runner));
        let values = ctx.collect();
        match done.recv() {
            Ok(Err(err)) => Err(err),
            _ => Ok((ctx, values)),
        }
    }

    pub fn eval_str(&self, source: &str) -> Result<Vec<Value>, FnError> {
        let root = parse(source)?;
        self.eval(&root).map(|(_, values)| values)
    }
}

/// Evaluate one AST node into `ctx`, yielding its value(s) there.
pub fn eval_node(ctx: &Arc<Context>, node: &Node) -> Result<(), FnError> {
    if ctx.is_closed() {
        return Ok(());
    }

    if node.is_value() {
        ctx.yield_value(leaf_value(node));
        return Ok(());
    }

    match node.kind() {
        // [ ... ] — a child scope with its own table; elements evaluate
        // left to right and collect into one list value.
        NodeKind::List(children) => {
            let child = Context::new(ctx, "list");
            let done = spawn_eval_list(&child, children.to_vec(), "list");
            let values = child.collect();
            ctx.yield_value(Value::list(values));
            match done.recv() {
                Ok(Err(err)) => runtime_error(ctx, node, err),
                _ => Ok(()),
            }
        }

        // { ... } — a closure scope; consecutive outputs pair into
        // key/value entries, an odd trailing key binds :nil.
        NodeKind::Map(children) => {
            let child = Context::closure(ctx, "map");
            let done = spawn_eval_list(&child, children.to_vec(), "map");
            let mut entries = BTreeMap::new();
            let mut pending: Option<Value> = None;
            while let Ok(value) = child.output() {
                match pending.take() {
                    None => {
                        entries.insert(value.clone(), Value::nil());
                        pending = Some(value);
                    }
                    Some(key) => {
                        entries.insert(key, value);
                    }
                }
            }
            ctx.yield_value(Value::map(entries));
            match done.recv() {
                Ok(Err(err)) => runtime_error(ctx, node, err),
                _ => Ok(()),
            }
        }

        // ( ... ) — phase A evaluates the children verbatim in a
        // non-executable closure; phase B wraps them in a thunk, which is
        // driven right here when the surrounding context is executable and
        // yielded as a value when it is not.
        NodeKind::Expression(children) => {
            let child = Context::closure(ctx, "expr-eval");
            child.set_executable(false);
            let done = spawn_eval_list(&child, children.to_vec(), "expr-eval");
            let values = child.collect();
            if let Ok(Err(err)) = done.recv() {
                return runtime_error(ctx, node, err);
            }

            let thunk = Arc::new(prepare_func(values));
            if !ctx.is_executable() {
                ctx.yield_value(Value::Function(thunk));
                return Ok(());
            }

            let exec_ctx = Context::new(ctx, "expr-exec");
            let done = spawn_exec(Arc::clone(&exec_ctx), thunk);
            let mut values = exec_ctx.collect();
            if let Ok(Err(err)) = done.recv() {
                return runtime_error(ctx, node, err);
            }
            if values.len() == 1 {
                ctx.yield_value(values.remove(0));
            } else {
                ctx.yield_value(Value::list(values));
            }
            Ok(())
        }

        _ => Ok(()),
    }
}

pub(crate) fn eval_node_list(ctx: &Arc<Context>, nodes: &[Node]) -> Result<(), FnError> {
    for node in nodes {
        eval_node(ctx, node)?;
    }
    Ok(())
}

fn spawn_eval_list(
    ctx: &Arc<Context>,
    nodes: Vec<Node>,
    name: &'static str,
) -> std::sync::mpsc::Receiver<Result<(), FnError>> {
    let runner = Function::with_name(
        move |ctx: &Arc<Context>| eval_node_list(ctx, &nodes),
        name,
    );
    spawn_exec(Arc::clone(ctx), Arc::new(runner))
}

fn leaf_value(node: &Node) -> Value {
    match node.kind() {
        NodeKind::Int(n) => Value::Int(*n),
        NodeKind::Float(f) => Value::Float(*f),
        NodeKind::String(s) => Value::string(s),
        NodeKind::Symbol(s) => Value::symbol(s),
        NodeKind::Atom(s) => Value::atom(s),
        _ => Value::nil(),
    }
}

/// Phase B of expression evaluation: capture the phase-A values in a
/// function that dispatches on the head when executed.
fn prepare_func(values: Vec<Value>) -> Function {
    Function::with_name(
        move |ctx: &Arc<Context>| match values.split_first() {
            None => {
                ctx.yield_value(Value::nil());
                Ok(())
            }
            Some((head, rest)) => exec_expr(ctx, head, rest),
        },
        "expr",
    )
}

/// Apply `head` to `rest` inside `ctx`.
fn exec_expr(ctx: &Arc<Context>, head: &Value, rest: &[Value]) -> Result<(), FnError> {
    match head {
        Value::Int(_) | Value::Float(_) | Value::String(_) => {
            ctx.yield_value(head.clone());
            Ok(())
        }

        // A bound atom behaves like its binding; an unbound atom is
        // self-evaluating as long as nothing is applied to it.
        Value::Atom(name) => match ctx.get(name) {
            Some(Value::Function(func)) => exec_func(ctx, &func, rest.to_vec()),
            Some(bound) => exec_expr(ctx, &bound, rest),
            None if rest.is_empty() => {
                ctx.yield_value(head.clone());
                Ok(())
            }
            None => Err(FnError::eval(format!("invalid expression: {head}"))),
        },

        Value::Symbol(name) => {
            let bound = ctx
                .get(name)
                .ok_or_else(|| FnError::Unbound(name.to_string()))?;
            match bound {
                Value::Function(func) => exec_func(ctx, &func, rest.to_vec()),
                other => exec_expr(ctx, &other, rest),
            }
        }

        // A list head treats the arguments as an integer index path.
        Value::List(_) => {
            ctx.yield_value(list_item(head, rest));
            Ok(())
        }

        // A map head treats the arguments as a key path.
        Value::Map(_) => {
            ctx.yield_value(map_element(head, rest));
            Ok(())
        }

        // A function head is dereferenced by executing it with no
        // arguments, then applying its result.
        Value::Function(func) => {
            let target = deref_func(ctx, func)?;
            match target {
                Value::Function(inner) => exec_func(ctx, &inner, rest.to_vec()),
                other => exec_expr(ctx, &other, rest),
            }
        }
    }
}

/// Apply a function: a driver task feeds it one argument per accept
/// signal, closing the stream when the arguments run out or the callee
/// stops pulling; the callee runs on the current task.
fn exec_func(ctx: &Arc<Context>, func: &Arc<Function>, args: Vec<Value>) -> Result<(), FnError> {
    let driver = Arc::clone(ctx);
    std::thread::spawn(move || {
        for arg in args {
            if !driver.accept() {
                break;
            }
            if driver.push(arg).is_err() {
                break;
            }
        }
        driver.close();
    });
    func.exec(ctx)
}

/// Execute a function with no arguments and take its single result.
fn deref_func(ctx: &Arc<Context>, func: &Arc<Function>) -> Result<Value, FnError> {
    let child = Context::new(ctx, "deref-exec");
    let done = spawn_exec(Arc::clone(&child), Arc::clone(func));
    let mut values = child.collect();
    if let Ok(Err(err)) = done.recv() {
        return Err(err);
    }
    if values.len() != 1 {
        return Err(FnError::eval("unexpected result"));
    }
    Ok(values.remove(0))
}

/// Walk an integer index path through nested lists; anything out of range
/// or non-integer is :nil.
fn list_item(value: &Value, path: &[Value]) -> Value {
    let mut current = value.clone();
    for key in path {
        let index = match key {
            Value::Int(n) if *n >= 0 => *n as usize,
            _ => return Value::nil(),
        };
        current = match &current {
            Value::List(items) => match items.get(index) {
                Some(item) => item.clone(),
                None => return Value::nil(),
            },
            _ => return Value::nil(),
        };
    }
    current
}

/// Walk a key path through nested maps; a missing key is :nil.
fn map_element(value: &Value, path: &[Value]) -> Value {
    let mut current = value.clone();
    for key in path {
        current = match &current {
            Value::Map(entries) => match entries.get(key) {
                Some(item) => item.clone(),
                None => return Value::nil(),
            },
            _ => return Value::nil(),
        };
    }
    current
}

/// Surface a runtime error at the failing node: log the position and the
/// offending source, yield an inline {:error ...} map, record the exit
/// status — and keep the surrounding evaluation going.
fn runtime_error(ctx: &Arc<Context>, node: &Node, err: FnError) -> Result<(), FnError> {
    let span = node.span();
    tracing::error!(
        line = span.line,
        col = span.col,
        source = %node.encode(),
        "runtime error: {err}"
    );
    ctx.yield_value(Value::error_map(&err));
    ctx.set_exit_status(err);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_item_walks_an_index_path() {
        let inner = Value::list(vec![Value::int(4), Value::int(5)]);
        let list = Value::list(vec![Value::int(1), Value::int(2), inner]);
        assert_eq!(list_item(&list, &[Value::int(0)]), Value::int(1));
        assert_eq!(
            list_item(&list, &[Value::int(2), Value::int(1)]),
            Value::int(5)
        );
        assert_eq!(list_item(&list, &[Value::int(9)]), Value::nil());
        assert_eq!(list_item(&list, &[Value::atom(":a")]), Value::nil());
        assert_eq!(list_item(&list, &[Value::int(-1)]), Value::nil());
    }

    #[test]
    fn map_element_walks_a_key_path() {
        let mut inner = BTreeMap::new();
        inner.insert(Value::atom(":a"), Value::int(2));
        let mut outer = BTreeMap::new();
        outer.insert(Value::atom(":a"), Value::int(1));
        outer.insert(Value::atom(":b"), Value::map(inner));
        let map = Value::map(outer);

        assert_eq!(map_element(&map, &[Value::atom(":a")]), Value::int(1));
        assert_eq!(
            map_element(&map, &[Value::atom(":b"), Value::atom(":a")]),
            Value::int(2)
        );
        assert_eq!(map_element(&map, &[Value::atom(":zzz")]), Value::nil());
        assert_eq!(
            map_element(&map, &[Value::atom(":a"), Value::atom(":b")]),
            Value::nil()
        );
    }
}
