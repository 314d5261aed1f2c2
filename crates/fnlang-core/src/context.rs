use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::error::FnError;
use crate::symbol::SymbolTable;
use crate::value::{Function, Value};

static CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sender halves and terminal flags for one context. Blocking sends happen
/// on a clone taken out of the lock, never while holding it.
struct StreamState {
    in_tx: Option<SyncSender<Value>>,
    out_tx: Option<SyncSender<Value>>,
    accept_tx: Option<SyncSender<()>>,
    in_closed: bool,
    out_closed: bool,
}

/// One evaluation scope and, at the same time, one bidirectional stream.
///
/// The caller pushes argument values into `in` and reads results from
/// `out`; the callee pulls from `in` and writes to `out`. Both sides hold
/// the same `Arc<Context>` from their own threads. `in` and `out` are
/// rendezvous channels; `accept` has capacity 1 and carries the callee's
/// "ready for the next argument" signal, which is what gives the protocol
/// its backpressure: the caller's driver advances one push per signal, so
/// a callee that stops pulling stops the caller.
pub struct Context {
    id: u64,
    name: &'static str,
    parent: Option<Arc<Context>>,
    executable: AtomicBool,
    symbols: Arc<SymbolTable>,
    state: Mutex<StreamState>,
    in_rx: Mutex<Receiver<Value>>,
    out_rx: Mutex<Receiver<Value>>,
    accept_rx: Mutex<Receiver<()>>,
    last_argument: Mutex<Option<Value>>,
    exit_status: Mutex<Option<FnError>>,
}

impl Context {
    /// The root scope: executable, with a fresh symbol table and no parent.
    pub fn root() -> Arc<Context> {
        Context::build(None, "root", SymbolTable::new(), true)
    }

    /// A child scope owning a fresh symbol table chained to the parent's.
    pub fn new(parent: &Arc<Context>, name: &'static str) -> Arc<Context> {
        Context::build(
            Some(parent),
            name,
            SymbolTable::with_parent(Arc::clone(&parent.symbols)),
            parent.is_executable(),
        )
    }

    /// A closure scope: shares the parent's symbol table by reference, so
    /// bindings written here are visible to the parent.
    pub fn closure(parent: &Arc<Context>, name: &'static str) -> Arc<Context> {
        Context::build(
            Some(parent),
            name,
            Arc::clone(&parent.symbols),
            parent.is_executable(),
        )
    }

    fn build(
        parent: Option<&Arc<Context>>,
        name: &'static str,
        symbols: Arc<SymbolTable>,
        executable: bool,
    ) -> Arc<Context> {
        let (in_tx, in_rx) = mpsc::sync_channel(0);
        let (out_tx, out_rx) = mpsc::sync_channel(0);
        let (accept_tx, accept_rx) = mpsc::sync_channel(1);
        let ctx = Arc::new(Context {
            id: CONTEXT_ID.fetch_add(1, Ordering::Relaxed) + 1,
            name,
            parent: parent.map(Arc::clone),
            executable: AtomicBool::new(executable),
            symbols,
            state: Mutex::new(StreamState {
                in_tx: Some(in_tx),
                out_tx: Some(out_tx),
                accept_tx: Some(accept_tx),
                in_closed: false,
                out_closed: false,
            }),
            in_rx: Mutex::new(in_rx),
            out_rx: Mutex::new(out_rx),
            accept_rx: Mutex::new(accept_rx),
            last_argument: Mutex::new(None),
            exit_status: Mutex::new(None),
        });
        tracing::trace!(id = ctx.id, name, "context created");
        ctx
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&Arc<Context>> {
        self.parent.as_ref()
    }

    pub fn is_executable(&self) -> bool {
        self.executable.load(Ordering::SeqCst)
    }

    /// Flip whether `argument()` evaluates pulled values. Builtins toggle
    /// this between pulls (`set` takes its name verbatim, its value
    /// evaluated), so `argument()` reads the live flag every time.
    pub fn set_executable(&self, executable: bool) {
        self.executable.store(executable, Ordering::SeqCst);
    }

    // ── scope ─────────────────────────────────────────────────────

    pub fn get(&self, name: &str) -> Option<Value> {
        self.symbols.get(name)
    }

    pub fn set(&self, name: &str, value: Value) -> Result<(), FnError> {
        if !self.is_executable() {
            return Err(FnError::eval("cannot bind in a non-executable context"));
        }
        self.symbols.set(name, value);
        Ok(())
    }

    /// Register a native builtin under `name` in this scope. The body is
    /// wrapped so the context exits as soon as it returns, which is what
    /// lets a caller's `collect` terminate.
    pub fn defn(
        &self,
        name: &str,
        f: impl Fn(&Arc<Context>) -> Result<(), FnError> + Send + Sync + 'static,
    ) {
        let func = Function::with_name(
            move |ctx: &Arc<Context>| {
                let result = f(ctx);
                match &result {
                    Ok(()) => ctx.exit(None),
                    Err(err) => ctx.exit(Some(err.clone())),
                }
                result
            },
            name,
        );
        self.symbols.set(name, Value::function(func));
    }

    // ── caller surface ────────────────────────────────────────────

    /// Send one argument to the callee. Fails once `in` is closed.
    pub fn push(&self, value: Value) -> Result<(), FnError> {
        let tx = {
            let state = lock(&self.state);
            if state.in_closed {
                return Err(FnError::ChannelClosed);
            }
            state.in_tx.clone()
        };
        match tx {
            Some(tx) => tx.send(value).map_err(|_| FnError::ChannelClosed),
            None => Err(FnError::ChannelClosed),
        }
    }

    /// Signal end of arguments. Idempotent.
    pub fn close(&self) {
        let mut state = lock(&self.state);
        if state.in_closed {
            return;
        }
        state.in_closed = true;
        state.in_tx = None;
        state.accept_tx = None;
    }

    /// Read one result from the callee.
    pub fn output(&self) -> Result<Value, FnError> {
        lock(&self.out_rx).recv().map_err(|_| FnError::ChannelClosed)
    }

    /// Read results until the callee closes its output.
    pub fn collect(&self) -> Vec<Value> {
        let mut values = Vec::new();
        while let Ok(value) = self.output() {
            values.push(value);
        }
        values
    }

    /// `collect` wrapped as a list value.
    pub fn results(&self) -> Value {
        Value::list(self.collect())
    }

    /// `collect` expecting at most one value: none yields `:nil`, more
    /// than one is an error.
    pub fn result(&self) -> Result<Value, FnError> {
        let mut values = self.collect();
        if values.len() > 1 {
            return Err(FnError::eval("expecting one result"));
        }
        Ok(if values.is_empty() {
            Value::nil()
        } else {
            values.remove(0)
        })
    }

    // ── callee surface ────────────────────────────────────────────

    /// Block until the callee signals it wants another argument. Returns
    /// false once the stream closed with no further signal pending.
    pub fn accept(&self) -> bool {
        lock(&self.accept_rx).recv().is_ok()
    }

    /// Pull the next argument into `last_argument`. Signals the caller's
    /// driver first, then blocks on the rendezvous. Returns false once the
    /// argument stream is closed.
    pub fn next(&self) -> bool {
        let accept_tx = {
            let state = lock(&self.state);
            if state.in_closed {
                return false;
            }
            state.accept_tx.clone()
        };
        if let Some(tx) = accept_tx {
            let _ = tx.send(());
        }
        match lock(&self.in_rx).recv() {
            Ok(value) => {
                *lock(&self.last_argument) = Some(value);
                true
            }
            Err(_) => false,
        }
    }

    /// The argument pulled by the last `next()`. In an executable context
    /// the value is resolved/executed first; otherwise it comes back
    /// verbatim. The flag is re-read on every call.
    pub fn argument(self: &Arc<Self>) -> Result<Value, FnError> {
        let last = lock(&self.last_argument)
            .clone()
            .ok_or(FnError::StreamClosed)?;
        if self.is_executable() {
            exec_argument(self, &last)
        } else {
            Ok(last)
        }
    }

    /// Write one value to the output stream. A no-op after `exit`.
    pub fn yield_value(&self, value: Value) {
        let tx = {
            let state = lock(&self.state);
            if state.out_closed {
                return;
            }
            state.out_tx.clone()
        };
        if let Some(tx) = tx {
            let _ = tx.send(value);
        }
    }

    pub fn yield_values(&self, values: impl IntoIterator<Item = Value>) {
        for value in values {
            self.yield_value(value);
        }
    }

    /// Yield, then terminate the stream.
    pub fn return_values(&self, values: impl IntoIterator<Item = Value>) {
        self.yield_values(values);
        self.exit(None);
    }

    /// Close the output stream (and the argument stream with it), record
    /// the exit status. Idempotent; the first error wins.
    pub fn exit(&self, err: Option<FnError>) {
        {
            let mut state = lock(&self.state);
            if !state.out_closed {
                state.out_closed = true;
                state.out_tx = None;
            }
        }
        if let Some(err) = err {
            self.set_exit_status(err);
        }
        self.close();
    }

    pub fn set_exit_status(&self, err: FnError) {
        let mut status = lock(&self.exit_status);
        if status.is_none() {
            tracing::debug!(id = self.id, name = self.name, "context failed: {err}");
            *status = Some(err);
        }
    }

    pub fn exit_status(&self) -> Option<FnError> {
        lock(&self.exit_status).clone()
    }

    /// True once the output side is terminal.
    pub fn is_closed(&self) -> bool {
        lock(&self.state).out_closed
    }
}

/// Run a function on a context from its own thread. The context always
/// exits — even if the body unwinds — so a caller blocked in `collect`
/// terminates. The receiver reports the body's result.
pub fn spawn_exec(ctx: Arc<Context>, func: Arc<Function>) -> Receiver<Result<(), FnError>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let guard = ExitGuard(Arc::clone(&ctx));
        let result = func.exec(&ctx);
        if let Err(err) = &result {
            ctx.exit(Some(err.clone()));
        }
        drop(guard);
        let _ = tx.send(result);
    });
    rx
}

struct ExitGuard(Arc<Context>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.exit(None);
    }
}

/// Resolve a pulled argument in `ctx`: symbols look up, functions execute
/// to their first result, lists and map values resolve element-wise,
/// everything else passes through verbatim.
pub fn exec_argument(ctx: &Arc<Context>, value: &Value) -> Result<Value, FnError> {
    match value {
        Value::Int(_) => Ok(value.clone()),
        Value::List(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items.iter() {
                resolved.push(exec_argument(ctx, item)?);
            }
            Ok(Value::list(resolved))
        }
        Value::Map(entries) => {
            let mut resolved = BTreeMap::new();
            for (key, val) in entries.iter() {
                resolved.insert(key.clone(), exec_argument(ctx, val)?);
            }
            Ok(Value::map(resolved))
        }
        Value::Symbol(name) => ctx
            .get(name)
            .ok_or_else(|| FnError::Unbound(name.to_string())),
        Value::Function(func) => {
            let child = Context::new(ctx, "argument");
            let done = spawn_exec(Arc::clone(&child), Arc::clone(func));
            let mut values = child.collect();
            match done.recv() {
                Ok(Err(err)) => Err(err),
                _ => Ok(if values.is_empty() {
                    Value::nil()
                } else {
                    values.remove(0)
                }),
            }
        }
        _ => Ok(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(ctx: &Arc<Context>, args: Vec<Value>) -> thread::JoinHandle<()> {
        let driver = Arc::clone(ctx);
        thread::spawn(move || {
            for arg in args {
                if !driver.accept() {
                    break;
                }
                if driver.push(arg).is_err() {
                    break;
                }
            }
            driver.close();
        })
    }

    #[test]
    fn pull_all_arguments_in_order() {
        let root = Context::root();
        let ctx = Context::new(&root, "echo");
        let callee = Arc::clone(&ctx);
        let worker = thread::spawn(move || {
            while callee.next() {
                let value = callee.argument().expect("argument");
                callee.yield_value(value);
            }
            callee.exit(None);
        });
        let driver = drive(&ctx, vec![Value::int(1), Value::int(2), Value::int(3)]);
        assert_eq!(
            ctx.collect(),
            vec![Value::int(1), Value::int(2), Value::int(3)]
        );
        worker.join().expect("worker");
        driver.join().expect("driver");
    }

    #[test]
    fn callee_stopping_early_stops_the_caller() {
        let root = Context::root();
        let ctx = Context::new(&root, "first-only");
        let callee = Arc::clone(&ctx);
        let worker = thread::spawn(move || {
            assert!(callee.next());
            let first = callee.argument().expect("argument");
            callee.yield_value(first);
            callee.exit(None);
        });
        // the driver offers four arguments but the callee pulls one
        let driver = drive(
            &ctx,
            vec![Value::int(1), Value::int(2), Value::int(3), Value::int(4)],
        );
        assert_eq!(ctx.collect(), vec![Value::int(1)]);
        worker.join().expect("worker");
        driver.join().expect("driver");
    }

    #[test]
    fn executable_flag_is_reread_between_arguments() {
        let root = Context::root();
        root.set("bound", Value::int(9)).expect("set");
        let ctx = Context::new(&root, "toggle");
        let callee = Arc::clone(&ctx);
        let worker = thread::spawn(move || {
            callee.set_executable(false);
            assert!(callee.next());
            let verbatim = callee.argument().expect("verbatim");
            callee.set_executable(true);
            assert!(callee.next());
            let resolved = callee.argument().expect("resolved");
            callee.yield_values([verbatim, resolved]);
            callee.exit(None);
        });
        let driver = drive(
            &ctx,
            vec![Value::symbol("bound"), Value::symbol("bound")],
        );
        assert_eq!(ctx.collect(), vec![Value::symbol("bound"), Value::int(9)]);
        worker.join().expect("worker");
        driver.join().expect("driver");
    }

    #[test]
    fn push_after_close_fails() {
        let root = Context::root();
        let ctx = Context::new(&root, "closed");
        ctx.close();
        assert!(matches!(
            ctx.push(Value::int(1)),
            Err(FnError::ChannelClosed)
        ));
        assert!(!ctx.next());
    }

    #[test]
    fn exit_is_idempotent_and_records_first_error() {
        let root = Context::root();
        let ctx = Context::new(&root, "exiting");
        ctx.exit(Some(FnError::user("first")));
        ctx.exit(Some(FnError::user("second")));
        ctx.exit(None);
        assert!(matches!(ctx.exit_status(), Some(FnError::User(m)) if m == "first"));
        assert!(ctx.is_closed());
        assert!(matches!(ctx.output(), Err(FnError::ChannelClosed)));
    }

    #[test]
    fn result_shapes() {
        let root = Context::root();

        let none = Context::new(&root, "none");
        none.exit(None);
        assert_eq!(none.result().expect("empty"), Value::nil());

        let one = Context::new(&root, "one");
        let callee = Arc::clone(&one);
        let worker = thread::spawn(move || {
            callee.return_values([Value::int(7)]);
        });
        assert_eq!(one.result().expect("single"), Value::int(7));
        worker.join().expect("worker");

        let many = Context::new(&root, "many");
        let callee = Arc::clone(&many);
        let worker = thread::spawn(move || {
            callee.return_values([Value::int(1), Value::int(2)]);
        });
        assert!(many.result().is_err());
        worker.join().expect("worker");
    }

    #[test]
    fn exec_argument_resolves_nested_values() {
        let root = Context::root();
        root.set("x", Value::int(5)).expect("set");
        let ctx = Context::new(&root, "resolver");

        let list = Value::list(vec![Value::symbol("x"), Value::int(1)]);
        assert_eq!(
            exec_argument(&ctx, &list).expect("list"),
            Value::list(vec![Value::int(5), Value::int(1)])
        );

        assert!(matches!(
            exec_argument(&ctx, &Value::symbol("missing")),
            Err(FnError::Unbound(name)) if name == "missing"
        ));

        let func = Value::function(Function::new(|ctx| {
            ctx.yield_value(Value::int(11));
            Ok(())
        }));
        assert_eq!(exec_argument(&ctx, &func).expect("func"), Value::int(11));
    }

    #[test]
    fn closure_shares_parent_table() {
        let root = Context::root();
        let closure = Context::closure(&root, "closure");
        closure.set("shared", Value::int(1)).expect("set");
        assert_eq!(root.get("shared"), Some(Value::int(1)));

        let child = Context::new(&root, "child");
        child.set("local", Value::int(2)).expect("set");
        assert_eq!(child.get("local"), Some(Value::int(2)));
        assert_eq!(root.get("local"), None);
    }
}
