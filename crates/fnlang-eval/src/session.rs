use std::io::Read;
use std::sync::Arc;

use fnlang_core::{spawn_exec, Context, FnError, Function, Value};
use fnlang_reader::parse;

use crate::eval::{eval_node_list, Interpreter};

/// Incremental evaluation with one scope surviving across calls.
///
/// Each `eval` runs the chunk's top-level forms in a closure of the
/// session's script context, so a top-level `set` in one call is visible
/// to the next. Results accumulate and stay available via `values()`.
pub struct Session {
    interpreter: Interpreter,
    script: Arc<Context>,
    values: Vec<Value>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let interpreter = Interpreter::new();
        let script = Context::new(interpreter.root(), "script");
        Session {
            interpreter,
            script,
            values: Vec::new(),
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Every value yielded by every chunk so far, in order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn eval(&mut self, mut reader: impl Read) -> Result<Vec<Value>, FnError> {
        let mut source = String::new();
        reader
            .read_to_string(&mut source)
            .map_err(|err| FnError::Io(err.to_string()))?;
        self.eval_str(&source)
    }

    /// Parse and evaluate one chunk. An `UnexpectedEof` parse error comes
    /// back verbatim so a REPL can keep accumulating input.
    pub fn eval_str(&mut self, source: &str) -> Result<Vec<Value>, FnError> {
        let root = parse(source)?;
        let nodes = root.children().to_vec();

        let program = Context::closure(&self.script, "program");
        let runner = Function::with_name(
            move |ctx: &Arc<Context>| eval_node_list(ctx, &nodes),
            "program",
        );
        let done = spawn_exec(Arc::clone(&program), Arc::new(runner));
        let values = program.collect();
        if let Ok(Err(err)) = done.recv() {
            return Err(err);
        }
        self.values.extend(values.iter().cloned());
        Ok(values)
    }
}
