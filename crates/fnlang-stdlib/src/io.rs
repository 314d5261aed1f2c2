use std::io::Write;
use std::sync::Arc;

use fnlang_core::{Context, Value};

pub fn register(ctx: &Arc<Context>) {
    // Yields each argument back in order; the expression's value is the
    // list of its arguments.
    ctx.defn("echo", |ctx| {
        while ctx.next() {
            let value = ctx.argument()?;
            ctx.yield_value(value);
        }
        Ok(())
    });

    // Writes each argument to stdout: strings raw, everything else in
    // canonical form. Yields :nil.
    ctx.defn("print", |ctx| {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        while ctx.next() {
            let value = ctx.argument()?;
            let written = match &value {
                Value::String(s) => write!(out, "{s}"),
                other => write!(out, "{other}"),
            };
            if let Err(err) = written {
                tracing::warn!("print: {err}");
            }
        }
        let _ = out.flush();
        drop(out);
        ctx.yield_value(Value::nil());
        Ok(())
    });
}
