use std::sync::Arc;

use fnlang_core::{Context, FnError, Value};

pub fn register(ctx: &Arc<Context>) {
    // Variadic (cond val cond val ... [else]) pairs. A condition is
    // evaluated by pulling it through argument(); the value of an
    // unmatched pair is pulled but never evaluated, which is the whole
    // short-circuit: unevaluated expressions are still thunks here.
    ctx.defn("when", |ctx| {
        while ctx.next() {
            let cond = ctx.argument()?;
            if ctx.next() {
                if cond == Value::truth(true) {
                    let value = ctx.argument()?;
                    ctx.yield_value(value);
                    return Ok(());
                }
            } else {
                // odd trailing expression acts as the else branch
                ctx.yield_value(cond);
                return Ok(());
            }
        }
        ctx.yield_value(Value::nil());
        Ok(())
    });

    // Reads (and thereby evaluates) every argument, then yields :true.
    ctx.defn(":true", |ctx| {
        while ctx.next() {
            ctx.argument()?;
        }
        ctx.yield_value(Value::truth(true));
        Ok(())
    });

    // Yields :false without reading anything.
    ctx.defn(":false", |ctx| {
        ctx.yield_value(Value::truth(false));
        Ok(())
    });

    ctx.defn("nop", |ctx| {
        ctx.yield_value(Value::nil());
        Ok(())
    });

    // Raises a user error whose message is the argument's printed form.
    ctx.defn(":error", |ctx| {
        if ctx.next() {
            let value = ctx.argument()?;
            return Err(FnError::user(value.to_string()));
        }
        Ok(())
    });
}
