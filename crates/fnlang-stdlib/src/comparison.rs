use std::sync::Arc;

use fnlang_core::{Context, Value};

pub fn register(ctx: &Arc<Context>) {
    // Pairwise equality against the first argument; yields :false on the
    // first mismatch and stops pulling. Zero or one arguments are :true.
    ctx.defn("=", |ctx| {
        let mut first: Option<Value> = None;
        while ctx.next() {
            let value = ctx.argument()?;
            match &first {
                None => first = Some(value),
                Some(seed) if *seed == value => {}
                Some(_) => {
                    ctx.yield_value(Value::truth(false));
                    return Ok(());
                }
            }
        }
        ctx.yield_value(Value::truth(true));
        Ok(())
    });

    // One argument compares against :true, two compare against each other.
    // Assertions never raise; a failing argument is just :false.
    ctx.defn("assert", |ctx| {
        if !ctx.next() {
            ctx.yield_value(Value::nil());
            return Ok(());
        }
        let lhs = match ctx.argument() {
            Ok(value) => value,
            Err(_) => {
                ctx.yield_value(Value::truth(false));
                return Ok(());
            }
        };
        let rhs = if ctx.next() {
            match ctx.argument() {
                Ok(value) => value,
                Err(_) => {
                    ctx.yield_value(Value::truth(false));
                    return Ok(());
                }
            }
        } else {
            Value::truth(true)
        };
        ctx.yield_value(Value::truth(lhs == rhs));
        Ok(())
    });
}
