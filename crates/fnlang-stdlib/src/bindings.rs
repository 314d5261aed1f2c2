use std::sync::Arc;

use fnlang_core::{Context, FnError, Value};

pub fn register(ctx: &Arc<Context>) {
    // (get NAME) — NAME is taken verbatim; yields the bound value or :nil.
    ctx.defn("get", |ctx| {
        ctx.set_executable(false);
        let mut name: Option<Value> = None;
        while ctx.next() {
            let argument = ctx.argument()?;
            if name.is_some() {
                return Err(FnError::eval("expecting one argument"));
            }
            name = Some(argument);
        }
        let bound = name
            .as_ref()
            .and_then(Value::symbol_name)
            .and_then(|n| ctx.get(n));
        ctx.yield_value(bound.unwrap_or_else(Value::nil));
        Ok(())
    });

    // (set NAME VALUE) — NAME verbatim, VALUE evaluated; binds into the
    // parent scope and yields :true. A missing VALUE binds :nil.
    ctx.defn("set", |ctx| {
        ctx.set_executable(false);
        let mut name: Option<Value> = None;
        let mut value: Option<Value> = None;
        let mut index = 0;
        while ctx.next() {
            if index > 0 {
                ctx.set_executable(true);
            }
            let argument = ctx.argument()?;
            match index {
                0 => name = Some(argument),
                1 => value = Some(argument),
                _ => return Err(FnError::eval("expecting two arguments")),
            }
            index += 1;
        }
        let name = name.ok_or_else(|| FnError::eval("set requires a symbol"))?;
        let target = name
            .symbol_name()
            .ok_or_else(|| FnError::type_error(":symbol", name.type_name()))?;
        let value = value.unwrap_or_else(Value::nil);
        ctx.set_executable(true);
        match ctx.parent() {
            Some(parent) => parent.set(target, value)?,
            None => ctx.set(target, value)?,
        }
        ctx.yield_value(Value::truth(true));
        Ok(())
    });

    // (push NAME VALUE...) — NAME must name a list in scope; appends each
    // evaluated value, rebinding in the parent. Unbound NAME yields :nil.
    ctx.defn("push", |ctx| {
        ctx.set_executable(false);
        if !ctx.next() {
            return Err(FnError::eval("push requires a symbol"));
        }
        let name = ctx.argument()?;
        let target = name
            .symbol_name()
            .ok_or_else(|| FnError::type_error(":symbol", name.type_name()))?
            .to_string();
        let Some(current) = ctx.get(&target) else {
            ctx.yield_value(Value::nil());
            return Ok(());
        };
        let Some(items) = current.as_list() else {
            return Err(FnError::type_error(":list", current.type_name()));
        };
        let mut items = items.to_vec();
        ctx.set_executable(true);
        while ctx.next() {
            let value = ctx.argument()?;
            items.push(value);
            if let Some(parent) = ctx.parent() {
                parent.set(&target, Value::list(items.clone()))?;
            }
        }
        ctx.yield_value(Value::truth(true));
        Ok(())
    });
}
