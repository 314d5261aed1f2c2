use std::sync::Arc;

use fnlang_core::{spawn_exec, Context, FnError, Function, Value};

pub fn register(ctx: &Arc<Context>) {
    // (fn [PARAMS...] BODY...) — anonymous; yields the function.
    ctx.defn("fn", |ctx| {
        let mut parts = raw_arguments(ctx)?.into_iter();
        let params = parts
            .next()
            .ok_or_else(|| FnError::eval("missing parameters list"))?;
        let func = make_function(&params, parts.collect(), "fn")?;
        ctx.yield_value(func);
        Ok(())
    });

    // (defn NAME [PARAMS...] BODY...) — binds NAME in the parent scope.
    ctx.defn("defn", |ctx| {
        let mut parts = raw_arguments(ctx)?.into_iter();
        let name = parts
            .next()
            .ok_or_else(|| FnError::eval("defn requires a name"))?;
        let target = name
            .symbol_name()
            .ok_or_else(|| FnError::type_error(":symbol", name.type_name()))?
            .to_string();
        let params = parts
            .next()
            .ok_or_else(|| FnError::eval("missing parameters list"))?;
        let func = make_function(&params, parts.collect(), target.clone())?;
        ctx.set_executable(true);
        match ctx.parent() {
            Some(parent) => parent.set(&target, func)?,
            None => ctx.set(&target, func)?,
        }
        ctx.yield_value(Value::truth(true));
        Ok(())
    });
}

/// Pull every remaining argument verbatim.
fn raw_arguments(ctx: &Arc<Context>) -> Result<Vec<Value>, FnError> {
    ctx.set_executable(false);
    let mut args = Vec::new();
    while ctx.next() {
        args.push(ctx.argument()?);
    }
    Ok(args)
}

/// Build the callable for `fn`/`defn`: on invocation it pulls up to
/// `params.len()` arguments (evaluated), binds each into its own scope,
/// then runs every residual body value in order.
fn make_function(
    params: &Value,
    body: Vec<Value>,
    name: impl Into<String>,
) -> Result<Value, FnError> {
    let params = params
        .as_list()
        .ok_or_else(|| FnError::eval("missing parameters list"))?;
    let params: Vec<String> = params
        .iter()
        .map(|p| {
            p.symbol_name()
                .map(str::to_string)
                .ok_or_else(|| FnError::type_error(":symbol", p.type_name()))
        })
        .collect::<Result<_, _>>()?;

    let func = Function::with_name(
        move |ctx: &Arc<Context>| {
            let mut index = 0;
            while index < params.len() && ctx.next() {
                let argument = ctx.argument()?;
                ctx.set(&params[index], argument)?;
                index += 1;
            }
            for part in &body {
                exec_function_body(ctx, part)?;
            }
            Ok(())
        },
        name,
    );
    Ok(Value::function(func))
}

/// Run one residual body value: functions execute in a fresh child and
/// yield their results, lists execute element-wise into a single list
/// value, anything else yields verbatim. A failing body surfaces as an
/// inline {:error ...} map and the body keeps going.
fn exec_function_body(ctx: &Arc<Context>, body: &Value) -> Result<(), FnError> {
    match body {
        Value::Function(func) => {
            let child = Context::new(ctx, "exec-body");
            let done = spawn_exec(Arc::clone(&child), Arc::clone(func));
            let values = child.collect();
            ctx.yield_values(values);
            if let Ok(Err(err)) = done.recv() {
                tracing::error!("runtime error in function body: {err}");
                ctx.yield_value(Value::error_map(&err));
                ctx.set_exit_status(err);
            }
            Ok(())
        }
        Value::List(items) => {
            let child = Context::new(ctx, "exec-list");
            let items = Arc::clone(items);
            let runner = Function::with_name(
                move |ctx: &Arc<Context>| {
                    for item in items.iter() {
                        exec_function_body(ctx, item)?;
                    }
                    Ok(())
                },
                "exec-list",
            );
            let done = spawn_exec(Arc::clone(&child), Arc::new(runner));
            let values = child.collect();
            ctx.yield_value(Value::list(values));
            if let Ok(Err(err)) = done.recv() {
                tracing::error!("runtime error in function body: {err}");
                ctx.yield_value(Value::error_map(&err));
                ctx.set_exit_status(err);
            }
            Ok(())
        }
        other => {
            ctx.yield_value(other.clone());
            Ok(())
        }
    }
}
