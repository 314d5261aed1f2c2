use std::sync::Arc;

use fnlang_core::{Context, FnError, Value};

/// A left-fold accumulator with numeric widening: integer until the first
/// float operand arrives, float from then on.
#[derive(Clone, Copy)]
enum Acc {
    Int(i64),
    Float(f64),
}

impl Acc {
    fn seed(value: &Value) -> Result<Acc, FnError> {
        match value {
            Value::Int(n) => Ok(Acc::Int(*n)),
            Value::Float(f) => Ok(Acc::Float(*f)),
            other => Err(FnError::type_error(":number", other.type_name())),
        }
    }

    fn widened(self, value: &Value) -> Result<(f64, f64), FnError> {
        let lhs = match self {
            Acc::Int(n) => n as f64,
            Acc::Float(f) => f,
        };
        match value.as_float() {
            Some(rhs) => Ok((lhs, rhs)),
            None => Err(FnError::type_error(":number", value.type_name())),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Acc::Int(n) => Value::Int(n),
            Acc::Float(f) => Value::Float(f),
        }
    }
}

pub fn register(ctx: &Arc<Context>) {
    ctx.defn("+", |ctx| {
        let mut acc = Acc::Int(0);
        while ctx.next() {
            let value = ctx.argument()?;
            acc = match (acc, &value) {
                (Acc::Int(a), Value::Int(b)) => Acc::Int(a + b),
                _ => Acc::Float(acc.widened(&value).map(|(a, b)| a + b)?),
            };
        }
        ctx.yield_value(acc.into_value());
        Ok(())
    });

    ctx.defn("-", |ctx| {
        if !ctx.next() {
            return Err(FnError::arity("-", "1+", 0));
        }
        let mut acc = Acc::seed(&ctx.argument()?)?;
        while ctx.next() {
            let value = ctx.argument()?;
            acc = match (acc, &value) {
                (Acc::Int(a), Value::Int(b)) => Acc::Int(a - b),
                _ => Acc::Float(acc.widened(&value).map(|(a, b)| a - b)?),
            };
        }
        ctx.yield_value(acc.into_value());
        Ok(())
    });

    ctx.defn("*", |ctx| {
        let mut acc = Acc::Int(1);
        while ctx.next() {
            let value = ctx.argument()?;
            acc = match (acc, &value) {
                (Acc::Int(a), Value::Int(b)) => Acc::Int(a * b),
                _ => Acc::Float(acc.widened(&value).map(|(a, b)| a * b)?),
            };
        }
        ctx.yield_value(acc.into_value());
        Ok(())
    });

    ctx.defn("/", |ctx| {
        if !ctx.next() {
            return Err(FnError::arity("/", "1+", 0));
        }
        let mut acc = Acc::seed(&ctx.argument()?)?;
        while ctx.next() {
            let value = ctx.argument()?;
            acc = match (acc, &value) {
                // two integers use host integer division
                (Acc::Int(a), Value::Int(b)) => {
                    if *b == 0 {
                        return Err(FnError::eval("division by zero"));
                    }
                    Acc::Int(a / b)
                }
                _ => Acc::Float(acc.widened(&value).map(|(a, b)| a / b)?),
            };
        }
        ctx.yield_value(acc.into_value());
        Ok(())
    });
}
