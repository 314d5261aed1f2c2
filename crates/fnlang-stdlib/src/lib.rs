mod arithmetic;
mod bindings;
mod comparison;
mod control;
mod functions;
mod io;

use std::sync::Arc;

use fnlang_core::Context;

/// Install the standard operator set into a root scope.
pub fn register_stdlib(ctx: &Arc<Context>) {
    arithmetic::register(ctx);
    bindings::register(ctx);
    comparison::register(ctx);
    control::register(ctx);
    functions::register(ctx);
    io::register(ctx);
}
