mod eval;
mod session;

pub use eval::{eval_node, Interpreter};
pub use session::Session;
