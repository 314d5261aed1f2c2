pub mod context;
pub mod error;
pub mod symbol;
pub mod value;

pub use context::{exec_argument, spawn_exec, Context};
pub use error::{FnError, Span};
pub use symbol::SymbolTable;
pub use value::{Function, NativeFn, Value};
