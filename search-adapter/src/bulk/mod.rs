//! Bulk mutation: compiling operations into the engine's positional
//! action/body format and dispatching the result.

mod compiler;
mod dispatcher;

pub use compiler::{expected_line_count, BulkAction, BulkCompiler, BulkLine};
pub use dispatcher::BatchDispatcher;
