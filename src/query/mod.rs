pub mod ast;
pub mod compare;
pub mod compiler;
pub mod fields;
pub mod parser;

pub use ast::{CompareOp, LogicalOp, QueryNode};
pub use compiler::{PipelineCompiler, RowPredicate};
pub use fields::{Field, FieldKind, FieldResolver};
pub use parser::QueryParser;
