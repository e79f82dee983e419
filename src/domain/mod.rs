pub mod ast;
pub mod builtins;
pub mod call_site;
pub mod callgraph;
pub mod entry_point;
pub mod exclusion;
pub mod index;
pub mod linearization;
pub mod resolver;
pub mod traversal;
