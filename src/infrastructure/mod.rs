// Infrastructure implementations for solgraph.

pub mod concurrency;
pub mod solidity_parser;
pub mod source_loader;

pub use solidity_parser::TreeSitterSolidityParser;
pub use source_loader::SourceLoader;
