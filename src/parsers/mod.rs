//! Tree-sitter and config parsers used by the indexer
//!
//! - `exports`: module-level export extraction for JS/TS source files
//! - `tsconfig`: path alias rules from tsconfig.json/jsconfig.json

pub mod exports;
pub mod tsconfig;

pub use exports::{parse_exports, ExportedSymbol, ModuleExports};
