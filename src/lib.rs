//! import-helper: project-wide export index and import statement editing
//!
//! Two subsystems do the work:
//!
//! - **Indexer**: walks project trees and `node_modules` packages, extracts
//!   exports with Tree-sitter and produces an immutable [`Catalog`] that
//!   completion queries run against
//! - **Imports**: parses the import statements of a buffer, decides how a
//!   chosen symbol is merged or inserted, and renders the result as a
//!   [`TextEdit`]
//!
//! # Example Usage
//!
//! ```no_run
//! use import_helper::indexer::{IndexRequest, ModuleIndexer};
//! use import_helper::insert::{plan_insert, InsertContext};
//! use import_helper::completion::find_entry;
//!
//! let indexer = ModuleIndexer::default();
//! let catalog = indexer.build_index(&IndexRequest::new(vec![".".into()])).unwrap();
//!
//! let entry = find_entry(&catalog, "useState").unwrap();
//! let buffer = "import React from 'react'\n";
//! if let Some(edit) = plan_insert(buffer, &entry, &InsertContext::default()) {
//!     println!("{}", edit.apply(buffer));
//! }
//! ```

pub mod alias;
pub mod background_indexer;
pub mod cli;
pub mod completion;
pub mod config;
pub mod exclusion;
pub mod imports;
pub mod indexer;
pub mod insert;
pub mod models;
pub mod output;
pub mod parsers;
pub mod paths;
pub mod resolver;
pub mod unused;
pub mod watcher;

// Re-export commonly used types
pub use background_indexer::IndexManager;
pub use config::{ImportStyle, Settings};
pub use indexer::{IndexRequest, ModuleIndexer};
pub use models::{Catalog, ModuleEntry, PackageEntry, SourceEntry, TextEdit};
