//! folio - find portfolio evidence for job skills.
//!
//! folio reads a portfolio catalogue (a CSV of tech stacks and project
//! links) and, given the skills a job asks for, returns the links that best
//! demonstrate them. When a persistent
//! [ColBERT](https://github.com/stanford-futuredata/ColBERT) index can be
//! opened the links come from nearest-neighbor search; otherwise a lexical
//! matcher scores rows by how many skills their tech stack names.
//!
//! # Quick start
//!
//! ```no_run
//! use folio::{DataDir, MatchMode, Retriever, RetrieverOptions};
//! use folio::retriever::BackendPreference;
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let options = RetrieverOptions {
//!     catalogue_path: data_dir.catalogue_path(None),
//!     store_dir: data_dir.store_dir(None),
//!     model_id: None,
//!     backend: BackendPreference::Auto,
//!     mode: MatchMode::BestAvailable,
//! };
//!
//! let mut retriever = Retriever::open(&options).unwrap();
//! retriever.ensure_populated().unwrap();
//!
//! for link in retriever.query_links("Python, Django") {
//!     println!("{link}");
//! }
//! ```

pub mod catalogue;
pub mod cli;
pub mod data_dir;
pub mod embedding;
pub mod error;
pub mod jobs;
pub mod lexical;
pub mod mcp;
#[cfg(feature = "colbert")]
pub mod model_manager;
pub mod output;
pub mod retriever;
pub mod semantic;
pub mod similarity;
pub mod skills;
pub mod vector_store;

pub use catalogue::{Catalogue, CatalogueEntry};
pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use lexical::MatchMode;
#[cfg(feature = "colbert")]
pub use model_manager::ModelManager;
pub use retriever::{BackendKind, Retriever, RetrieverOptions};
pub use skills::SkillSet;
