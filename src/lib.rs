//! # Capability Lookup
//!
//! Semantic search over capability estimation workbooks.
//!
//! Estimation workbooks carry a "Capability List" sheet whose table rarely
//! starts in the same place or uses the same column names. Capability Lookup
//! finds the header heuristically, turns every row into an embeddable chunk,
//! stores the vectors in SQLite and answers free-text questions with ranked
//! matches, source links and a generated overview.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌────────────┐   ┌─────────┐
//! │ Workbook  │──▶│ Header       │──▶│ Row        │──▶│ Chunk   │
//! │ (calamine)│   │ Resolver     │   │ Normalizer │   │ Builder │
//! └───────────┘   └──────────────┘   └────────────┘   └────┬────┘
//!                                                          │ embed
//!                   ┌──────────┐    ┌───────────────┐      ▼
//!                   │  Query   │◀──▶│ VectorStore   │◀── Ingest
//!                   │  Driver  │    │ (SQLite/mem)  │
//!                   └────┬─────┘    └───────────────┘
//!                        ▼
//!                   TextGenerator (overview, summaries)
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types |
//! | [`workbook`] | Spreadsheet reading |
//! | [`header`] | Header row detection |
//! | [`normalize`] | Row extraction under a resolved header |
//! | [`chunk`] | Row-to-chunk conversion |
//! | [`discover`] | Workbook discovery |
//! | [`validate`] | Validation reports |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`generation`] | Text generation backends |
//! | [`prompts`] | Overview and summary prompts |
//! | [`store`] | Vector storage |
//! | [`ingest`] | Ingestion driver |
//! | [`search`] | Query driver |
//! | [`stats`] | Store statistics and inventory |
//! | [`render`] | Text output |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`logging`] | Tracing subscriber setup |

pub mod chunk;
pub mod config;
pub mod db;
pub mod discover;
pub mod embedding;
pub mod generation;
pub mod header;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod prompts;
pub mod render;
pub mod search;
pub mod stats;
pub mod store;
pub mod validate;
pub mod workbook;
