//! # Car Benchmarking
//!
//! Retrieval-augmented question answering over automobile specification data.
//!
//! Tabular car records are rendered into short natural-language documents,
//! embedded, and stored in a vector index. At query time the most similar
//! documents are assembled into a context and a language model answers from
//! that context only.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Dataset    │──▶│   Indexer    │──▶│ Vector Index │
//! │ CSV / JSON  │   │ Build+Embed  │   │   (SQLite)   │
//! └─────────────┘   └──────────────┘   └──────┬───────┘
//!                                             │
//!                   ┌──────────────┐   ┌──────▼───────┐
//!                   │  Generator   │◀──│  Retriever   │
//!                   │ OpenAI/Gemini│   │   top-k      │
//!                   │   /Local     │   └──────────────┘
//!                   └──────┬───────┘
//!                          ▼
//!                 ┌──────────────────┐
//!                 │ CLI │ HTTP API   │
//!                 └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! carbench init                               # create the index database
//! carbench ingest --dataset data.csv          # rebuild the collection
//! carbench ask "How much power does the Toyota 86 have?"
//! carbench serve                              # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credentials |
//! | [`models`] | Core data types |
//! | [`dataset`] | CSV / JSON record loading |
//! | [`document`] | Record normalization and document text |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector index trait and in-memory index |
//! | [`sqlite_store`] | SQLite vector index |
//! | [`ingest`] | Full reindexing |
//! | [`search`] | Semantic retrieval |
//! | [`generation`] | LLM backends and fallback chain |
//! | [`rag`] | Prompt assembly and answering |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod dataset;
pub mod db;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod rag;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod stats;
pub mod store;
