//! # docq
//!
//! A cascading PDF text-extraction and retrieval-backed question answering
//! pipeline.
//!
//! docq pulls plain text out of PDF corpora that may be malformed,
//! encrypted, scanned, or corrupted, trying a sequence of increasingly
//! expensive strategies per document. It then chunks, embeds, and indexes
//! the text in a vector collection and answers questions against it with a
//! generative model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────────┐   ┌────────────┐
//! │ PDF dir  │──▶│ Extraction  │──▶│ Chunk+Embed  │──▶│  Vector    │
//! │          │   │ Cascade     │   │              │   │ collection │
//! └──────────┘   └─────────────┘   └──────────────┘   └─────┬──────┘
//!                                                           │
//!                  question ──▶ embed ──▶ top-K search ─────┤
//!                                                           ▼
//!                                  prompt ──▶ generation ──▶ answer
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docq extract                  # run the extraction cascade over the PDF dir
//! docq index                    # chunk, embed, rebuild the collection
//! docq ingest                   # both of the above
//! docq ask "What animal jumps?" # retrieve and answer
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | The four extraction strategies |
//! | [`cascade`] | Strategy cascade and batch extraction |
//! | [`chunk`] | Recursive overlapping text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`vector_store`] | Vector collection client and response normalization |
//! | [`index_cmd`] | Destructive index rebuild |
//! | [`generate`] | Generation service client and response normalization |
//! | [`ask`] | Query resolver |

pub mod ask;
pub mod cascade;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod generate;
pub mod index_cmd;
pub mod models;
pub mod vector_store;
