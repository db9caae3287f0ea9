//! Persistent memory for local AI agents: durable, per-user, hybrid-searchable recall.
//!
//! recollect is a small service that sits next to a local LLM runtime. The chat front
//! end calls it through tool calls to store statements worth remembering and to search
//! them later. Memories are classified by the caller:
//!
//! | Type | Typical content |
//! |------|-----------------|
//! | **preference** | "likes Python programming" |
//! | **fact** | "lives in Lisbon" |
//! | **setting** | "prefers answers in Japanese" |
//! | **skill** | "knows how to solder" |
//!
//! plus `reminder`, `note`, and any other label the caller chooses.
//!
//! # Architecture
//!
//! - **Storage**: a single SQLite file in WAL mode; one serialized writer, concurrent readers
//! - **Search**: keyword overlap first (CJK-aware tokenization); only when nothing matches,
//!   cosine similarity over embeddings from an external provider (Ollama or OpenAI-compatible)
//! - **Transport**: REST endpoints, an OpenAPI-style tool server, and MCP (stdio or HTTP)
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`embedding`]: Embedding provider trait and HTTP implementations
//! - [`memory`]: Storage layer, search engine, and the service tying them together
//! - [`api`]: axum router for the REST and tool-server surfaces

pub mod api;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod server;
pub mod tools;

pub use error::MemoryError;
