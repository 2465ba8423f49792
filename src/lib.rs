//! Streaming terminal client for a RAG chat backend.
//!
//! Talks to a retrieval-augmented chat server over HTTP, streams assistant
//! replies token-by-token, and manages chat sessions and document
//! upload/embedding status. Retrieval, embedding, and model inference all
//! live server-side; this crate is the client half of that contract.
//!
//! # Architecture
//!
//! - **API client**: explicitly constructed `reqwest` wrapper for the
//!   backend's chat, session, and document endpoints
//! - **Frame decoder**: incremental `data: <json>` line decoding that is
//!   indifferent to how the bytes were chunked on the wire
//! - **Chat view**: single-flight send state machine with optimistic
//!   transcript updates, rollback on failure, and cooperative cancellation
//! - **REPL**: terminal front end rendering published state snapshots
//!
//! # Modules
//!
//! - [`api`]: HTTP client and wire types
//! - [`events`]: streaming event model and frame decoder
//! - [`chat`]: transcript model and the send state machine
//! - [`config`]: CLI, file, and environment configuration
//! - [`error`]: the error taxonomy

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::default_trait_access)]

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod events;
