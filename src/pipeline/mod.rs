//! Pipeline stages for score-sheet extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! encode ──▶ request ──▶ llm (+ retry) ──▶ normalize
//! (base64)   (schema)    (HTTP, backoff)   (validate, relabel)
//! ```
//!
//! 1. [`encode`]    — read the source image once and base64-wrap it
//! 2. [`request`]   — build the `generateContent` body and response schema
//! 3. [`retry`]     — the retry state machine and the injectable sleeper
//! 4. [`llm`]       — send through a [`llm::Transport`]; the only stage with
//!    network I/O
//! 5. [`normalize`] — parse the payload and map it onto records

pub mod encode;
pub mod llm;
pub mod normalize;
pub mod request;
pub mod retry;
