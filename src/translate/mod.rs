//! Translation between the frontend's simplified shapes and the upstream
//! Chat Completions format.
//!
//! All translation functions are pure (no I/O); the upstream client is the
//! only place that talks to the network.

pub mod frontend_types;
pub mod openai_types;
pub mod request;
pub mod response;

pub use request::{build_chat_payload, build_structured_payload};
pub use response::{extract_json, extract_text};
