//! Adapter implementations for port traits.
//!
//! - `live/`: real services (`OpenRouter`, Gemini, a remote envelope endpoint)
//! - `recording/`: record interactions to cassettes
//! - `replaying/`: replay interactions from cassettes

pub mod live;
pub mod recording;
pub mod replaying;
