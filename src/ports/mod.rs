//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the application core and an
//! external system. Implementations live in `src/adapters/`.

pub mod outfit_generator;

pub use outfit_generator::{
    Capabilities, GenerateFuture, OutfitGenerator, OutfitResponse, ProviderSignal, RawError,
};
