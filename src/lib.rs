//! Styles: see a person wearing a garment via vision-language models.
//!
//! The [`orchestrator`] drives generation attempts: it validates the two
//! uploaded images, builds a [`request::GenerationRequest`], sends it through
//! the [`gateway`] to an [`ports::OutfitGenerator`], and turns the answer into
//! a [`normalize::GeneratedResult`] or a classified [`classify::ErrorState`].

pub mod adapters;
pub mod cassette;
pub mod classify;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod output;
pub mod ports;
pub mod render;
pub mod request;
pub mod store;
pub mod upload;
pub mod validate;
pub mod wire;
