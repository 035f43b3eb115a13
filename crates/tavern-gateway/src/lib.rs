//! Text-generation gateway for the tavern simulation.
//!
//! The narrative engine asks for prose through the [`TextGenerator`] trait
//! and treats every [`GatewayError`] as a signal to use its local fallback
//! content. This crate provides the trait, HTTP backends for hosted LLM
//! APIs, a [`DisabledGateway`] for offline runs, and the
//! [`ResilientGateway`] wrapper that adds deadlines and retries.
//!
//! # Modules
//!
//! - [`config`] -- backend selection from the environment and the `llm` YAML section
//! - [`error`] -- gateway error type and transient classification
//! - [`generator`] -- the [`TextGenerator`] trait and request type
//! - [`llm`] -- `OpenAI`-compatible and Anthropic HTTP backends
//! - [`resilient`] -- timeout and retry wrapper

pub mod config;
pub mod error;
pub mod generator;
pub mod llm;
pub mod resilient;

pub use config::{BackendType, GatewayConfig, LlmConfig};
pub use error::GatewayError;
pub use generator::{DisabledGateway, GenerationRequest, TextGenerator};
pub use llm::{AnthropicBackend, LlmBackend, OpenAiBackend, create_backend};
pub use resilient::ResilientGateway;
