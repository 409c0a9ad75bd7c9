//! # agent-core
//!
//! Agent plumbing shared by the stablecoin rebalancer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  orchestration layer (HTTP, chat, schedulers)                │
//! │        │ ToolCall (JSON args)            ▲ ToolResult        │
//! │        ▼                                 │                   │
//! │  ┌──────────────┐   typed args   ┌──────────────┐            │
//! │  │ ToolRegistry │──────────────▶ │  domain tool │            │
//! │  └──────────────┘                └──────┬───────┘            │
//! │                                         │ optional           │
//! │                                  ┌──────▼───────┐            │
//! │                                  │ LlmProvider  │            │
//! │                                  └──────────────┘            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait lets a hosted chat-completion API, a local model
//! or a test double answer text-generation requests interchangeably.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Message, Role};
pub use provider::{Completion, GenerationOptions, LlmProvider};
pub use tool::{ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
