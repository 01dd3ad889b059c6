//! Care Assist — a small multi-agent elder-care companion.
//!
//! Independent agent processes (safety monitor, conversational companion,
//! memory, onboarding UI) exchange tasks over a JSON-RPC/HTTP protocol; the
//! orchestrator sequences them per user turn, safety first.

pub mod client;
pub mod companion;
pub mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod onboarding;
pub mod orchestrator;
pub mod protocol;
pub mod safety;
pub mod server;
pub mod session;
pub mod ui;
