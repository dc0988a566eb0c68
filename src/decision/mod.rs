pub mod client;
pub mod context;
pub mod fallback;
pub mod parser;
pub mod source;

pub use client::{LlmClient, LlmDecisionSource};
pub use context::DeliberationContext;
pub use fallback::ScriptedPolicy;
pub use source::{
    DecisionError, DecisionSource, Deliberation, Movement, ResidentInstruction, TurnDecision,
    TurnRequest,
};
