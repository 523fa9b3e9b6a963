//! The multi-hop search agent loop.
//!
//! Each run follows the same shape:
//!
//! 1. **Seed** a transcript with the system prompt and the user's query
//! 2. **Ask** the model, offering every registered tool
//! 3. **If tool calls**: run them, append the results, count a hop, go to 2
//! 4. **If text**: that text is the answer
//!
//! When the hop budget is spent the model is asked one last time to answer
//! from what it has gathered.

pub mod loop_runner;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use loop_runner::{AgentLoop, RunOutcome, RunReport};
