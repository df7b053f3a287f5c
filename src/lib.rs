//! Player Tag Vision Worker
//!
//! Drains a remote queue of "which player tag is on this screenshot" jobs by
//! asking a local OpenAI-compatible vision model, validating its answer, and
//! reporting one result per job. Also ships a small bridge that answers
//! Gemini-shaped chat requests with the same local model.

pub mod app_state;
pub mod config;
pub mod models;
pub mod services;
pub mod telemetry;
