//! Secondary validation of keyword labels through an LLM.
//!
//! The keyword engine is the source of truth for the production label; this
//! crate sends positively-classified ads to an OpenAI-compatible
//! chat-completions endpoint for an independent verdict. Verdicts are
//! advisory annotations stored alongside the deterministic label, never a
//! replacement for it.
//!
//! Failure is expected and non-fatal: a request that exhausts its retries
//! yields an unvalidated verdict and the run continues.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod client;
pub mod prompt;

pub use client::{ReviewClient, ReviewItem, Verdict};
pub use prompt::{parse_verdict, response_schema, VerdictPayload, SYSTEM_PROMPT};
