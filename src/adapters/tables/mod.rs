//! Table sinks.

pub mod jsonl;

pub use jsonl::{read_scores, CampaignSummary, JsonlTableSink};
