//! trip-agent-rs: turns free-form LLM travel answers into complete, validated itineraries
//!
//! A [`Planner`] asks a language model for a day-keyed itinerary, then cleans,
//! parses and validates the answer. Broken answers are repaired day by day, and
//! when nothing usable comes back a deterministic template is returned instead,
//! so callers always receive exactly one plan per requested day.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use trip_agent_rs::{Planner, TripParameters};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let planner = Planner::from_env()?;
//!     let params = TripParameters::new("Lisbon", 1000.0, 3, 2)
//!         .with_interests(["food", "history"]);
//!
//!     let itinerary = planner.generate_itinerary(&params).await?;
//!     for key in itinerary.day_keys() {
//!         println!("{}", key);
//!     }
//!     if itinerary.is_degraded() {
//!         println!("plan quality reduced: {:?}", itinerary.reason());
//!     }
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod error;
pub mod schemas;
pub mod services;
pub mod types;

pub use core::{
    AgentProfile, AgentRole, Clock, FixedClock, InMemorySink, MetricsSink, Planner,
    PlannerConfig, ReconcileMetrics, ReconcileStep, SystemClock, TracingSink,
};
pub use error::{PlannerError, Result, SchemaRule};
pub use schemas::{validate_candidate, CompletionSchema, SchemaHandle};
pub use services::{
    extract_heuristically, generate_fallback, normalize_response, parse_structured,
    CompletionModel, CompletionRequest, OpenAIClient, RepairStrategy,
};
pub use types::{
    DayPlan, FallbackReason, ItineraryResult, Origin, ReconcileRun, TripParameters, TripPlan,
};

#[cfg(feature = "cli")]
pub mod cli;
