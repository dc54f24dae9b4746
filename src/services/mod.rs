pub mod fallback;
mod fanout;
pub mod heuristic;
pub mod normalizer;
pub mod openai_client;
pub mod parser;
pub mod prompt;
mod reconcile;

pub use fallback::{fallback_day, fallback_days, generate_fallback};
pub use heuristic::{extract_heuristically, DayProvenance, HeuristicOutcome, RepairStrategy};
pub use normalizer::normalize_response;
pub use openai_client::{CompletionModel, CompletionRequest, OpenAIClient};
pub use parser::parse_structured;
pub use prompt::{build_agent_prompt, build_itinerary_prompt};
