pub mod agents;
pub mod clock;
pub mod config;
pub mod metrics;
pub mod planner;
pub mod steps;

pub use agents::{AgentProfile, AgentRole};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::PlannerConfig;
pub use metrics::{InMemorySink, MetricsSink, ReconcileMetrics, TracingSink};
pub use planner::Planner;
pub use steps::{ReconcileStep, RunLog};
