use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{
    itinerary::{FallbackReason, ItineraryResult, Origin},
    trip::TripParameters,
};
use crate::{core::metrics::ReconcileMetrics, schemas::completion_schema};

/// One spending category of the budget analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCategory {
    /// Category label (e.g., "Accommodation")
    pub name: String,
    /// Amount allocated for the whole trip
    #[schemars(range(min = 0))]
    pub amount: f64,
    /// Share of the total budget, 0-100
    #[serde(default)]
    #[schemars(range(min = 0, max = 100))]
    pub percentage: f64,
}

/// Budget analyst output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAnalysis {
    /// Total trip budget in the trip currency
    pub total_budget: f64,
    /// Budget available per day
    #[serde(default)]
    pub per_day: f64,
    /// Budget available per traveler
    #[serde(default)]
    pub per_traveler: f64,
    /// Allocation across spending categories
    #[schemars(length(min = 1))]
    pub categories: Vec<BudgetCategory>,
    /// Concrete ways to save money at the destination
    #[serde(default)]
    pub saving_tips: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

completion_schema!(BudgetAnalysis, "budget_analysis");

/// Destination researcher output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DestinationInsights {
    pub destination: String,
    /// Two or three sentence summary of the destination
    pub overview: String,
    /// Neighbourhoods worth staying in or visiting
    #[serde(default)]
    pub best_areas: Vec<String>,
    #[serde(default)]
    pub local_tips: Vec<String>,
    /// Customs and etiquette a visitor should know
    #[serde(default)]
    pub cultural_notes: Vec<String>,
    #[serde(default)]
    pub best_time_to_visit: String,
}

completion_schema!(DestinationInsights, "destination_insights");

/// Travel coordinator output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoordinationPlan {
    pub summary: String,
    /// Things to book, most urgent first
    #[serde(default)]
    pub booking_checklist: Vec<String>,
    /// Preparation steps leading up to departure
    #[serde(default)]
    pub timeline: Vec<String>,
    /// What to do when plans go wrong
    #[serde(default)]
    pub contingencies: Vec<String>,
}

completion_schema!(CoordinationPlan, "coordination_plan");

/// A planning section together with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section<T> {
    pub content: T,
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FallbackReason>,
}

impl<T> Section<T> {
    pub fn from_model(content: T) -> Self {
        Self {
            content,
            origin: Origin::Model,
            reason: None,
        }
    }

    pub fn fallback(content: T, reason: FallbackReason) -> Self {
        Self {
            content,
            origin: Origin::Fallback,
            reason: Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == Origin::Fallback
    }
}

/// All four planning sections of one trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripPlan {
    pub parameters: TripParameters,
    pub budget: Section<BudgetAnalysis>,
    pub insights: Section<DestinationInsights>,
    pub itinerary: ItineraryResult,
    pub coordination: Section<CoordinationPlan>,
    /// Counters summed over every section
    pub metrics: ReconcileMetrics,
    pub duration: Duration,
}

impl TripPlan {
    /// Number of sections, itinerary included, that were not produced by the model.
    pub fn fallback_sections(&self) -> usize {
        [
            self.budget.is_fallback(),
            self.insights.is_fallback(),
            self.itinerary.origin() == Origin::Fallback,
            self.coordination.is_fallback(),
        ]
        .into_iter()
        .filter(|fallback| *fallback)
        .count()
    }
}
