pub mod itinerary;
pub mod result;
pub mod sections;
pub mod trip;

pub use itinerary::{
    Activity, ActivityCategory, DayMap, DayPlan, FallbackReason, ItineraryMetadata,
    ItineraryResult, Meal, Meals, Origin, Transportation,
};
pub use result::ReconcileRun;
pub use sections::{
    BudgetAnalysis, BudgetCategory, CoordinationPlan, DestinationInsights, Section, TripPlan,
};
pub use trip::{DateRange, TripParameters};
