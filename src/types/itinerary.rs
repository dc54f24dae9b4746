use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{
    de::Error as _, ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer,
};

use super::trip::{day_key, parse_day_key};
use crate::schemas::completion_schema;

/// Fixed activity vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCategory {
    Sightseeing,
    Culture,
    Food,
    Entertainment,
    Nature,
    #[default]
    Other,
}

impl ActivityCategory {
    pub const ALL: [ActivityCategory; 6] = [
        ActivityCategory::Sightseeing,
        ActivityCategory::Culture,
        ActivityCategory::Food,
        ActivityCategory::Entertainment,
        ActivityCategory::Nature,
        ActivityCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityCategory::Sightseeing => "sightseeing",
            ActivityCategory::Culture => "culture",
            ActivityCategory::Food => "food",
            ActivityCategory::Entertainment => "entertainment",
            ActivityCategory::Nature => "nature",
            ActivityCategory::Other => "other",
        }
    }

    /// Map a free-form label onto the vocabulary; anything unknown is `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "sightseeing" | "tour" | "landmark" | "landmarks" => ActivityCategory::Sightseeing,
            "culture" | "cultural" | "museum" | "history" | "art" => ActivityCategory::Culture,
            "food" | "dining" | "culinary" | "restaurant" => ActivityCategory::Food,
            "entertainment" | "nightlife" | "show" | "music" => ActivityCategory::Entertainment,
            "nature" | "outdoors" | "outdoor" | "park" | "hiking" => ActivityCategory::Nature,
            _ => ActivityCategory::Other,
        }
    }
}

impl fmt::Display for ActivityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scheduled activity within a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Start time in 24h HH:MM format
    #[schemars(regex(pattern = r"^([01]\d|2[0-3]):[0-5]\d$"))]
    pub time: String,
    /// Short name of the activity
    pub activity: String,
    #[serde(default)]
    pub location: String,
    /// Free text, e.g. "2 hours"
    #[serde(default)]
    pub duration: String,
    /// Cost for the whole group in the trip currency
    #[serde(default)]
    #[schemars(range(min = 0))]
    pub cost: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tips: String,
    #[serde(default)]
    pub category: ActivityCategory,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Meal {
    /// Venue name
    pub name: String,
    pub location: String,
    #[schemars(range(min = 0))]
    pub cost: f64,
    pub cuisine: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Meals {
    pub breakfast: Meal,
    pub lunch: Meal,
    pub dinner: Meal,
}

impl Meals {
    pub fn total_cost(&self) -> f64 {
        self.breakfast.cost + self.lunch.cost + self.dinner.cost
    }

    pub fn iter(&self) -> impl Iterator<Item = &Meal> {
        [&self.breakfast, &self.lunch, &self.dinner].into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Transportation {
    pub method: String,
    #[schemars(range(min = 0))]
    pub cost: f64,
    pub notes: String,
}

/// A single day of the itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    /// 1-based position within the trip; always set from the request
    #[schemars(skip)]
    pub day_index: u32,
    /// Calendar date of the day; always set from the request
    #[schemars(skip)]
    pub date: NaiveDate,
    /// Short theme for the day
    #[serde(default)]
    pub theme: String,
    /// Activities in chronological order
    #[schemars(length(min = 1))]
    pub activities: Vec<Activity>,
    pub meals: Meals,
    #[serde(default)]
    pub transportation: Transportation,
    /// Model-reported or estimated spend for the day; not reconciled
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub tips: String,
}

completion_schema!(DayPlan, "day_plan");

impl DayPlan {
    /// Sum of activity, meal and transportation costs.
    pub fn constituent_cost(&self) -> f64 {
        let activities: f64 = self.activities.iter().map(|activity| activity.cost).sum();
        activities + self.meals.total_cost() + self.transportation.cost
    }

    /// Every cost carried by the day, in document order.
    pub fn costs(&self) -> impl Iterator<Item = f64> + '_ {
        self.activities
            .iter()
            .map(|activity| activity.cost)
            .chain(self.meals.iter().map(|meal| meal.cost))
            .chain(std::iter::once(self.transportation.cost))
    }
}

/// Days keyed by their 1-based index; serialized as `{"day1": .., "day2": ..}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DayMap(BTreeMap<u32, DayPlan>);

impl DayMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, plan: DayPlan) -> Option<DayPlan> {
        self.0.insert(plan.day_index, plan)
    }

    pub fn get(&self, day: u32) -> Option<&DayPlan> {
        self.0.get(&day)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DayPlan> {
        self.0.values()
    }

    /// Keys in numeric order
    pub fn keys(&self) -> Vec<String> {
        self.0.keys().map(|day| day_key(*day)).collect()
    }
}

impl FromIterator<DayPlan> for DayMap {
    fn from_iter<T: IntoIterator<Item = DayPlan>>(iter: T) -> Self {
        let mut map = DayMap::new();
        for plan in iter {
            map.insert(plan);
        }
        map
    }
}

impl Serialize for DayMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (day, plan) in &self.0 {
            map.serialize_entry(&day_key(*day), plan)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DayMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, DayPlan>::deserialize(deserializer)?;
        let mut days = BTreeMap::new();
        for (key, mut plan) in raw {
            let day = parse_day_key(&key)
                .ok_or_else(|| D::Error::custom(format!("invalid day key `{}`", key)))?;
            plan.day_index = day;
            days.insert(day, plan);
        }
        Ok(DayMap(days))
    }
}

/// Where the returned days came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Model,
    Fallback,
}

/// Why the pipeline could not return the model's payload verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackReason {
    MalformedPayload,
    SchemaViolation,
    ModelUnavailable,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::MalformedPayload => "MalformedPayload",
            FallbackReason::SchemaViolation => "SchemaViolation",
            FallbackReason::ModelUnavailable => "ModelUnavailable",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryMetadata {
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FallbackReason>,
    /// True when at least one day was not taken verbatim from the model
    #[serde(default)]
    pub repaired: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repaired_days: Vec<u32>,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Final output of a planning request: exactly one day per requested day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryResult {
    days: DayMap,
    metadata: ItineraryMetadata,
}

impl ItineraryResult {
    pub fn new(days: DayMap, metadata: ItineraryMetadata) -> Self {
        Self { days, metadata }
    }

    pub fn days(&self) -> &DayMap {
        &self.days
    }

    pub fn day(&self, day: u32) -> Option<&DayPlan> {
        self.days.get(day)
    }

    pub fn day_keys(&self) -> Vec<String> {
        self.days.keys()
    }

    pub fn metadata(&self) -> &ItineraryMetadata {
        &self.metadata
    }

    pub fn origin(&self) -> Origin {
        self.metadata.origin
    }

    pub fn reason(&self) -> Option<FallbackReason> {
        self.metadata.reason
    }

    /// Whether a consumer should warn that quality may be reduced.
    pub fn is_degraded(&self) -> bool {
        self.metadata.origin == Origin::Fallback || self.metadata.repaired
    }

    pub fn total_cost(&self) -> f64 {
        self.days.iter().map(|day| day.total_cost).sum()
    }
}
