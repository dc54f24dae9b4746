use chrono::NaiveDate;

use crate::{
    core::clock::Clock,
    schemas::validation::round_cents,
    types::{
        itinerary::{
            Activity, ActivityCategory, DayMap, DayPlan, FallbackReason, ItineraryMetadata,
            ItineraryResult, Meal, Meals, Origin, Transportation,
        },
        sections::{BudgetAnalysis, BudgetCategory, CoordinationPlan, DestinationInsights},
        trip::TripParameters,
    },
};

const GENERIC_THEMES: [&str; 4] = [
    "Highlights",
    "Culture and history",
    "Local neighbourhoods",
    "Food and markets",
];

const BUDGET_SPLIT: [(&str, f64); 5] = [
    ("Accommodation", 40.0),
    ("Food", 25.0),
    ("Activities", 20.0),
    ("Transport", 10.0),
    ("Contingency", 5.0),
];

/// Per-day budget split into the three fallback categories
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DayShares {
    pub sightseeing: f64,
    pub dining: f64,
    pub transport: f64,
}

impl DayShares {
    pub(crate) fn for_trip(params: &TripParameters) -> Self {
        let third = params.per_day_budget().max(0.0) / 3.0;
        Self {
            sightseeing: third,
            dining: third,
            transport: third,
        }
    }
}

pub(crate) fn theme_for_day(params: &TripParameters, day: u32) -> String {
    let index = day.saturating_sub(1) as usize;
    if params.interests.is_empty() {
        return GENERIC_THEMES[index % GENERIC_THEMES.len()].to_string();
    }

    let interests: Vec<&String> = params.interests.iter().collect();
    let interest = interests[index % interests.len()];
    let mut chars = interest.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
        None => GENERIC_THEMES[index % GENERIC_THEMES.len()].to_string(),
    }
}

/// Deterministic placeholder day built only from the request and the date.
pub fn fallback_day(params: &TripParameters, day: u32, today: NaiveDate) -> DayPlan {
    let shares = DayShares::for_trip(params);
    let destination = params.destination.as_str();
    let activity_cost = round_cents(shares.sightseeing / 2.0);
    let meal_cost = round_cents(shares.dining / 3.0);

    let activities = vec![
        Activity {
            time: "09:00".to_string(),
            activity: format!("Explore {} (day {})", destination, day),
            location: destination.to_string(),
            duration: "3 hours".to_string(),
            cost: activity_cost,
            description: format!(
                "Placeholder morning sightseeing in {}; pick a landmark on arrival.",
                destination
            ),
            tips: String::new(),
            category: ActivityCategory::Sightseeing,
        },
        Activity {
            time: "14:00".to_string(),
            activity: format!("Cultural visit in {} (day {})", destination, day),
            location: destination.to_string(),
            duration: "3 hours".to_string(),
            cost: activity_cost,
            description: format!(
                "Placeholder afternoon at a museum or historic site in {}.",
                destination
            ),
            tips: String::new(),
            category: ActivityCategory::Culture,
        },
    ];

    let meal = |slot: &str| Meal {
        name: format!("{} in {} (day {})", slot, destination, day),
        location: destination.to_string(),
        cost: meal_cost,
        cuisine: "Local".to_string(),
        recommendation: String::new(),
    };

    let mut plan = DayPlan {
        day_index: day,
        date: params.date_for_day(day, today),
        theme: theme_for_day(params, day),
        activities,
        meals: Meals {
            breakfast: meal("Breakfast"),
            lunch: meal("Lunch"),
            dinner: meal("Dinner"),
        },
        transportation: Transportation {
            method: "Public transport".to_string(),
            cost: round_cents(shares.transport),
            notes: format!("Local transit around {}", destination),
        },
        total_cost: 0.0,
        highlights: Vec::new(),
        tips: "Generated placeholder plan; confirm opening hours locally.".to_string(),
    };
    plan.total_cost = round_cents(plan.constituent_cost());
    plan
}

pub fn fallback_days(params: &TripParameters, today: NaiveDate) -> DayMap {
    (1..=params.duration_days)
        .map(|day| fallback_day(params, day, today))
        .collect()
}

/// Build a complete template itinerary tagged with why it was needed.
pub fn generate_fallback(
    params: &TripParameters,
    reason: FallbackReason,
    clock: &dyn Clock,
    model: Option<&str>,
) -> ItineraryResult {
    let now = clock.now();
    ItineraryResult::new(
        fallback_days(params, now.date_naive()),
        ItineraryMetadata {
            origin: Origin::Fallback,
            reason: Some(reason),
            repaired: false,
            repaired_days: Vec::new(),
            generated_at: now,
            model: model.map(str::to_string),
        },
    )
}

pub fn fallback_budget_analysis(params: &TripParameters) -> BudgetAnalysis {
    BudgetAnalysis {
        total_budget: round_cents(params.total_budget),
        per_day: round_cents(params.per_day_budget()),
        per_traveler: round_cents(params.per_traveler_budget()),
        categories: BUDGET_SPLIT
            .iter()
            .map(|(name, percentage)| BudgetCategory {
                name: (*name).to_string(),
                amount: round_cents(params.total_budget * percentage / 100.0),
                percentage: *percentage,
            })
            .collect(),
        saving_tips: vec![
            "Book accommodation early and compare neighbourhoods.".to_string(),
            "Use public transport passes instead of taxis.".to_string(),
            "Eat the main meal at lunch when set menus are cheaper.".to_string(),
        ],
        notes: "Standard allocation; adjust once prices are confirmed.".to_string(),
    }
}

pub fn fallback_destination_insights(params: &TripParameters) -> DestinationInsights {
    DestinationInsights {
        destination: params.destination.clone(),
        overview: format!(
            "{} over {} day(s). Detailed destination research is unavailable right now.",
            params.destination, params.duration_days
        ),
        best_areas: vec![format!("Central {}", params.destination)],
        local_tips: vec![
            "Check opening hours before visiting attractions.".to_string(),
            "Carry a small amount of local currency.".to_string(),
        ],
        cultural_notes: vec!["Learn a few greetings in the local language.".to_string()],
        best_time_to_visit: String::new(),
    }
}

pub fn fallback_coordination_plan(params: &TripParameters, today: NaiveDate) -> CoordinationPlan {
    let start = params
        .date_range
        .map(|range| range.start)
        .unwrap_or(today);
    CoordinationPlan {
        summary: format!(
            "{}-day trip to {} for {} traveler(s) starting {}.",
            params.duration_days, params.destination, params.traveler_count, start
        ),
        booking_checklist: vec![
            "Transport to and from the destination".to_string(),
            format!("Accommodation for {} night(s)", params.duration_days),
            "Timed-entry tickets for popular attractions".to_string(),
            "Travel insurance".to_string(),
        ],
        timeline: vec![
            "4 weeks before: book transport and accommodation".to_string(),
            "2 weeks before: reserve attractions and restaurants".to_string(),
            "3 days before: confirm bookings and check the weather".to_string(),
        ],
        contingencies: vec![
            "Keep digital and paper copies of bookings".to_string(),
            "Plan an indoor alternative for each day".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::schemas::validation::validate_candidate;

    fn params() -> TripParameters {
        TripParameters::new("Kyoto", 900.0, 3, 2).with_interests(["temples", "food"])
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
    }

    #[test]
    fn day_splits_budget_into_thirds() {
        let day = fallback_day(&params(), 1, today());
        assert_eq!(day.activities.len(), 2);
        assert_eq!(day.activities[0].time, "09:00");
        assert_eq!(day.activities[1].time, "14:00");
        assert_eq!(day.activities[0].cost, 50.0);
        assert_eq!(day.meals.lunch.cost, 33.33);
        assert_eq!(day.transportation.cost, 100.0);
        assert_eq!(day.total_cost, 299.99);
        assert!(day.total_cost <= params().per_day_budget());
    }

    #[test]
    fn themes_rotate_over_sorted_interests() {
        let days = fallback_days(&params(), today());
        let themes: Vec<_> = days.iter().map(|day| day.theme.clone()).collect();
        assert_eq!(themes, vec!["Food", "Temples", "Food"]);
    }

    #[test]
    fn dates_follow_today_or_range() {
        let days = fallback_days(&params(), today());
        assert_eq!(days.get(3).unwrap().date, NaiveDate::from_ymd_opt(2025, 4, 3).unwrap());

        let start = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 5, 12).unwrap();
        let ranged = fallback_days(&params().with_date_range(start, end), today());
        assert_eq!(ranged.get(1).unwrap().date, start);
    }

    #[test]
    fn fallback_is_deterministic_and_valid() {
        let clock = FixedClock::on(today());
        let a = generate_fallback(&params(), FallbackReason::ModelUnavailable, &clock, None);
        let b = generate_fallback(&params(), FallbackReason::ModelUnavailable, &clock, None);
        assert_eq!(a, b);
        assert_eq!(a.origin(), Origin::Fallback);
        assert_eq!(a.day_keys(), vec!["day1", "day2", "day3"]);

        let value = serde_json::to_value(a.days()).unwrap();
        assert!(validate_candidate(&value, &params(), today()).is_ok());
    }

    #[test]
    fn budget_fallback_sums_to_total() {
        let analysis = fallback_budget_analysis(&params());
        let total: f64 = analysis.categories.iter().map(|c| c.amount).sum();
        assert_eq!(round_cents(total), 900.0);
        assert_eq!(analysis.per_traveler, 450.0);
    }

    #[test]
    fn insights_fallback_names_the_destination() {
        let insights = fallback_destination_insights(&params());
        assert_eq!(insights.destination, params().destination);
        assert!(insights.overview.starts_with(&params().destination));
        assert_eq!(insights.best_areas.len(), 1);
    }
}
