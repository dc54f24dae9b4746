use crate::{
    core::agents::AgentProfile,
    schemas::{CompletionSchema, SchemaHandle},
    types::{itinerary::DayPlan, trip::TripParameters},
};

/// Build the itinerary prompt for a request.
///
/// The prompt embeds the `DayPlan` schema, lists every expected day key and
/// the per-day budget, and forbids anything outside the JSON object.
pub fn build_itinerary_prompt(params: &TripParameters) -> String {
    let day_keys = params
        .day_keys()
        .iter()
        .map(|key| format!("\"{}\"", key))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Plan a {days}-day trip to {destination} for {travelers} traveler(s).\n\
         {context}\n\
         Total budget: {total:.2}. Budget per day: {per_day:.2}. Keep each day within the per-day budget.\n\n\
         Respond with ONE JSON object whose keys are exactly {day_keys}. \
         Each value is a day plan matching this JSON schema:\n{schema}\n\n\
         Rules:\n\
         - every day has at least one activity and a meals block with breakfast, lunch and dinner\n\
         - times use 24h HH:MM format\n\
         - all costs are non-negative numbers without currency symbols\n\
         - dayIndex and date are filled in automatically; you may omit them\n\
         - do not wrap the JSON in code fences and do not add any text before or after it",
        days = params.duration_days,
        destination = params.destination,
        travelers = params.traveler_count,
        context = trip_context(params),
        total = params.total_budget,
        per_day = params.per_day_budget(),
        day_keys = day_keys,
        schema = DayPlan::schema().pretty(),
    )
}

/// Build the prompt of a non-itinerary planning agent.
pub fn build_agent_prompt(
    profile: &AgentProfile,
    params: &TripParameters,
    schema: &SchemaHandle,
) -> String {
    format!(
        "Task for the {name}: {goal}\n\n\
         Trip: {days} day(s) in {destination} for {travelers} traveler(s), total budget {total:.2} \
         ({per_day:.2} per day, {per_traveler:.2} per traveler).\n\
         {context}\n\n\
         Respond with ONE JSON object matching this JSON schema:\n{schema}\n\n\
         Do not add any text outside the JSON object.",
        name = profile.name,
        goal = profile.goal,
        days = params.duration_days,
        destination = params.destination,
        travelers = params.traveler_count,
        total = params.total_budget,
        per_day = params.per_day_budget(),
        per_traveler = params.per_traveler_budget(),
        context = trip_context(params),
        schema = schema.pretty(),
    )
}

fn trip_context(params: &TripParameters) -> String {
    let interests = if params.interests.is_empty() {
        "Interests: general sightseeing.".to_string()
    } else {
        format!(
            "Interests: {}.",
            params
                .interests
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        )
    };

    match params.date_range {
        Some(range) => format!("Dates: {} to {}. {}", range.start, range.end, interests),
        None => interests,
    }
}
