//! Best-effort recovery of a day-keyed itinerary from output that failed
//! strict parsing or validation.
//!
//! Every expected day is produced by the first applicable [`RepairStrategy`]
//! in [`RepairStrategy::ORDER`]; the last one always applies, so extraction
//! never fails.

use std::{collections::BTreeMap, fmt, sync::OnceLock};

use chrono::NaiveDate;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::fallback::{fallback_day, DayShares};
use crate::{
    schemas::validation::{find_day, parse_amount, round_cents, validate_day},
    types::{
        itinerary::{Activity, ActivityCategory, DayPlan},
        trip::{day_key, TripParameters},
    },
};

const MAX_ACTIVITY_NAME: usize = 60;
const MAX_DESCRIPTION: usize = 240;
const MIN_PROSE_WORDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStrategy {
    SalvageParsedDay,
    ScanDayMarker,
    SynthesizeDay,
}

impl RepairStrategy {
    pub const ORDER: [RepairStrategy; 3] = [
        RepairStrategy::SalvageParsedDay,
        RepairStrategy::ScanDayMarker,
        RepairStrategy::SynthesizeDay,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RepairStrategy::SalvageParsedDay => "salvage_parsed_day",
            RepairStrategy::ScanDayMarker => "scan_day_marker",
            RepairStrategy::SynthesizeDay => "synthesize_day",
        }
    }

    pub fn precondition(&self) -> &'static str {
        match self {
            RepairStrategy::SalvageParsedDay => "a parsed object holds this day key",
            RepairStrategy::ScanDayMarker => "the raw text contains a \"day N\" marker",
            RepairStrategy::SynthesizeDay => "always applicable",
        }
    }

    pub fn postcondition(&self) -> &'static str {
        match self {
            RepairStrategy::SalvageParsedDay => "the day value passes validation and is kept verbatim",
            RepairStrategy::ScanDayMarker => "the day has at least one activity scanned from the text",
            RepairStrategy::SynthesizeDay => "the day is the deterministic template day",
        }
    }

    /// Whether days produced by this strategy carry content from the model.
    pub fn uses_model_output(&self) -> bool {
        !matches!(self, RepairStrategy::SynthesizeDay)
    }
}

impl fmt::Display for RepairStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayProvenance {
    pub day: u32,
    pub strategy: RepairStrategy,
}

/// A complete day-keyed candidate plus which strategy produced each day.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicOutcome {
    pub candidate: Value,
    pub provenance: Vec<DayProvenance>,
}

impl HeuristicOutcome {
    pub fn recovered_days(&self) -> Vec<u32> {
        self.provenance
            .iter()
            .filter(|entry| entry.strategy.uses_model_output())
            .map(|entry| entry.day)
            .collect()
    }

    pub fn synthesized_days(&self) -> Vec<u32> {
        self.provenance
            .iter()
            .filter(|entry| !entry.strategy.uses_model_output())
            .map(|entry| entry.day)
            .collect()
    }

    /// True when at least one day came from the model's output.
    pub fn recovered_any(&self) -> bool {
        self.provenance
            .iter()
            .any(|entry| entry.strategy.uses_model_output())
    }

    pub fn strategy_for(&self, day: u32) -> Option<RepairStrategy> {
        self.provenance
            .iter()
            .find(|entry| entry.day == day)
            .map(|entry| entry.strategy)
    }
}

/// Build a complete candidate for `day1..dayN` from whatever the model produced.
pub fn extract_heuristically(
    raw: &str,
    parsed: Option<&Value>,
    params: &TripParameters,
    today: NaiveDate,
) -> HeuristicOutcome {
    let parsed_days = parsed.and_then(Value::as_object);
    let spans = day_spans(raw);

    let mut candidate = Map::new();
    let mut provenance = Vec::with_capacity(params.duration_days as usize);

    for day in 1..=params.duration_days {
        let (strategy, value) = RepairStrategy::ORDER
            .iter()
            .find_map(|strategy| {
                apply_strategy(*strategy, day, parsed_days, &spans, params, today)
                    .map(|value| (*strategy, value))
            })
            .unwrap_or_else(|| {
                (
                    RepairStrategy::SynthesizeDay,
                    day_value(&fallback_day(params, day, today)),
                )
            });

        debug!(
            target: "trip_agent::repair",
            day,
            strategy = strategy.name(),
            "day repaired"
        );

        candidate.insert(day_key(day), value);
        provenance.push(DayProvenance { day, strategy });
    }

    let outcome = HeuristicOutcome {
        candidate: Value::Object(candidate),
        provenance,
    };

    info!(
        target: "trip_agent::repair",
        recovered = ?outcome.recovered_days(),
        synthesized = ?outcome.synthesized_days(),
        "heuristic extraction finished"
    );

    outcome
}

fn apply_strategy(
    strategy: RepairStrategy,
    day: u32,
    parsed_days: Option<&Map<String, Value>>,
    spans: &BTreeMap<u32, &str>,
    params: &TripParameters,
    today: NaiveDate,
) -> Option<Value> {
    match strategy {
        RepairStrategy::SalvageParsedDay => {
            let value = find_day(parsed_days?, day)?;
            validate_day(day, value, params, today).ok()?;
            Some(value.clone())
        }
        RepairStrategy::ScanDayMarker => {
            let span = spans.get(&day)?;
            let activities = scan_activities(span, params);
            if activities.is_empty() {
                return None;
            }
            let mut plan = fallback_day(params, day, today);
            plan.activities = activities;
            plan.tips = String::new();
            plan.total_cost = round_cents(plan.constituent_cost());
            Some(day_value(&plan))
        }
        RepairStrategy::SynthesizeDay => Some(day_value(&fallback_day(params, day, today))),
    }
}

fn day_value(plan: &DayPlan) -> Value {
    serde_json::to_value(plan).unwrap_or_else(|err| {
        warn!(
            target: "trip_agent::repair",
            day = plan.day_index,
            error = %err,
            "failed to serialize repaired day"
        );
        Value::Null
    })
}

fn day_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bday\s*[-#:]?\s*(\d{1,3})\b").expect("valid day marker regex")
    })
}

fn time_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:(?P<h12>1[0-2]|0?[1-9])(?::(?P<m12>[0-5]\d))?\s*(?P<ap>[ap])\.?m\b\.?|(?P<h24>[01]?\d|2[0-3]):(?P<m24>[0-5]\d)\b)",
        )
        .expect("valid time regex")
    })
}

fn range_joiner() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:-|–|—|to|until|till)\s*$").expect("valid range joiner regex")
    })
}

fn json_key() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""[A-Za-z_][A-Za-z0-9_]*"\s*:"#).expect("valid key regex"))
}

fn currency_amount() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)(?:[$€£¥]\s*(?P<pre>\d[\d,]*(?:\.\d+)?))|(?:(?P<post>\d[\d,]*(?:\.\d+)?)\s*(?:usd|eur|gbp|jpy|dollars?|euros?|pounds?|yen)\b)|(?:"?cost"?\s*[:=]\s*"?\s*(?P<field>\d[\d,]*(?:\.\d+)?))"#,
        )
        .expect("valid currency regex")
    })
}

fn duration_phrase() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b\d+(?:\.\d+)?\s*(?:hours?|hrs?|minutes?|mins?)\b")
            .expect("valid duration regex")
    })
}

/// Text following the first marker of each day, up to the next marker of a different day.
fn day_spans(raw: &str) -> BTreeMap<u32, &str> {
    let mut spans = BTreeMap::new();
    let mut current: Option<(u32, usize)> = None;

    for caps in day_marker().captures_iter(raw) {
        let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Ok(day) = number.as_str().parse::<u32>() else {
            continue;
        };

        match current {
            Some((open, _)) if open == day => {}
            Some((open, start)) => {
                spans.entry(open).or_insert(&raw[start..whole.start()]);
                current = Some((day, whole.end()));
            }
            None => current = Some((day, whole.end())),
        }
    }

    if let Some((open, start)) = current {
        spans.entry(open).or_insert(&raw[start..]);
    }

    spans.retain(|day, _| *day > 0);
    spans
}

/// A start time found in a day span; `body` is where its description begins.
#[derive(Debug)]
struct TimeSlot {
    time: String,
    start: usize,
    body: usize,
    /// Length of an explicit range such as "10:00-12:00"
    span: Option<String>,
}

/// Time tokens in order, with "start - end" ranges folded into one slot.
fn time_slots(span: &str) -> Vec<TimeSlot> {
    let tokens: Vec<_> = time_token()
        .captures_iter(span)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((normalize_time(&caps)?, whole.start(), whole.end()))
        })
        .collect();

    let mut slots = Vec::with_capacity(tokens.len());
    let mut idx = 0;
    while idx < tokens.len() {
        let (time, start, end) = &tokens[idx];
        let mut slot = TimeSlot {
            time: time.clone(),
            start: *start,
            body: *end,
            span: None,
        };

        if let Some((until, next_start, next_end)) = tokens.get(idx + 1) {
            if range_joiner().is_match(&span[*end..*next_start]) {
                slot.body = *next_end;
                slot.span = range_length(time, until);
                idx += 1;
            }
        }

        slots.push(slot);
        idx += 1;
    }
    slots
}

/// "10:00" to "12:30" is "2h 30m"; a range past midnight wraps.
fn range_length(from: &str, until: &str) -> Option<String> {
    let minutes = |time: &str| -> Option<u32> {
        let (hour, minute) = time.split_once(':')?;
        Some(hour.parse::<u32>().ok()? * 60 + minute.parse::<u32>().ok()?)
    };
    let (from, until) = (minutes(from)?, minutes(until)?);
    let length = (until + 24 * 60 - from) % (24 * 60);

    match (length / 60, length % 60) {
        (0, 0) => None,
        (0, m) => Some(format!("{} minutes", m)),
        (1, 0) => Some("1 hour".to_string()),
        (h, 0) => Some(format!("{} hours", h)),
        (h, m) => Some(format!("{}h {}m", h, m)),
    }
}

fn scan_activities(span: &str, params: &TripParameters) -> Vec<Activity> {
    let slots = time_slots(span);
    let structured = json_key().is_match(span);

    let mut drafts: Vec<(String, &str, Option<String>)> = Vec::new();
    if slots.is_empty() {
        if !structured && alphabetic_words(&clean_text(span)) >= MIN_PROSE_WORDS {
            drafts.push(("09:00".to_string(), span, None));
        }
    } else {
        for (idx, slot) in slots.iter().enumerate() {
            let end = slots.get(idx + 1).map_or(span.len(), |next| next.start);
            drafts.push((slot.time.clone(), &span[slot.body..end], slot.span.clone()));
        }
    }

    let default_cost = if drafts.is_empty() {
        0.0
    } else {
        round_cents(DayShares::for_trip(params).sightseeing / drafts.len() as f64)
    };

    drafts
        .into_iter()
        .map(|(time, segment, span)| build_activity(time, segment, span, default_cost, params))
        .collect()
}

fn build_activity(
    time: String,
    segment: &str,
    span: Option<String>,
    default_cost: f64,
    params: &TripParameters,
) -> Activity {
    let segment = segment.split('}').next().unwrap_or_default();
    let description = truncate_chars(&clean_text(segment), MAX_DESCRIPTION);

    let name = description
        .split(['.', ';', ',', '(', '\n'])
        .next()
        .map(str::trim)
        .filter(|name| alphabetic_words(name) > 0)
        .map(|name| truncate_chars(name, MAX_ACTIVITY_NAME))
        .unwrap_or_else(|| format!("Free time in {}", params.destination));

    let cost = explicit_cost(segment)
        .filter(|cost| cost.is_finite() && *cost >= 0.0)
        .map(round_cents)
        .unwrap_or(default_cost);

    let duration = span
        .or_else(|| {
            duration_phrase()
                .find(segment)
                .map(|found| found.as_str().to_string())
        })
        .unwrap_or_default();

    Activity {
        time,
        category: infer_category(&description),
        activity: name,
        location: params.destination.clone(),
        duration,
        cost,
        description,
        tips: String::new(),
    }
}

/// Read a whole string such as "9:00", "9 am" or "14:30" as a 24h `HH:MM` time.
pub(crate) fn clock_time(text: &str) -> Option<String> {
    let text = text.trim();
    let caps = time_token().captures(text)?;
    let whole = caps.get(0)?;
    if whole.start() != 0 || whole.end() != text.len() {
        return None;
    }
    normalize_time(&caps)
}

fn normalize_time(caps: &Captures<'_>) -> Option<String> {
    if let Some(hour) = caps.name("h24") {
        let hour: u32 = hour.as_str().parse().ok()?;
        let minute: u32 = caps.name("m24")?.as_str().parse().ok()?;
        return Some(format!("{:02}:{:02}", hour, minute));
    }

    let hour: u32 = caps.name("h12")?.as_str().parse().ok()?;
    let minute: u32 = caps
        .name("m12")
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    let pm = caps
        .name("ap")
        .is_some_and(|ap| ap.as_str().eq_ignore_ascii_case("p"));
    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    Some(format!("{:02}:{:02}", hour, minute))
}

fn explicit_cost(segment: &str) -> Option<f64> {
    let caps = currency_amount().captures(segment)?;
    let amount = caps
        .name("pre")
        .or_else(|| caps.name("post"))
        .or_else(|| caps.name("field"))?;
    parse_amount(amount.as_str())
}

/// Strip JSON keys and punctuation, leaving readable text.
fn clean_text(text: &str) -> String {
    let without_keys = json_key().replace_all(text, " ");
    let stripped: String = without_keys
        .chars()
        .map(|c| if matches!(c, '{' | '}' | '[' | ']' | '"') { ' ' } else { c })
        .collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_string()
}

fn alphabetic_words(text: &str) -> usize {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|word| word.chars().count() >= 2)
        .count()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

fn infer_category(text: &str) -> ActivityCategory {
    const KEYWORDS: [(ActivityCategory, &[&str]); 5] = [
        (
            ActivityCategory::Food,
            &[
                "food", "restaurant", "lunch", "dinner", "breakfast", "cafe", "market", "tasting",
                "cuisine", "brunch",
            ],
        ),
        (
            ActivityCategory::Culture,
            &[
                "culture", "cultural", "museum", "gallery", "temple", "church", "cathedral",
                "history", "historic", "palace", "shrine", "art",
            ],
        ),
        (
            ActivityCategory::Nature,
            &[
                "nature", "park", "garden", "gardens", "hike", "hiking", "beach", "mountain",
                "river", "lake",
            ],
        ),
        (
            ActivityCategory::Entertainment,
            &[
                "entertainment", "show", "concert", "theatre", "theater", "nightlife", "bar",
                "club", "music",
            ],
        ),
        (
            ActivityCategory::Sightseeing,
            &[
                "sightseeing", "tour", "view", "viewpoint", "landmark", "tower", "square", "walk",
                "explore",
            ],
        ),
    ];

    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split(|c: char| !c.is_alphabetic()).collect();

    KEYWORDS
        .iter()
        .find(|(_, keywords)| words.iter().any(|word| keywords.contains(word)))
        .map(|(category, _)| *category)
        .unwrap_or_default()
}
