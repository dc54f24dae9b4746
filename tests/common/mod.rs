#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::{collections::VecDeque, sync::Mutex, time::Duration};
use trip_agent_rs::{
    CompletionModel, CompletionRequest, FixedClock, Planner, PlannerError, Result,
};

/// What the scripted model does on one call
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    ServerError,
    BadRequest,
    /// Never answers within any reasonable timeout
    Hang,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

/// Replays a fixed list of replies; the last one repeats forever.
#[derive(Debug)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    last: Reply,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn always(reply: Reply) -> Self {
        Self::sequence(vec![reply])
    }

    pub fn sequence(replies: Vec<Reply>) -> Self {
        let last = replies.last().cloned().unwrap_or(Reply::text(""));
        Self {
            replies: Mutex::new(replies.into()),
            last,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.clone());

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::ServerError => Err(PlannerError::Api {
                status: 500,
                message: "upstream exploded".to_string(),
            }),
            Reply::BadRequest => Err(PlannerError::Api {
                status: 400,
                message: "bad request".to_string(),
            }),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(String::new())
            }
        }
    }
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()
}

/// Planner over `model` with a frozen clock and millisecond backoff.
pub fn planner<M: CompletionModel + 'static>(model: M) -> Planner {
    Planner::with_model_client(model)
        .with_clock(FixedClock::on(today()))
        .with_backoff(Duration::from_millis(1), Duration::from_millis(4))
}

pub fn day_json(theme: &str) -> Value {
    json!({
        "theme": theme,
        "activities": [
            { "time": "09:00", "activity": format!("{} walk", theme), "cost": 20, "category": "sightseeing" },
            { "time": "15:00", "activity": "Museum", "cost": 12.5, "category": "culture" }
        ],
        "meals": {
            "breakfast": { "name": "Cafe", "cost": 8 },
            "lunch": { "name": "Tasca", "cost": 15 },
            "dinner": { "name": "Bistro", "cost": 30 }
        },
        "transportation": { "method": "Metro", "cost": 6.4 },
        "totalCost": 91.9
    })
}

/// A well-formed answer for `days` days, themed "Theme 1".."Theme N".
pub fn itinerary_json(days: u32) -> Value {
    let mut object = serde_json::Map::new();
    for day in 1..=days {
        object.insert(format!("day{}", day), day_json(&format!("Theme {}", day)));
    }
    Value::Object(object)
}
