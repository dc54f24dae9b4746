//! Planning agents are plain configuration records: a role, a goal and the
//! instructions that become the system prompt of one model call.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    BudgetAnalyst,
    DestinationResearcher,
    ItineraryPlanner,
    TravelCoordinator,
}

impl AgentRole {
    /// Name used in logs and metrics
    pub fn component(&self) -> &'static str {
        match self {
            AgentRole::BudgetAnalyst => "budget",
            AgentRole::DestinationResearcher => "insights",
            AgentRole::ItineraryPlanner => "itinerary",
            AgentRole::TravelCoordinator => "coordination",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub role: AgentRole,
    pub name: &'static str,
    pub goal: &'static str,
    pub instructions: &'static str,
    pub max_tokens: u32,
}

impl AgentProfile {
    /// System message for this agent's model call
    pub fn system_prompt(&self) -> String {
        format!(
            "You are the {}. Goal: {} {} You reply with a single JSON object and nothing else.",
            self.name, self.goal, self.instructions
        )
    }
}

pub const BUDGET_ANALYST: AgentProfile = AgentProfile {
    role: AgentRole::BudgetAnalyst,
    name: "Budget Analyst",
    goal: "split the trip budget into realistic spending categories.",
    instructions: "Allocate the total budget across accommodation, food, activities, transport and a contingency reserve, and suggest concrete ways to save money at the destination.",
    max_tokens: 1500,
};

pub const DESTINATION_RESEARCHER: AgentProfile = AgentProfile {
    role: AgentRole::DestinationResearcher,
    name: "Destination Research Specialist",
    goal: "give practical, current insight into the destination.",
    instructions: "Summarise the destination, recommend neighbourhoods to stay in, and list local customs and tips a first-time visitor needs.",
    max_tokens: 1500,
};

pub const ITINERARY_PLANNER: AgentProfile = AgentProfile {
    role: AgentRole::ItineraryPlanner,
    name: "Itinerary Planner",
    goal: "build a day-by-day plan that fits the budget and the travelers' interests.",
    instructions: "Schedule activities in chronological order, include three meals per day and local transportation, and keep each day within the per-day budget.",
    max_tokens: 4000,
};

pub const TRAVEL_COORDINATOR: AgentProfile = AgentProfile {
    role: AgentRole::TravelCoordinator,
    name: "Travel Coordinator",
    goal: "turn the plan into an actionable booking and preparation checklist.",
    instructions: "List what to book and when, a preparation timeline leading up to departure, and contingencies for common disruptions.",
    max_tokens: 1500,
};

pub const ALL_PROFILES: [&AgentProfile; 4] = [
    &BUDGET_ANALYST,
    &DESTINATION_RESEARCHER,
    &ITINERARY_PLANNER,
    &TRAVEL_COORDINATOR,
];

pub fn profile(role: AgentRole) -> &'static AgentProfile {
    match role {
        AgentRole::BudgetAnalyst => &BUDGET_ANALYST,
        AgentRole::DestinationResearcher => &DESTINATION_RESEARCHER,
        AgentRole::ItineraryPlanner => &ITINERARY_PLANNER,
        AgentRole::TravelCoordinator => &TRAVEL_COORDINATOR,
    }
}
