use crate::{OpenAIClient, Planner, TripParameters};
use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::{env, time::Duration};
use tracing::{info, warn};

fn command() -> Command {
    Command::new("trip-agent")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Plan a trip with an LLM and always get a complete day-by-day itinerary back")
        .arg(
            Arg::new("destination")
                .help("Where to travel, e.g. \"Lisbon, Portugal\"")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("budget")
                .short('b')
                .long("budget")
                .value_name("AMOUNT")
                .help("Total trip budget")
                .required(true)
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("days")
                .short('d')
                .long("days")
                .value_name("COUNT")
                .help("Trip duration in days")
                .required(true)
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("travelers")
                .short('n')
                .long("travelers")
                .value_name("COUNT")
                .help("Number of travelers")
                .default_value("1")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("interest")
                .short('i')
                .long("interest")
                .value_name("TOPIC")
                .help("Traveler interest; repeat for several")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("start-date")
                .short('s')
                .long("start-date")
                .value_name("YYYY-MM-DD")
                .help("First day of the trip"),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("MODEL")
                .help("Model to use (or set TRIP_AGENT_MODEL)"),
        )
        .arg(
            Arg::new("api-key")
                .short('k')
                .long("api-key")
                .value_name("KEY")
                .help("API key (or set OPENAI_API_KEY env var)"),
        )
        .arg(
            Arg::new("base-url")
                .short('u')
                .long("base-url")
                .value_name("URL")
                .help("API base URL (or set OPENAI_BASE_URL / OPENROUTER_BASE_URL env vars)"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("SECONDS")
                .help("Per-call model timeout in seconds")
                .default_value("30")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("retries")
                .short('r')
                .long("retries")
                .value_name("COUNT")
                .help("Retries after a failed model call")
                .default_value("3")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("json-mode")
                .long("json-mode")
                .help("Request a JSON object response format from the provider")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("full")
                .long("full")
                .help("Run all planning agents instead of the itinerary only")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("trace")
                .long("trace")
                .help("Print the reconciliation trace to stderr")
                .action(ArgAction::SetTrue),
        )
}

fn trip_parameters(matches: &ArgMatches) -> anyhow::Result<TripParameters> {
    let destination = matches
        .get_one::<String>("destination")
        .ok_or_else(|| anyhow!("destination is required"))?;
    let budget = *matches
        .get_one::<f64>("budget")
        .ok_or_else(|| anyhow!("--budget is required"))?;
    let days = *matches
        .get_one::<u32>("days")
        .ok_or_else(|| anyhow!("--days is required"))?;
    let travelers = matches.get_one::<u32>("travelers").copied().unwrap_or(1);

    let interests = matches
        .get_many::<String>("interest")
        .map(|values| values.cloned().collect::<Vec<_>>())
        .unwrap_or_default();

    let mut params =
        TripParameters::new(destination.as_str(), budget, days, travelers).with_interests(interests);

    if let Some(start) = matches.get_one::<String>("start-date") {
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
            .with_context(|| format!("invalid --start-date `{}`", start))?;
        let end = start
            .checked_add_days(chrono::Days::new(u64::from(days.saturating_sub(1))))
            .ok_or_else(|| anyhow!("--start-date is too far in the future"))?;
        params = params.with_date_range(start, end);
    }

    Ok(params)
}

fn planner(matches: &ArgMatches) -> anyhow::Result<Planner> {
    let api_key = matches
        .get_one::<String>("api-key")
        .cloned()
        .or_else(|| env::var("OPENAI_API_KEY").ok())
        .context("API key is required. Set OPENAI_API_KEY environment variable or use --api-key")?;

    let mut client = OpenAIClient::new(api_key);
    if let Some(base_url) = matches
        .get_one::<String>("base-url")
        .cloned()
        .or_else(|| env::var("OPENAI_BASE_URL").ok())
        .or_else(|| env::var("OPENROUTER_BASE_URL").ok())
    {
        client = client.with_base_url(base_url);
    }

    let mut planner = Planner::with_model_client(client)
        .with_timeout(Duration::from_secs(
            matches.get_one::<u64>("timeout").copied().unwrap_or(30),
        ))
        .with_max_retries(matches.get_one::<usize>("retries").copied().unwrap_or(3))
        .with_json_mode(matches.get_flag("json-mode"));

    if let Some(model) = matches
        .get_one::<String>("model")
        .cloned()
        .or_else(|| env::var("TRIP_AGENT_MODEL").ok())
    {
        planner = planner.with_model(model);
    }

    Ok(planner)
}

/// CLI entry point for the trip-agent tool
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let matches = command().get_matches();
    let params = trip_parameters(&matches)?;
    let planner = planner(&matches)?;

    info!(
        destination = %params.destination,
        days = params.duration_days,
        model = %planner.config().model,
        "planning trip"
    );

    let output = if matches.get_flag("full") {
        let plan = planner.plan_trip(&params).await?;
        if matches.get_flag("trace") {
            eprintln!("{:#?}", plan.metrics);
        }
        serde_json::to_string_pretty(&plan)?
    } else {
        let run = planner.generate_itinerary_with_trace(&params).await?;
        if matches.get_flag("trace") {
            eprintln!("{}", run.replay());
        }
        if run.result.is_degraded() {
            warn!(reason = ?run.result.reason(), "itinerary quality is reduced");
        }
        serde_json::to_string_pretty(&run.result)?
    };

    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trip_arguments() {
        let matches = command()
            .try_get_matches_from([
                "trip-agent",
                "Lisbon",
                "--budget",
                "1200",
                "--days",
                "3",
                "--interest",
                "food",
                "--interest",
                "history",
                "--start-date",
                "2025-06-01",
            ])
            .unwrap();

        let params = trip_parameters(&matches).unwrap();
        assert_eq!(params.destination, "Lisbon");
        assert_eq!(params.traveler_count, 1);
        assert_eq!(params.interests.len(), 2);
        let range = params.date_range.unwrap();
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2025, 6, 3).unwrap());
    }

    #[test]
    fn rejects_bad_start_date() {
        let matches = command()
            .try_get_matches_from([
                "trip-agent", "Rome", "-b", "500", "-d", "2", "-s", "June 1st",
            ])
            .unwrap();
        assert!(trip_parameters(&matches).is_err());
    }

    #[test]
    fn budget_and_days_are_required() {
        assert!(command()
            .try_get_matches_from(["trip-agent", "Rome"])
            .is_err());
    }
}
