use std::sync::Arc;

use anyhow::Result;
use citylens_core::{AppError, Config};
use citylens_geo::{Coordinate, OpenWeatherClient};
use citylens_services::{OverpassClient, PoiCategory};
use citylens_session::{SessionController, SessionEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "\
Commands:
  search <city>      resolve a city and show its weather
  pick <n>           choose candidate n from the last list
  cancel             dismiss the candidate list
  here <lat> <lon>   use a device position
  poi <category>     restaurant, park, shop or hotel
  focus <id>         focus a place from the last results
  link               print a map link
  quit";

#[derive(Debug, PartialEq)]
enum Command {
    Search(String),
    Pick(usize),
    Cancel,
    Here(f64, f64),
    Poi(String),
    Focus(String),
    Link,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match verb {
        "search" => Some(Command::Search(rest.to_string())),
        "pick" => rest.parse().ok().map(Command::Pick),
        "cancel" => Some(Command::Cancel),
        "here" => {
            let mut parts = rest.split_whitespace();
            let lat = parts.next()?.trim_end_matches(',').parse().ok()?;
            let lon = parts.next()?.parse().ok()?;
            Some(Command::Here(lat, lon))
        }
        "poi" => Some(Command::Poi(rest.to_string())),
        "focus" => Some(Command::Focus(rest.to_string())),
        "link" => Some(Command::Link),
        "help" | "?" => Some(Command::Help),
        "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::LocationResolved { location, weather } => {
            println!("📍 {}", location.display_name);
            println!(
                "   {} (feels like {}), {}",
                weather.display_temperature(),
                weather.display_feels_like(),
                weather.description
            );
            println!(
                "   Humidity {}%, wind {}",
                weather.humidity,
                weather.display_wind()
            );
        }
        SessionEvent::CandidatesOffered(offer) => {
            println!("Several places match:");
            for (i, candidate) in offer.candidates.iter().enumerate() {
                println!("  [{}] {}", i, candidate.label());
            }
            println!("Use 'pick <n>' to choose.");
        }
        SessionEvent::NoMatch { query } => println!("No city found for '{}'", query),
        SessionEvent::SelectionCancelled => println!("Selection cancelled"),
        SessionEvent::PoiSearchStarted { category, .. } => {
            println!("{} Searching {}s...", category.emoji(), category)
        }
        SessionEvent::PoiRetry { progress, .. } => println!("   {}...", progress),
        SessionEvent::PoisLoaded { category, count } => {
            println!("{} {} {}(s) found", category.emoji(), count, category)
        }
        SessionEvent::PoiSearchDiscarded { .. } => {}
        SessionEvent::PoiFocused { id, coordinate } => {
            println!("Focused {} at {}", id, coordinate.label())
        }
        SessionEvent::Failed { message, .. } => println!("⚠ {}", message),
    }
}

fn print_places(session: &SessionController) {
    for record in session.pois() {
        let mut line = format!("  {}  {}", record.id, record.name);
        if let Some(cuisine) = record.cuisine() {
            line.push_str(&format!(" ({})", cuisine));
        }
        if let Some(street) = record.street() {
            line.push_str(&format!(", {}", street));
        }
        println!("{}", line);
    }
}

async fn run_command(
    session: &mut SessionController,
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    command: Command,
) -> Result<(), AppError> {
    match command {
        Command::Search(query) => {
            session.search_text(&query).await?;
        }
        Command::Pick(index) => {
            session.select_candidate(index).await?;
        }
        Command::Cancel => {
            if !session.cancel_selection() {
                println!("Nothing to cancel");
            }
        }
        Command::Here(lat, lon) => {
            let coordinate = match Coordinate::new(lat, lon) {
                Ok(coordinate) => coordinate,
                Err(e) => {
                    println!("⚠ {}", e);
                    return Ok(());
                }
            };
            session.use_device_location(coordinate).await?;
        }
        Command::Poi(name) => {
            let category: PoiCategory = match name.parse() {
                Ok(category) => category,
                Err(_) => {
                    println!("⚠ Unknown category '{}'. Try restaurant, park, shop or hotel.", name);
                    return Ok(());
                }
            };
            session.select_category(category).await?;
            drain_events(events);
            print_places(session);
        }
        Command::Focus(id) => {
            session.focus_poi(&id)?;
        }
        Command::Link => println!("{}", session.map_link()?),
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

fn drain_events(events: &mut mpsc::UnboundedReceiver<SessionEvent>) {
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    citylens_core::init()?;

    let (config, _validation) = match Config::load_validated() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("⚠ {}", e.user_message());
            return Err(e.into());
        }
    };
    tracing::info!("Config directory: {}", config.config_dir.display());

    let geo = Arc::new(OpenWeatherClient::new(&config.providers)?);
    let places = Arc::new(OverpassClient::new(&config.providers)?);
    let (mut session, mut events) = SessionController::from_config(geo, places, &config)?;

    println!("CityLens - city weather and places");
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let Some(command) = parse_command(&line) else {
            println!("Unknown command. Type 'help' for a list.");
            continue;
        };
        if command == Command::Quit {
            break;
        }

        // Session failures arrive as `SessionEvent::Failed`
        if let Err(e) = run_command(&mut session, &mut events, command).await {
            tracing::debug!("Command failed: {}", e);
        }
        drain_events(&mut events);
    }

    tracing::info!("CityLens shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("search  New York "),
            Some(Command::Search("New York".to_string()))
        );
        assert_eq!(parse_command("pick 1"), Some(Command::Pick(1)));
        assert_eq!(parse_command("pick x"), None);
        assert_eq!(
            parse_command("here 40.7, -74.0"),
            Some(Command::Here(40.7, -74.0))
        );
        assert_eq!(parse_command("here 40.7"), None);
        assert_eq!(parse_command("poi park"), Some(Command::Poi("park".to_string())));
        assert_eq!(parse_command("link"), Some(Command::Link));
        assert_eq!(parse_command("quit"), Some(Command::Quit));
        assert_eq!(parse_command("dance"), None);
    }
}
