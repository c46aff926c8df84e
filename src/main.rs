use std::sync::Arc;

use anyhow::Result;
use skycast_app::{
    ChannelNotifier, ForecastState, HistoryState, Notification, Session, SuggestionState,
};
use skycast_core::{AppError, Config};
use skycast_weather::{format_location, WeatherForecast};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

const HELP: &str = "\
Commands:
  search <city>   show weather for a city
  suggest <text>  list matching cities
  pick <n>        show weather for suggestion n
  here            show weather for the current location
  history         list recent searches
  open <n>        show weather for history entry n
  remove <n>      remove history entry n
  undo            restore the last removed entry
  clear           clear search history
  quit            exit";

#[tokio::main]
async fn main() -> Result<()> {
    skycast_core::init()?;

    let (config, _validation) = match Config::load_validated() {
        Ok(loaded) => loaded,
        Err(e) => {
            let e = AppError::from_anyhow(e);
            eprintln!("{}", e.user_message());
            return Err(e.into());
        }
    };

    let (notifier, notifications) = ChannelNotifier::new();
    let session = match Session::from_config(&config, Arc::new(notifier)) {
        Ok(session) => session,
        Err(e) if e.is_persistent() => {
            eprintln!("{}", e.user_message());
            eprintln!("  {}", e);
            eprintln!(
                "Set api.api_key in {} or the {} environment variable.",
                config.config_dir.join("config.toml").display(),
                skycast_core::config::API_KEY_ENV
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!("Skycast started");

    tokio::spawn(print_notifications(notifications));
    tokio::spawn(print_forecasts(session.forecast().subscribe()));
    tokio::spawn(print_suggestions(session.suggestions().subscribe()));

    session.start();
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));
        let arg = arg.trim();

        match command {
            "" => {}
            "search" => {
                session.search(arg).await;
            }
            "suggest" => session.type_query(arg),
            "pick" => {
                let picked = index(arg)
                    .and_then(|i| session.suggestions().state().suggestions.get(i).cloned());
                match picked {
                    Some(suggestion) => {
                        session.select_suggestion(&suggestion).await;
                    }
                    None => println!("No such suggestion"),
                }
            }
            "here" => {
                session.use_current_location().await;
            }
            "history" => print_history(&session.history().state()),
            "open" => match index(arg).and_then(|i| session.history().items().get(i).cloned()) {
                Some(item) => {
                    session.select_history(&item).await;
                }
                None => println!("No such history entry"),
            },
            "remove" => match index(arg).and_then(|i| session.history().items().get(i).cloned()) {
                Some(item) => {
                    session.remove_history(&item.id);
                    print_history(&session.history().state());
                }
                None => println!("No such history entry"),
            },
            "undo" => {
                session.undo_remove();
                print_history(&session.history().state());
            }
            "clear" => {
                session.clear_history();
                print_history(&session.history().state());
            }
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            other => println!("Unknown command: {} (try \"help\")", other),
        }
    }

    session.shutdown();
    tracing::info!("Skycast stopped");
    Ok(())
}

/// 1-based list position to index
fn index(arg: &str) -> Option<usize> {
    arg.parse::<usize>().ok()?.checked_sub(1)
}

async fn print_notifications(mut rx: mpsc::UnboundedReceiver<Notification>) {
    while let Some(notification) = rx.recv().await {
        println!("! {}", notification.message);
    }
}

async fn print_forecasts(mut rx: watch::Receiver<ForecastState>) {
    let mut last: Option<WeatherForecast> = None;
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if state.loading {
            continue;
        }
        if let Some(error) = &state.error {
            println!("Error: {}", error);
        }
        if state.forecast.is_some() && state.forecast != last {
            if let Some(forecast) = &state.forecast {
                print_forecast(forecast);
            }
            last = state.forecast;
        }
    }
}

fn print_forecast(forecast: &WeatherForecast) {
    println!();
    println!("{} ({})", forecast.city, forecast.location_label());
    println!(
        "  {}°  {}  (min {}° / max {}°)",
        forecast.temperature, forecast.description, forecast.temp_min, forecast.temp_max
    );
    println!(
        "  wind {} m/s  humidity {}%  pressure {} hPa",
        forecast.wind_speed, forecast.humidity, forecast.pressure
    );
    println!("  {}", forecast.icon_url());
}

async fn print_suggestions(mut rx: watch::Receiver<SuggestionState>) {
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if state.loading || state.suggestions.is_empty() {
            continue;
        }
        for (i, s) in state.suggestions.iter().enumerate() {
            let label = format_location(s.state.as_deref(), Some(&s.country));
            println!("  {}. {} ({})", i + 1, s.name, label);
        }
    }
}

fn print_history(state: &HistoryState) {
    if state.items.is_empty() {
        println!("No recent searches");
    }
    for (i, item) in state.items.iter().enumerate() {
        let label = format_location(item.state.as_deref(), item.country.as_deref());
        println!("  {}. {} ({})", i + 1, item.city, label);
    }
    if state.can_undo {
        println!("  (undo available)");
    }
}
