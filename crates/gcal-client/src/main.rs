//! gcal CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use gcal_core::{TracingConfig, init_tracing};
use gcal_events::{CalendarSettings, EventsGateway};

use gcal_client::cli::{Cli, Command, ConfigAction};
use gcal_client::commands::events::{self, CreateArgs, ListArgs};
use gcal_client::commands::config;
use gcal_client::error::ClientResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing = if cli.debug {
        TracingConfig::debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: logging disabled: {}", e);
    }

    match run(cli).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<String> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(CalendarSettings::default_path);
    let mut settings = match cli.config {
        Some(ref path) => CalendarSettings::load_from(path)?,
        None => CalendarSettings::load()?,
    };
    if let Some(calendar_id) = cli.calendar {
        settings.calendar_id = Some(calendar_id);
    }

    let json = cli.json;
    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Dump => config::dump(&settings, &config_path),
            ConfigAction::Validate => config::validate(&settings),
            ConfigAction::Path => Ok(config::path(&config_path)),
        },
        Command::List {
            from,
            to,
            order_by,
            query,
        } => {
            let gateway = gateway(&settings)?;
            let args = ListArgs {
                from,
                to,
                order_by,
                query,
            };
            events::render(&events::list(gateway.as_ref(), args, None).await?, json)
        }
        Command::Show { id } => {
            let gateway = gateway(&settings)?;
            events::render_one(&events::show(gateway.as_ref(), &id, None).await?, json)
        }
        Command::Create {
            summary,
            start,
            end,
            all_day,
            description,
            location,
            attendee,
            meet,
        } => {
            let gateway = gateway(&settings)?;
            let args = CreateArgs {
                summary,
                start,
                end,
                all_day,
                description,
                location,
                attendees: attendee,
                meet,
            };
            events::render_one(&events::create(gateway.as_ref(), args, None).await?, json)
        }
        Command::QuickAdd { text } => {
            let gateway = gateway(&settings)?;
            events::render_one(&events::quick_add(gateway.as_ref(), &text, None).await?, json)
        }
        Command::Delete { id } => {
            let gateway = gateway(&settings)?;
            events::delete(gateway.as_ref(), &id, None).await?;
            Ok(format!("Deleted {}.", id))
        }
    }
}

#[cfg(feature = "google")]
fn gateway(settings: &CalendarSettings) -> ClientResult<Arc<dyn EventsGateway>> {
    settings.validate()?;
    Ok(Arc::new(gcal_events::GoogleEvents::from_settings(settings)?))
}

#[cfg(not(feature = "google"))]
fn gateway(_settings: &CalendarSettings) -> ClientResult<Arc<dyn EventsGateway>> {
    Err(gcal_client::ClientError::argument(
        "gcal was built without the `google` feature",
    ))
}
