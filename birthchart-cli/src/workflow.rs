//! Drives one birth chart session from the command line.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use birthchart_core::{
    ChannelAutocomplete, Config, FormState, HttpChartService, LocationResolver, PlaceSearch,
    PlaceSelection, RequestOrchestrator, Session, TimezoneOffset, TimezoneSource,
    provider::{default_place_search_from_config, timezone_lookup_from_config},
};
use log::warn;
use tokio::sync::watch;

use crate::{cli::ChartArgs, prompt, render};

pub async fn run_chart(args: ChartArgs) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = args.service_url {
        config.service_url = Some(url);
    }
    if let Some(contract) = args.contract {
        config.contract = contract;
    }
    let timeout = config.request_timeout();

    let search = default_place_search_from_config(&config)?;
    let service = Arc::new(HttpChartService::new(config.service_url(), config.contract));

    let session = Session::new();
    let autocomplete = ChannelAutocomplete::new();
    let mut resolver =
        LocationResolver::new(session.clone(), timezone_lookup_from_config(&config), timeout);
    resolver.on_city_input_mounted(&autocomplete);
    let orchestrator = RequestOrchestrator::new(session.clone(), service, timeout);

    let date = match args.date {
        Some(date) => date,
        None => prompt::date()?,
    };
    session.set_date(date)?;

    let time = match args.time {
        Some(time) => time,
        None => prompt::time()?,
    };
    session.set_time(time)?;

    let typed = match args.city {
        Some(city) => city,
        None => prompt::city()?,
    };
    session.set_city(typed.as_str());

    let selection = choose_place(search.as_ref(), &typed, args.first_match).await?;
    let mut updates = session.subscribe();
    let revision = session.snapshot().place_revision();
    if !autocomplete.emit(selection) {
        bail!("city input is not connected to the location resolver");
    }
    let settled = wait_for_place(&mut updates, revision, timeout).await?;

    match args.tz_offset {
        Some(hours) => session.set_manual_timezone(TimezoneOffset::from_hours(hours)?),
        None => match settled.timezone_offset() {
            Some(offset) if settled.timezone_source() == Some(TimezoneSource::Resolved) => {
                eprintln!("Detected time zone offset {offset} (as of today)");
            }
            _ => {
                if let Some(notice) = settled.notice() {
                    eprintln!("{notice}");
                }
                session.set_manual_timezone(prompt::timezone_offset()?);
            }
        },
    }

    let state = orchestrator.submit().await?;
    resolver.teardown();

    render::render(&state, args.format)
}

async fn choose_place(
    search: &dyn PlaceSearch,
    typed: &str,
    first_match: bool,
) -> Result<PlaceSelection> {
    let candidates = match search.suggest(typed).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!("place search failed: {e:#}");
            Vec::new()
        }
    };

    if candidates.is_empty() {
        eprintln!("No matching places found; using \"{typed}\" as typed.");
        return Ok(PlaceSelection::unresolved(typed));
    }

    if first_match || candidates.len() == 1 {
        let mut candidates = candidates;
        return Ok(candidates.swap_remove(0));
    }

    prompt::place(typed, candidates)
}

/// Wait until the resolver has recorded a newer place and any timezone
/// lookup for it has finished.
async fn wait_for_place(
    updates: &mut watch::Receiver<FormState>,
    revision: u64,
    timeout: std::time::Duration,
) -> Result<FormState> {
    let settled = tokio::time::timeout(
        timeout * 2,
        updates.wait_for(|form| form.place_revision() > revision && !form.is_resolving()),
    )
    .await
    .context("Timed out waiting for the selected place to resolve")?
    .context("Location resolver stopped unexpectedly")?
    .clone();

    Ok(settled)
}
