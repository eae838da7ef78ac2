use crate::core::{
    error::{Error, ErrorKind, Result},
    fetcher::HistoryFetcher,
    history::History,
    record::NotificationRecord,
    refresher::{every, SummaryRefresher, SystemClock},
    registration::{
        RegistrationOutcome, RegistrationState, RegistrationTracker,
    },
    store::{HistoryStore, RegistrationStore},
    summary::Summary,
    sync::Synchronizer,
};
use chrono::{DateTime, Local, Utc};
use log::{info, warn};
use std::time::Duration;

pub async fn sync<S, F>(synchronizer: &Synchronizer<S, F>) -> Result<()>
where
    S: HistoryStore,
    F: HistoryFetcher,
{
    synchronizer.load().await?;
    let outcome = synchronizer.sync().await;
    println!("Notification History");
    println!("{}", outcome.summary.render(Utc::now()));
    Ok(())
}

pub async fn watch<S, F>(
    synchronizer: &Synchronizer<S, F>,
    period: Duration,
) -> Result<()>
where
    S: HistoryStore,
    F: HistoryFetcher,
{
    synchronizer.load().await?;
    let outcome = synchronizer.sync().await;
    println!("Notification History");
    if !matches!(outcome.summary, Summary::LastPosted(_)) {
        println!("{}", outcome.summary.render(Utc::now()));
        return Ok(());
    }

    let refresher =
        SummaryRefresher::start(outcome.summary, SystemClock, every(period));
    let mut updates = refresher.subscribe();
    println!("{}", *updates.borrow_and_update());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", *updates.borrow_and_update());
            }
            _ = &mut ctrl_c => {
                info!("interrupted, stopping summary refresher");
                break;
            }
        }
    }
    refresher.stop().await;
    Ok(())
}

pub async fn history<S>(store: &S) -> Result<()>
where
    S: HistoryStore,
{
    let history = History::from_records(store.load_history().await?);
    if history.is_empty() {
        println!("No notifications posted yet");
        return Ok(());
    }
    for record in history.records() {
        println!("{}", format_record_line(record));
    }
    Ok(())
}

pub async fn show<S>(store: &S, id: &str) -> Result<()>
where
    S: HistoryStore,
{
    let history = History::from_records(store.load_history().await?);
    let record = find_record(&history, id)?;
    print!("{}", format_record_details(record));
    Ok(())
}

/// Looks a record up by identifier. A bare id that names records of both
/// kinds is rejected; `bytes:` or `text:` picks one.
pub fn find_record<'a>(
    history: &'a History,
    query: &str,
) -> Result<&'a NotificationRecord> {
    let mut found = history.records().iter().filter(|r| r.id.matches(query));
    match (found.next(), found.next()) {
        (Some(record), None) => Ok(record),
        (None, _) => Err(Error::new(
            format!("notification not found(id: {})", query),
            ErrorKind::NotFound,
        )),
        (Some(first), Some(second)) => Err(Error::new(
            format!(
                "notification id {} is ambiguous, use {} or {}",
                query,
                first.id.qualified(),
                second.id.qualified()
            ),
            ErrorKind::Ambiguous,
        )),
    }
}

pub async fn status<S>(tracker: &RegistrationTracker<S>) -> Result<()>
where
    S: RegistrationStore,
{
    print!("{}", format_status(&tracker.state()));
    Ok(())
}

pub async fn register<S>(
    tracker: &RegistrationTracker<S>,
    token: Option<&str>,
    failure: Option<&str>,
) -> Result<()>
where
    S: RegistrationStore,
{
    let (completion, pending) = tracker.begin_attempt();
    match (failure, token) {
        (Some(reason), _) => completion.fail(reason),
        (None, Some(token)) => completion.succeed(&parse_hex(token)?),
        (None, None) => completion.fail("no device token"),
    }
    let report = tracker.complete(pending).await;
    match report.outcome {
        RegistrationOutcome::Succeeded { .. } => {
            print!("{}", format_status(&tracker.state()));
        }
        RegistrationOutcome::Failed { reason } => {
            println!("Failed to Register with APNs");
            println!(
                "An error occurred while trying to register with APNs ({}). \
                 Give it another shot, or try again later.",
                reason
            );
        }
    }
    if let Some(e) = report.error {
        warn!("registration state was not saved: {}", e);
    }
    Ok(())
}

fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%-m/%-d/%Y %-I:%M %p")
        .to_string()
}

pub fn format_record_line(record: &NotificationRecord) -> String {
    format!(
        "{}  {}  {}  {}",
        format_local(record.posted),
        record.id.qualified(),
        record.topic,
        record.payload.title
    )
}

pub fn format_record_details(record: &NotificationRecord) -> String {
    let mut out = String::new();
    out.push_str("Metadata\n");
    out.push_str(&format!("  Topic: {}\n", record.topic));
    let posted = format_local(record.posted);
    out.push_str(&format!("  Creation Time: {}\n", posted));
    if let Some(category) = &record.category {
        out.push_str(&format!("  Category: {}\n", category));
    }
    out.push_str(&format!("  Identifier: {}\n", record.id.qualified()));
    out.push_str("Payload\n");
    out.push_str(&format!("  Title: {}\n", record.payload.title));
    out.push_str(&format!("  Message: {}\n", record.payload.body));
    out
}

pub fn format_status(state: &RegistrationState) -> String {
    let mut out = String::new();
    let label = if state.registered {
        "Registered"
    } else {
        "Unregistered"
    };
    out.push_str(&format!("APNs State: {}\n", label));
    if state.registered {
        if let Some(at) = state.last_registered {
            let at = format_local(at);
            out.push_str(&format!("Registration Date: {}\n", at));
        }
    }
    match (&state.token, state.registered) {
        (Some(token), true) => {
            out.push_str(&format!("APNs Token: {}\n", token))
        }
        _ => out.push_str("APNs Token: No value provided\n"),
    }
    out
}

pub fn parse_hex(token: &str) -> Result<Vec<u8>> {
    let token = token.trim();
    if token.len() % 2 != 0 {
        return Err(Error::new(
            "device token must have an even number of hex digits".into(),
            ErrorKind::Registration,
        ));
    }
    (0..token.len())
        .step_by(2)
        .map(|i| {
            token
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| {
                    Error::new(
                        format!("invalid hex in device token: {}", token),
                        ErrorKind::Registration,
                    )
                })
        })
        .collect()
}
