use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use booking_cell::services::ics::booking_to_ics;
use booking_cell::services::notifications::NotificationReceiver;
use booking_cell::services::calendar::{next_date_for_weekdays_within, parse_date, today, weekday_name};
use booking_cell::services::slots::{format_time, generate_time_slots, parse_time};
use booking_cell::{
    BookingConfirmation, BookingService, BookingTarget, HttpBookingApi, NotificationHub, NotificationLevel,
    ScheduleSelector, SelectionState, ServiceBookingDraft,
};
use session_cell::AppSession;
use shared_api::CrisisApiClient;
use shared_config::ClientConfig;
use shared_utils::PeriodicTask;

#[derive(Parser, Debug)]
#[command(name = "booking-cli", about = "Browse doctor schedules and book appointments or hospital services.")]
pub struct Cli {
    /// Backend base URL, overrides CRISIS_API_URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Bearer token, overrides CRISIS_API_TOKEN.
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Print confirmations as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn apply_overrides(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(url) = &self.api_url {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(token) = &self.token {
            config.api_token = token.clone();
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the selectable times between two times of day.
    Slots {
        #[arg(value_parser = time_arg)]
        start: NaiveTime,
        #[arg(value_parser = time_arg)]
        end: NaiveTime,
        /// Minutes between slots, defaults to BOOKING_SLOT_STEP_MINUTES.
        #[arg(long)]
        step: Option<u32>,
    },

    /// Earliest date falling on one of the given weekdays (0 = Sunday).
    NextDate {
        #[arg(required = true, value_delimiter = ',', value_parser = clap::value_parser!(u8).range(0..=6))]
        weekdays: Vec<u8>,
        /// Search from this date instead of today.
        #[arg(long, value_parser = date_arg)]
        from: Option<NaiveDate>,
    },

    /// Show a doctor's weekly schedule at a hospital and the options for a date.
    Schedule {
        #[arg(long)]
        doctor: i64,
        #[arg(long)]
        hospital: i64,
        /// Date to resolve, defaults to the next scheduled day.
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },

    /// Book a doctor appointment.
    BookDoctor {
        #[arg(long)]
        doctor: i64,
        #[arg(long)]
        hospital: i64,
        /// Defaults to the next scheduled day.
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
        /// Schedule block to use when the day has several.
        #[arg(long)]
        block: Option<i64>,
        #[arg(long, value_parser = time_arg)]
        start: Option<NaiveTime>,
        #[arg(long, value_parser = time_arg)]
        end: Option<NaiveTime>,
        #[arg(long)]
        notes: Option<String>,
        /// Write the confirmed booking to an iCalendar file.
        #[arg(long)]
        ics: Option<PathBuf>,
    },

    /// Book a hospital service.
    BookService {
        #[arg(long)]
        hospital: i64,
        #[arg(long)]
        service: i64,
        #[arg(long, value_parser = date_arg)]
        date: NaiveDate,
        #[arg(long, value_parser = time_arg)]
        time: NaiveTime,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        ics: Option<PathBuf>,
    },

    /// Re-fetch a doctor's schedule periodically until interrupted.
    WatchSchedule {
        #[arg(long)]
        doctor: i64,
        #[arg(long)]
        hospital: i64,
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
    },
}

fn time_arg(raw: &str) -> Result<NaiveTime, String> {
    parse_time(raw).ok_or_else(|| format!("'{}' is not a time, expected HH:MM", raw))
}

fn date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("'{}' is not a date, expected YYYY-MM-DD", raw))
}

pub async fn run(command: Command, json: bool, config: ClientConfig) -> Result<()> {
    match command {
        Command::Slots { start, end, step } => {
            let slots = generate_time_slots(start, end, step.unwrap_or(config.slot_step_minutes));
            if slots.is_empty() {
                println!("No slots between {} and {}.", format_time(start), format_time(end));
            }
            for label in slots.labels() {
                println!("{}", label);
            }
            Ok(())
        }
        Command::NextDate { weekdays, from } => {
            let from = from.unwrap_or_else(today);
            match next_date_for_weekdays_within(weekdays, from, config.search_horizon_days) {
                Some(date) => println!("{} ({})", date, date.format("%A")),
                None => println!("No matching date within {} days.", config.search_horizon_days),
            }
            Ok(())
        }
        Command::Schedule { doctor, hospital, date } => {
            let service = booking_service(&config).await?;
            let mut selector = service.schedule_selector(doctor, hospital).await?;
            print_blocks(&selector);

            if let Some(date) = date.or_else(|| selector.suggest_date_within(today(), config.search_horizon_days)) {
                selector.select_date(date);
                print_selection(&selector);
            }
            Ok(())
        }
        Command::BookDoctor {
            doctor,
            hospital,
            date,
            block,
            start,
            end,
            notes,
            ics,
        } => {
            let service = booking_service(&config).await?;
            service.load_bookings().await?;
            let mut notifications = service.notifications().subscribe();

            let mut selector = service.schedule_selector(doctor, hospital).await?;
            let date = date
                .or_else(|| selector.suggest_date_within(today(), config.search_horizon_days))
                .ok_or_else(|| anyhow!("doctor #{} has no schedule at hospital #{}", doctor, hospital))?;

            selector.select_date(date);
            if let Some(block) = block {
                selector.select_block(block)?;
            }
            if let Some(start) = start {
                selector.select_start(start)?;
            }
            if let Some(end) = end {
                selector.select_end(end)?;
            }
            print_selection(&selector);

            let outcome = service.book_doctor(&selector, notes).await;
            drain_notifications(&mut notifications);
            let confirmation = outcome?;

            report(&confirmation, json)?;
            if let Some(path) = ics {
                let title = format!("Appointment with doctor #{}", doctor);
                write_ics(&path, &confirmation, &title, None).await?;
            }
            Ok(())
        }
        Command::BookService {
            hospital,
            service: service_id,
            date,
            time,
            notes,
            ics,
        } => {
            let service = booking_service(&config).await?;
            service.load_bookings().await?;
            let mut notifications = service.notifications().subscribe();

            let offerings = service.services(hospital).await?;
            let offering = offerings
                .iter()
                .find(|o| o.id == service_id)
                .ok_or_else(|| anyhow!("hospital #{} does not offer service #{}", hospital, service_id))?;

            if !service.can_confirm(BookingTarget::Service(offering.id), date).await {
                warn!("{} is already booked on {}", offering.name, date);
            }
            let window = offering.booking_window();
            if !window.admits(time) {
                println!(
                    "Offered times for {}: {}",
                    offering.name,
                    window.slots(config.slot_step_minutes).labels().join(" ")
                );
            }

            let draft = ServiceBookingDraft {
                service_id: offering.id,
                date: Some(date),
                time: Some(time),
                notes,
            };
            let outcome = service.book_service(offering, draft).await;
            drain_notifications(&mut notifications);
            let confirmation = outcome?;

            report(&confirmation, json)?;
            if let Some(path) = ics {
                write_ics(&path, &confirmation, &offering.name, Some(offering.duration_minutes)).await?;
            }
            Ok(())
        }
        Command::WatchSchedule {
            doctor,
            hospital,
            interval_secs,
        } => {
            if interval_secs == 0 {
                bail!("--interval-secs must be positive");
            }
            let service = Arc::new(booking_service(&config).await?);
            let horizon = config.search_horizon_days;

            let task = PeriodicTask::spawn(
                format!("schedule-{}-{}", doctor, hospital),
                Duration::from_secs(interval_secs),
                move || {
                    let service = Arc::clone(&service);
                    async move {
                        match service.schedule_selector(doctor, hospital).await {
                            Ok(selector) => {
                                let next = selector
                                    .suggest_date_within(today(), horizon)
                                    .map(|d| d.to_string())
                                    .unwrap_or_else(|| "none".to_string());
                                println!("{} blocks, next available date: {}", selector.blocks().len(), next);
                            }
                            Err(err) => warn!("Schedule refresh failed: {}", err),
                        }
                    }
                },
            );

            info!("Watching schedule of doctor #{}, press Ctrl-C to stop", doctor);
            tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
            task.stop().await;
            Ok(())
        }
    }
}

/// Resolves the session once and builds a booking service scoped to the
/// signed-in user's capabilities.
async fn booking_service(config: &ClientConfig) -> Result<BookingService<HttpBookingApi>> {
    let client = Arc::new(CrisisApiClient::new(config)?);
    let session = AppSession::new(client, Some(config.api_token.clone()));
    let snapshot = session
        .resolve()
        .await
        .context("could not resolve the signed-in user, check CRISIS_API_TOKEN")?;

    let role = snapshot
        .user
        .role
        .map(|r| r.to_string())
        .unwrap_or_else(|| "no role".to_string());
    info!("Signed in as user #{} ({})", snapshot.user.id, role);

    let api = HttpBookingApi::new(Arc::clone(session.api()), Some(snapshot.token));
    Ok(
        BookingService::new(Arc::new(api), snapshot.capabilities, NotificationHub::default())
            .with_step_minutes(config.slot_step_minutes),
    )
}

fn print_blocks(selector: &ScheduleSelector) {
    if selector.blocks().is_empty() {
        println!("No schedule blocks.");
        return;
    }
    for block in selector.blocks() {
        let cost = block.visit_cost.map(|c| format!(", fee {:.2}", c)).unwrap_or_default();
        println!(
            "#{} {} {}-{}{}",
            block.id,
            weekday_name(block.weekday),
            format_time(block.start_time),
            format_time(block.end_time),
            cost
        );
    }
}

fn print_selection(selector: &ScheduleSelector) {
    match selector.state() {
        SelectionState::NoDate => println!("No date selected."),
        SelectionState::NoSchedule { date, weekday } => {
            println!("{}: no schedule on {}, please pick another date.", date, weekday_name(*weekday));
        }
        SelectionState::Ready(active) => {
            println!("{} using block #{}", active.date, active.block.id);
            println!("  start options: {}", active.start_labels().join(" "));
            println!("  end options:   {}", active.end_labels().join(" "));
            if let (Some(start), Some(end)) = (active.start, active.end) {
                println!("  selected: {}-{}", format_time(start), format_time(end));
            }
        }
    }
}

fn drain_notifications(rx: &mut NotificationReceiver) {
    while let Ok(note) = rx.try_recv() {
        let tag = match note.level {
            NotificationLevel::Success => "ok",
            NotificationLevel::Info => "info",
            NotificationLevel::Error => "error",
        };
        println!("[{}] {}", tag, note.message);
    }
}

fn report(confirmation: &BookingConfirmation, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(confirmation)?);
        return Ok(());
    }
    if let Some(id) = confirmation.booking_id {
        println!("Booking id: {}", id);
    }
    if let Some(serial) = confirmation.serial {
        println!("Serial: {}", serial);
    }
    if let Some(approx) = confirmation.approx_time {
        println!("Approximate time: {}", format_time(approx));
    }
    Ok(())
}

async fn write_ics(
    path: &Path,
    confirmation: &BookingConfirmation,
    title: &str,
    duration_minutes: Option<u32>,
) -> Result<()> {
    let ics = booking_to_ics(confirmation, title, duration_minutes);
    tokio::fs::write(path, ics)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Calendar file written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_book_doctor() {
        let cli = Cli::try_parse_from([
            "booking-cli",
            "book-doctor",
            "--doctor",
            "7",
            "--hospital",
            "3",
            "--date",
            "2025-06-02",
            "--start",
            "09:30",
        ])
        .unwrap();

        match cli.command {
            Command::BookDoctor { doctor, date, start, end, .. } => {
                assert_eq!(doctor, 7);
                assert_eq!(date, NaiveDate::from_ymd_opt(2025, 6, 2));
                assert_eq!(start, NaiveTime::from_hms_opt(9, 30, 0));
                assert_eq!(end, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_next_date_rejects_weekday_out_of_range() {
        assert!(Cli::try_parse_from(["booking-cli", "next-date", "1,7"]).is_err());
        let cli = Cli::try_parse_from(["booking-cli", "next-date", "1,3"]).unwrap();
        assert!(matches!(cli.command, Command::NextDate { ref weekdays, .. } if weekdays == &vec![1, 3]));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let cli = Cli::try_parse_from([
            "booking-cli",
            "--api-url",
            "http://api.local/",
            "--token",
            "abc",
            "slots",
            "09:00",
            "10:00",
        ])
        .unwrap();
        let config = cli.apply_overrides(ClientConfig::default());
        assert_eq!(config.api_url, "http://api.local");
        assert_eq!(config.api_token, "abc");
    }

    #[test]
    fn test_invalid_time_argument() {
        assert!(Cli::try_parse_from(["booking-cli", "slots", "9am", "10:00"]).is_err());
    }
}
