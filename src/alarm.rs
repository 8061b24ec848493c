//! Alarm scheduler
//!
//! Arms a one-shot timer for the soonest enabled alarm, fires the play
//! command through the same controller entry point as every other
//! trigger, then re-arms for the next occurrence. Alarm times are daily
//! wall-clock times in the local timezone; an occurrence already past
//! today rolls over to tomorrow.

use crate::config::AlarmConfig;
use crate::events::{EventBus, PlayerEvent};
use crate::playback::PlaybackController;
use crate::tracks::TrackTable;
use chrono::{DateTime, Days, Local, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Compute the next alarm occurrence strictly after `now`.
///
/// Returns the fire time and the track index of the soonest enabled
/// alarm, or None if no enabled alarm yields an occurrence. Generic over
/// the timezone so the arithmetic is testable with a fixed offset.
pub fn next_alarm<Tz: TimeZone>(
    alarms: &[AlarmConfig],
    now: &DateTime<Tz>,
) -> Option<(DateTime<Tz>, usize)> {
    let mut soonest: Option<(DateTime<Tz>, usize)> = None;

    for alarm in alarms.iter().filter(|a| a.enabled) {
        let Some(time) = NaiveTime::from_hms_opt(alarm.hour as u32, alarm.minute as u32, 0) else {
            continue;
        };

        // Today, tomorrow, or (when a DST gap swallows the wall time) the
        // day after.
        for day in 0..3u64 {
            let Some(date) = now.date_naive().checked_add_days(Days::new(day)) else {
                break;
            };
            let Some(candidate) = now
                .timezone()
                .from_local_datetime(&date.and_time(time))
                .earliest()
            else {
                continue;
            };
            if candidate > *now {
                let sooner = soonest
                    .as_ref()
                    .map_or(true, |(best, _)| candidate < *best);
                if sooner {
                    soonest = Some((candidate, alarm.track));
                }
                break;
            }
        }
    }

    soonest
}

/// Scheduler task: sleeps until the next enabled alarm, issues its play
/// command, then re-arms. Returns when no alarm can ever fire.
pub async fn run(
    alarms: Vec<AlarmConfig>,
    tracks: Arc<TrackTable>,
    controller: Arc<PlaybackController>,
    events: EventBus,
) {
    if !alarms.iter().any(|a| a.enabled) {
        info!("No enabled alarms, scheduler not armed");
        return;
    }

    loop {
        let now = Local::now();
        let Some((fires_at, track)) = next_alarm(&alarms, &now) else {
            warn!("No computable alarm occurrence, scheduler stopping");
            return;
        };

        info!(
            "Next alarm at {} (track {})",
            fires_at.format("%Y-%m-%d %H:%M"),
            track
        );
        events.broadcast(PlayerEvent::AlarmScheduled {
            track_index: track,
            fires_at: fires_at.with_timezone(&Utc),
            timestamp: Utc::now(),
        });

        let wait = (fires_at - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        info!("Alarm fired, playing track {}", track);
        events.broadcast(PlayerEvent::AlarmFired {
            track_index: track,
            timestamp: Utc::now(),
        });
        match tracks.resolve(track) {
            Some(path) => controller.play(path),
            None => warn!("Alarm track {} is not configured", track),
        }
    }
}
