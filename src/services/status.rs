//! Custom status service
//!
//! Sets the custom status for the detected network, unless the user set a
//! different status by hand that is still in effect.

use crate::{
    config::NetworkProfile,
    mattermost_client::{ChatClient, CustomStatus, StatusDuration},
    services::session::Session,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use log::debug;

const CUTOFF_FORMAT: &str = "%H:%M";

/// Result of a status activation
#[derive(Clone, Debug, PartialEq)]
pub enum StatusOutcome {
    /// A status set by hand is in effect and was left untouched
    Kept(CustomStatus),
    /// The status was replaced by the profile's status
    Updated(CustomStatus),
}

/// Service for custom status operations
pub struct StatusService;

impl StatusService {
    /// Set the custom status of `profile`, expiring today at its cutoff time
    ///
    /// # Arguments
    /// * `session` - Session of the account to update
    /// * `profile` - Emoji, text and cutoff time of the detected network
    /// * `own_texts` - Status texts set by this tool, which may be overwritten
    /// * `now` - Current local time
    pub fn activate_status<C: ChatClient>(
        session: &mut Session<C>,
        profile: &NetworkProfile,
        own_texts: &[&str],
        now: DateTime<Local>,
    ) -> Result<StatusOutcome> {
        debug!("activate_status() called for network {}", profile.label);

        let user = session.user()?;
        let user_id = user.id.clone();
        let mut status = user.custom_status().unwrap_or_default();

        if Self::is_set_by_hand(&status, own_texts, now.with_timezone(&Utc)) {
            return Ok(StatusOutcome::Kept(status));
        }

        let expiry = Self::expiry_today(&profile.cutoff, now)?;

        status.duration = StatusDuration::DateAndTime;
        status.emoji = profile.emoji.clone();
        status.text = profile.text.clone();
        status.expires_at = Some(expiry.with_timezone(&Utc));
        status.prepare_for_save();

        session
            .client()
            .update_custom_status(&user_id, &status)
            .context("failed to update custom status")?;

        Ok(StatusOutcome::Updated(status))
    }

    /// Whether `status` is a non-empty status in effect that this tool did not set
    pub fn is_set_by_hand(status: &CustomStatus, own_texts: &[&str], now: DateTime<Utc>) -> bool {
        status.is_active_at(now)
            && !status.text.is_empty()
            && !own_texts.contains(&status.text.as_str())
    }

    /// Today's date at the `HH:MM` time of day `cutoff`, in the time zone of `now`
    ///
    /// An ambiguous time resolves to the earlier instant. A time skipped by a
    /// DST change is an error.
    pub fn expiry_today<Tz: TimeZone>(cutoff: &str, now: DateTime<Tz>) -> Result<DateTime<Tz>> {
        let time = NaiveTime::parse_from_str(cutoff, CUTOFF_FORMAT)
            .with_context(|| format!("failed to parse time of day {cutoff:?}"))?;

        now.timezone()
            .from_local_datetime(&now.date_naive().and_time(time))
            .earliest()
            .with_context(|| format!("failed to resolve {cutoff} in local time"))
    }
}
