use crate::{
    config::Config,
    mattermost_client::ChatClient,
    network::select_profile,
    services::{
        report::Reporter,
        session::Session,
        status::{StatusOutcome, StatusService},
    },
};
use anyhow::Result;
use chrono::{DateTime, Local};

/// Set the status of the first configured network the host is connected to
///
/// `is_member` decides whether the host is part of a network given its CIDR.
pub fn run<C: ChatClient>(
    config: &Config,
    session: &mut Session<C>,
    reporter: &Reporter,
    is_member: impl FnMut(&str) -> Result<bool>,
    now: DateTime<Local>,
) -> Result<()> {
    let Some(profile) = select_profile(&config.profiles, is_member)? else {
        reporter.info(session, "Not in range of given networks. Nothing done.");
        return Ok(());
    };

    match StatusService::activate_status(session, profile, &config.status_texts(), now)? {
        StatusOutcome::Kept(status) => reporter.info(
            session,
            &format!("Found status text: {}. Keeping current status.", status.text),
        ),
        StatusOutcome::Updated(status) => reporter.info(
            session,
            &format!("Status successfully set to: {}", status.text),
        ),
    }

    Ok(())
}
