use crate::{mattermost_client::ChatClient, services::session::Session};
use log::{error, info, warn};

/// Logs messages to the console and optionally mirrors them to the user's
/// own direct channel
#[derive(Clone, Copy, Debug, Default)]
pub struct Reporter {
    mirror: bool,
}

impl Reporter {
    pub fn new(mirror: bool) -> Self {
        Reporter { mirror }
    }

    pub fn info<C: ChatClient>(&self, session: &mut Session<C>, message: &str) {
        self.mirror(session, message);
        info!("{message}");
    }

    pub fn error<C: ChatClient>(&self, session: &mut Session<C>, message: &str) {
        self.mirror(session, message);
        error!("{message}");
    }

    fn mirror<C: ChatClient>(&self, session: &mut Session<C>, message: &str) {
        if !self.mirror {
            return;
        }

        if let Err(e) = session.post_to_self(message) {
            warn!("failed to mirror log message: {e:#}");
        }
    }
}
