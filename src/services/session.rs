//! Authenticated session against the chat server
//!
//! The session owns the chat client and authenticates lazily, the first time
//! the user is needed. The authenticated user is kept for the rest of the run.

use crate::{
    config::Credentials,
    mattermost_client::{ChatClient, Post, User},
};
use anyhow::{Context, Result, bail, ensure};
use log::debug;

enum SessionState {
    Pending,
    Authenticated(User),
    Failed,
}

pub struct Session<C> {
    client: C,
    username: String,
    credentials: Credentials,
    show_token: bool,
    state: SessionState,
}

impl<C: ChatClient> Session<C> {
    pub fn new(client: C, username: impl Into<String>, credentials: Credentials) -> Self {
        Session {
            client,
            username: username.into(),
            credentials,
            show_token: false,
            state: SessionState::Pending,
        }
    }

    /// Print the access token to stdout once authenticated
    pub fn with_show_token(mut self, show_token: bool) -> Self {
        self.show_token = show_token;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    #[cfg(test)]
    pub(crate) fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    /// The authenticated user, authenticating on first use
    ///
    /// A failed authentication is not retried.
    pub fn user(&mut self) -> Result<&User> {
        if matches!(self.state, SessionState::Pending) {
            self.state = match self.authenticate() {
                Ok(user) => SessionState::Authenticated(user),
                Err(e) => {
                    self.state = SessionState::Failed;
                    return Err(e.context("failed to authenticate"));
                }
            };
        }

        match &self.state {
            SessionState::Authenticated(user) => Ok(user),
            _ => bail!("failed to authenticate: earlier attempt failed"),
        }
    }

    /// Post `message` to the direct channel of the user with themself
    pub fn post_to_self(&mut self, message: &str) -> Result<()> {
        let user_id = self.user()?.id.clone();

        let channel = self
            .client
            .create_direct_channel(&user_id, &user_id)
            .context("failed to create direct channel")?;

        self.client
            .create_post(&Post {
                user_id,
                channel_id: channel.id,
                message: message.to_string(),
                ..Default::default()
            })
            .context("failed to create post")?;

        Ok(())
    }

    fn authenticate(&mut self) -> Result<User> {
        ensure!(!self.username.is_empty(), "missing username");

        let user = match &self.credentials {
            Credentials::Token(token) => {
                debug!("authenticating {} with token", self.username);
                self.client.set_auth_token(token);
                self.client.user_by_username(&self.username)?
            }
            Credentials::Password(password) => {
                debug!("authenticating {} with password", self.username);
                let password = match password {
                    Some(password) => password.clone(),
                    None => prompt_password()?,
                };
                self.client.login(&self.username, &password)?
            }
        };

        if self.show_token {
            if let Some(token) = self.client.auth_token() {
                println!("{token}");
            }
        }

        Ok(user)
    }
}

fn prompt_password() -> Result<String> {
    rpassword::prompt_password("Password: ").context("failed to read password")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mattermost_client::{Channel, MockChatClient};
    use mockall::predicate::eq;

    fn user() -> User {
        User {
            id: "u1".to_string(),
            username: "jdoe".to_string(),
            ..Default::default()
        }
    }

    mod authentication {
        use super::*;

        #[test]
        fn token_fetches_user_by_name() {
            let mut client = MockChatClient::new();
            client
                .expect_set_auth_token()
                .with(eq("tok"))
                .times(1)
                .return_const(());
            client
                .expect_user_by_username()
                .with(eq("jdoe"))
                .times(1)
                .returning(|_| Ok(user()));
            client.expect_login().never();

            let mut session = Session::new(client, "jdoe", Credentials::Token("tok".to_string()));

            assert!(!session.is_authenticated());
            assert_eq!(session.user().unwrap().id, "u1");
            assert!(session.is_authenticated());
        }

        #[test]
        fn password_logs_in() {
            let mut client = MockChatClient::new();
            client
                .expect_login()
                .withf(|login_id, password| login_id == "jdoe" && password == "secret")
                .times(1)
                .returning(|_, _| Ok(user()));
            client.expect_user_by_username().never();
            client.expect_set_auth_token().never();

            let mut session = Session::new(
                client,
                "jdoe",
                Credentials::Password(Some("secret".to_string())),
            );

            assert_eq!(session.user().unwrap().id, "u1");
        }

        #[test]
        fn user_is_memoized() {
            let mut client = MockChatClient::new();
            client.expect_set_auth_token().return_const(());
            client
                .expect_user_by_username()
                .times(1)
                .returning(|_| Ok(user()));

            let mut session = Session::new(client, "jdoe", Credentials::Token("tok".to_string()));

            session.user().unwrap();
            session.user().unwrap();
        }

        #[test]
        fn failure_is_not_retried() {
            let mut client = MockChatClient::new();
            client
                .expect_login()
                .times(1)
                .returning(|_, _| Err(anyhow::anyhow!("401 Unauthorized")));

            let mut session = Session::new(
                client,
                "jdoe",
                Credentials::Password(Some("wrong".to_string())),
            );

            let err = session.user().unwrap_err();
            assert!(format!("{err:#}").contains("401 Unauthorized"));
            assert!(session.user().is_err());
            assert!(!session.is_authenticated());
        }

        #[test]
        fn missing_username_is_an_error() {
            let mut client = MockChatClient::new();
            client.expect_user_by_username().never();
            client.expect_set_auth_token().never();

            let mut session = Session::new(client, "", Credentials::Token("tok".to_string()));

            let err = session.user().unwrap_err();
            assert!(format!("{err:#}").contains("missing username"));
        }

        #[test]
        fn show_token_reads_token_from_client() {
            let mut client = MockChatClient::new();
            client.expect_set_auth_token().return_const(());
            client
                .expect_user_by_username()
                .returning(|_| Ok(user()));
            client
                .expect_auth_token()
                .times(1)
                .returning(|| Some("tok".to_string()));

            let mut session = Session::new(client, "jdoe", Credentials::Token("tok".to_string()))
                .with_show_token(true);

            session.user().unwrap();
        }
    }

    mod post_to_self {
        use super::*;

        #[test]
        fn posts_into_own_direct_channel() {
            let mut client = MockChatClient::new();
            client.expect_set_auth_token().return_const(());
            client
                .expect_user_by_username()
                .returning(|_| Ok(user()));
            client
                .expect_create_direct_channel()
                .with(eq("u1"), eq("u1"))
                .times(1)
                .returning(|_, _| {
                    Ok(Channel {
                        id: "c1".to_string(),
                    })
                });
            client
                .expect_create_post()
                .withf(|post| {
                    post.user_id == "u1" && post.channel_id == "c1" && post.message == "hello"
                })
                .times(1)
                .returning(|post| Ok(post.clone()));

            let mut session = Session::new(client, "jdoe", Credentials::Token("tok".to_string()));

            session.post_to_self("hello").unwrap();
        }

        #[test]
        fn channel_failure_is_reported() {
            let mut client = MockChatClient::new();
            client.expect_set_auth_token().return_const(());
            client
                .expect_user_by_username()
                .returning(|_| Ok(user()));
            client
                .expect_create_direct_channel()
                .returning(|_, _| Err(anyhow::anyhow!("403 Forbidden")));
            client.expect_create_post().never();

            let mut session = Session::new(client, "jdoe", Credentials::Token("tok".to_string()));

            let err = session.post_to_self("hello").unwrap_err();
            assert!(err.to_string().contains("failed to create direct channel"));
        }
    }
}
