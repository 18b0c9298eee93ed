use clap::{ArgAction, Parser};
use std::{env, ffi::OsString, fmt};

/// Long flags that are also accepted with a single leading dash (`-url`)
const FLAG_NAMES: &[&str] = &[
    "url",
    "token",
    "username",
    "password",
    "acidr",
    "bcidr",
    "aemoji",
    "bemoji",
    "atext",
    "btext",
    "atime",
    "btime",
    "showtoken",
    "mlog",
    "help",
    "version",
];

/// Flags that never consume the following argument as their value
const SWITCH_NAMES: &[&str] = &["showtoken", "mlog", "help", "version"];

const TOKEN_ENV: &str = "MATTERMOST_TOKEN";

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// URL of your Mattermost server
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub url: String,

    /// Mattermost user authorization token
    #[arg(
        long,
        env = "MATTERMOST_TOKEN",
        hide_env_values = true,
        allow_hyphen_values = true
    )]
    pub token: Option<String>,

    /// Mattermost username without leading @
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    pub username: String,

    /// Password of your Mattermost account, read from the terminal if set to "-"
    /// or if neither password nor token are given
    #[arg(long, allow_hyphen_values = true)]
    pub password: Option<String>,

    /// CIDR address of network A, e.g. 192.168.1.0/24 for all addresses in 192.168.1.*
    #[arg(long = "acidr", default_value = "", allow_hyphen_values = true)]
    pub a_cidr: String,

    /// CIDR address of network B, e.g. 192.168.1.0/24 for all addresses in 192.168.1.*
    #[arg(long = "bcidr", default_value = "", allow_hyphen_values = true)]
    pub b_cidr: String,

    /// Emoji to use for custom status when connected to network A
    #[arg(long = "aemoji", default_value = "house", allow_hyphen_values = true)]
    pub a_emoji: String,

    /// Emoji to use for custom status when connected to network B
    #[arg(long = "bemoji", default_value = "office", allow_hyphen_values = true)]
    pub b_emoji: String,

    /// Description to use for custom status when connected to network A
    #[arg(long = "atext", default_value = "Working from home", allow_hyphen_values = true)]
    pub a_text: String,

    /// Description to use for custom status when connected to network B
    #[arg(long = "btext", default_value = "At the office", allow_hyphen_values = true)]
    pub b_text: String,

    /// Time of today (hh:mm) when to clear status when connected to network A
    #[arg(long = "atime", default_value = "18:00", allow_hyphen_values = true)]
    pub a_time: String,

    /// Time of today (hh:mm) when to clear status when connected to network B
    #[arg(long = "btime", default_value = "18:00", allow_hyphen_values = true)]
    pub b_time: String,

    /// Output the Mattermost access token to stdout
    #[arg(
        long = "showtoken",
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub show_token: bool,

    /// Send log messages to your own Mattermost direct channel in addition to stdout
    #[arg(
        long = "mlog",
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub mirror_log: bool,
}

impl Cli {
    /// Parse the process arguments, accepting single-dash long flags
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }
}

/// Rewrite single-dash long flags (`-url`, `-url=x`) into their double-dash form.
///
/// The argument following a value flag is its value and is passed on as is,
/// even if it looks like a flag (`-atext -mlog`).
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut value_pending = false;

    args.into_iter()
        .map(Into::into)
        .map(|arg: OsString| {
            if std::mem::take(&mut value_pending) {
                return arg;
            }

            let Some((flag, has_value)) = arg.to_str().and_then(known_flag) else {
                return arg;
            };
            value_pending = !has_value && !SWITCH_NAMES.contains(&flag);

            let rewritten = arg
                .to_str()
                .filter(|s| !s.starts_with("--"))
                .map(|s| format!("-{s}"));

            rewritten.map_or(arg, OsString::from)
        })
        .collect()
}

/// Name of a known flag given with one or two dashes, and whether its value
/// is attached with `=`
fn known_flag(arg: &str) -> Option<(&str, bool)> {
    let flag = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-'))?;
    let (name, has_value) = match flag.split_once('=') {
        Some((name, _)) => (name, true),
        None => (flag, false),
    };

    FLAG_NAMES.contains(&name).then_some((name, has_value))
}

/// How to authenticate against the chat server
#[derive(Clone, PartialEq)]
pub enum Credentials {
    /// Bearer token of the user
    Token(String),
    /// Login with the password, `None` if it has to be read from the terminal
    Password(Option<String>),
}

impl Credentials {
    const PROMPT_MARKER: &str = "-";

    /// A given password always wins over a token; a missing password and
    /// missing token both mean the password is prompted for.
    pub fn resolve(token: Option<String>, password: Option<String>) -> Self {
        let token = token.filter(|t| !t.is_empty());
        let password = password.filter(|p| !p.is_empty());

        match (token, password) {
            (Some(token), None) => Credentials::Token(token),
            (_, Some(password)) if password == Self::PROMPT_MARKER => Credentials::Password(None),
            (_, password) => Credentials::Password(password),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => write!(f, "Token(<redacted>)"),
            Credentials::Password(Some(_)) => write!(f, "Password(<redacted>)"),
            Credentials::Password(None) => write!(f, "Password(<prompt>)"),
        }
    }
}

/// Status settings for one of the detected networks
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkProfile {
    pub label: String,
    /// CIDR of the network, empty if disabled
    pub cidr: String,
    pub emoji: String,
    pub text: String,
    /// Local time of day (`HH:MM`) when the status expires
    pub cutoff: String,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub server_url: String,
    pub username: String,
    pub credentials: Credentials,
    pub show_token: bool,
    pub mirror_log: bool,
    /// Network A and network B, in the order they are checked
    pub profiles: [NetworkProfile; 2],
}

impl Config {
    /// Status texts this tool sets itself
    pub fn status_texts(&self) -> [&str; 2] {
        [self.profiles[0].text.as_str(), self.profiles[1].text.as_str()]
    }
}

impl Config {
    /// Build the configuration, taking the token from `env_token` when the
    /// `-token` flag is missing or empty
    pub fn from_cli(cli: Cli, env_token: Option<String>) -> Self {
        let token = cli.token.filter(|t| !t.is_empty()).or(env_token);

        Config {
            server_url: cli.url,
            username: cli.username,
            credentials: Credentials::resolve(token, cli.password),
            show_token: cli.show_token,
            mirror_log: cli.mirror_log,
            profiles: [
                NetworkProfile {
                    label: "A".to_string(),
                    cidr: cli.a_cidr,
                    emoji: cli.a_emoji,
                    text: cli.a_text,
                    cutoff: cli.a_time,
                },
                NetworkProfile {
                    label: "B".to_string(),
                    cidr: cli.b_cidr,
                    emoji: cli.b_emoji,
                    text: cli.b_text,
                    cutoff: cli.b_time,
                },
            ],
        }
    }
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config::from_cli(cli, env::var(TOKEN_ENV).ok())
    }
}
