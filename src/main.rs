use chrono::Local;
use env_logger::{Builder, Env, Target};
use log::{debug, error};
use std::io::Write;
use workplacer::{
    app,
    config::{Cli, Config},
    mattermost_client::MattermostClient,
    network,
    services::{report::Reporter, session::Session},
};

fn main() {
    initialize();

    let config = Config::from(Cli::parse_args());
    debug!("module version: {}", env!("CARGO_PKG_VERSION"));
    debug!("configuration: {config:?}");

    let client = match MattermostClient::new(&config.server_url) {
        Ok(client) => client,
        Err(e) => {
            error!("application error: {e:#}");
            std::process::exit(1);
        }
    };

    let mut session = Session::new(client, config.username.as_str(), config.credentials.clone())
        .with_show_token(config.show_token);
    let reporter = Reporter::new(config.mirror_log);

    if let Err(e) = app::run(
        &config,
        &mut session,
        &reporter,
        network::is_in_network,
        Local::now(),
    ) {
        reporter.error(&mut session, &format!("{e:#}"));
        std::process::exit(1);
    }
}

fn initialize() {
    log_panics::init();

    let mut builder = if cfg!(debug_assertions) {
        Builder::from_env(Env::default().default_filter_or("info,workplacer=debug"))
    } else {
        Builder::from_env(Env::default().default_filter_or("info"))
    };

    builder.format(|f, record| match record.level() {
        log::Level::Error => {
            eprintln!("{}", record.args());
            Ok(())
        }
        _ => {
            writeln!(f, "{}", record.args())
        }
    });

    builder.target(Target::Stdout).init();
}
