pub mod app;
pub mod config;
pub mod http_client;
pub mod mattermost_client;
pub mod network;
pub mod services;
