mod api;
mod app;
mod audio;
mod config;
mod events;
mod grace;
mod http;
mod ipc;
mod notify;
mod realtime;
mod state;
mod surface;
mod theme;
mod util;
mod views;

use tracing_subscriber::EnvFilter;

fn main() -> Result<(), iced_layershell::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    app::run()
}
