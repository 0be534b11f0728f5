use dashboard::app;
use dashboard::config::parse_web_args;

/// Main entry point for the web dashboard
///
/// Serves the dashboard JSON API and exports on the configured address
/// (`127.0.0.1:3000` unless `--bind` is given), reading projects from
/// `data/projets.xlsx` unless `--source` is given.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match parse_web_args(std::env::args_os()) {
        Ok(config) => config,
        Err(e) => e.exit(),
    };

    app::run(config).await
}
