use clap::Parser;
use dayplan::cli::commands::Cli;
use dayplan::cli::handlers;

fn init_tracing(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let config = match handlers::load_settings(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(&config.log.level);

    if let Err(e) = handlers::dispatch(cli, config) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
