//! Record Relay entry point.

use clap::Parser;

use record_relay::cli::{self, run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match run::load_config(&cli) {
        Ok(config) => config,
        Err(err) => cli::handle_error(err, None),
    };

    if cli.check_config {
        println!("{:#?}", run::redacted(&config));
        return;
    }

    let logger = match run::init_logging(&config) {
        Ok(logger) => logger,
        Err(err) => cli::handle_error(err, None),
    };

    if let Err(err) = run::execute(&config, &cli.input).await {
        cli::handle_error(err, Some(logger));
    }
}
