mod cli;
mod error;
mod exporter;
mod filter;
mod fmt;
mod haircut;
mod importer;
mod models;
mod pipeline;
mod rates;
mod reports;
mod risk;
mod settings;
mod sheet;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommands};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let data = &cli.data;

    let result = match cli.command.unwrap_or(Commands::Summary) {
        Commands::Summary => cli::report::summary(data),
        Commands::Risk => cli::report::risk(data),
        Commands::Rates => cli::report::rates(data),
        Commands::Products => cli::report::products(data),
        Commands::Destinations => cli::report::destinations(data),
        Commands::Flow { period, from, to } => cli::report::flow(data, period, from, to),
        Commands::Detail { limit } => cli::report::detail(data, limit),
        Commands::Filters => cli::report::filters(data),
        Commands::Export { output } => cli::export::run(data, output),
        Commands::Status => cli::status::run(data),
        Commands::Demo => cli::demo::run(),
        Commands::Config { command } => match command {
            ConfigCommands::Show => cli::config::show(),
            ConfigCommands::Set {
                data_dir,
                invoices_file,
                rates_file,
                reference_date,
            } => cli::config::set(data_dir, invoices_file, rates_file, reference_date),
        },
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "factor", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
