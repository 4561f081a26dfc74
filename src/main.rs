use clap::Parser;
use element_locator::cli::commands::{cmd_locate, cmd_modals};
use element_locator::cli::config::{
    Cli, Commands, build_locator_config, build_modal_config, build_webdriver_options, load_config,
    resolve_activity,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref());
    let options = build_webdriver_options(&config, cli.webdriver.as_deref());

    match cli.command {
        Commands::Locate {
            url,
            activity,
            tags,
            fake,
            format,
            output,
        } => {
            let activity = resolve_activity(url.as_deref(), activity.as_deref())?;
            cmd_locate(
                &options,
                activity,
                &tags,
                fake,
                build_locator_config(&config),
                &format,
                output.as_deref(),
            )?;
        }
        Commands::Modals {
            url,
            activity,
            fake,
            format,
            output,
        } => {
            let activity = resolve_activity(url.as_deref(), activity.as_deref())?;
            cmd_modals(
                &options,
                activity,
                fake,
                build_locator_config(&config),
                build_modal_config(&config),
                &format,
                output.as_deref(),
            )?;
        }
    }

    Ok(())
}
