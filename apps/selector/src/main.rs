use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use country_client::{CountryGateway, RestCountriesGateway, SelectionController};
use shared::domain::{CountryCode, Region};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod events;
mod render;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(about = "Pick a region, then a country, then one of its neighbours")]
struct Args {
    /// Country-data API root, overriding config and environment.
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the supported regions.
    Regions,
    /// List every country in a region.
    Countries {
        #[arg(long)]
        region: Region,
    },
    /// Look up one country by its alpha code.
    Country {
        #[arg(long)]
        code: String,
    },
    /// Look up several countries concurrently.
    Borders {
        #[arg(long, value_delimiter = ',')]
        codes: Vec<String>,
    },
    /// Walk the region → country → border cascade.
    Select {
        #[arg(long)]
        region: Region,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        border: Option<String>,
    },
}

fn country_code(raw: &str) -> CountryCode {
    CountryCode(raw.trim().to_ascii_uppercase())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    debug!(?settings, "loaded settings");

    let gateway = Arc::new(
        RestCountriesGateway::with_options(settings.gateway_options())
            .context("failed to build country gateway")?,
    );

    match args.command {
        Command::Regions => {
            for region in Region::ALL {
                println!("{region}");
            }
        }
        Command::Countries { region } => {
            let countries = gateway
                .countries_by_region(Some(region))
                .await
                .with_context(|| format!("failed to list countries in {region}"))?;
            print!("{}", render::country_list(&countries));
        }
        Command::Country { code } => {
            let country = gateway
                .country_by_alpha_code(&country_code(&code))
                .await
                .with_context(|| format!("failed to look up {code}"))?;
            println!("{}", render::country_line(&country));
        }
        Command::Borders { codes } => {
            let codes: Vec<CountryCode> = codes.iter().map(|c| country_code(c)).collect();
            let countries = gateway
                .country_borders_by_codes(&codes)
                .await
                .context("failed to look up border countries")?;
            print!("{}", render::country_list(&countries));
        }
        Command::Select {
            region,
            country,
            border,
        } => run_selection(gateway, region, country, border).await?,
    }

    Ok(())
}

async fn run_selection(
    gateway: Arc<RestCountriesGateway>,
    region: Region,
    country: Option<String>,
    border: Option<String>,
) -> Result<()> {
    let controller = SelectionController::new(gateway);
    let event_log = tokio::spawn(events::log_events(controller.subscribe_events()));

    let outcome = run_cascade(&controller, region, country, border).await;
    print!("{}", render::snapshot(&controller.snapshot()));
    if controller.is_complete() {
        info!("selection complete");
    }

    drop(controller);
    let _ = event_log.await;
    outcome
}

async fn run_cascade(
    controller: &Arc<SelectionController>,
    region: Region,
    country: Option<String>,
    border: Option<String>,
) -> Result<()> {
    controller
        .on_region_changed(Some(region))
        .await
        .with_context(|| format!("could not load countries for {region}"))?;

    let Some(country) = country else {
        return Ok(());
    };
    let country = country_code(&country);
    controller
        .on_country_changed(Some(country.clone()))
        .await
        .with_context(|| format!("could not load borders of {country}"))?;

    if let Some(border) = border {
        controller
            .on_border_changed(Some(country_code(&border)))
            .context("invalid border selection")?;
    }
    Ok(())
}
