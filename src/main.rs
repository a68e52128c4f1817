use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use sensor_advisor::{
  AdvisorConfig, ConsoleSink, Reading, RecommendationRequester,
  RecommendationService,
};

/// Ask the local recommendation service about one set of readings
#[derive(Parser, Debug)]
#[command(name = "sensor-advisor", version)]
struct Args
{   /// pH level
    #[arg(long, default_value_t = 7.5, allow_negative_numbers = true)]
    ph: f64

  , /// Total dissolved solids in ppm
    #[arg(long, default_value_t = 420.0, allow_negative_numbers = true)]
    tds: f64

  , /// Temperature in °C
    #[arg(long, default_value_t = 32.0, allow_negative_numbers = true)]
    temperature: f64

  , /// Relative humidity in percent
    #[arg(long, default_value_t = 55.0, allow_negative_numbers = true)]
    humidity: f64

  , /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>

  , /// Service host, overrides configuration
    #[arg(long)]
    host: Option<String>

  , /// Service port, overrides configuration
    #[arg(long)]
    port: Option<u16>

  , /// Send structured readings to the analyze route instead
    #[arg(long, conflicts_with = "search")]
    analyze: bool

  , /// Ask about a term in the context of the readings
    #[arg(long)]
    search: Option<String>

  , /// Only check that the service is up
    #[arg(long, conflicts_with_all = ["analyze", "search"])]
    status: bool
}

fn load_config(args: &Args) -> Result<AdvisorConfig, sensor_advisor::Error>
{   let mut config = match &args.config
    {   Some(path) => {
          let raw = fs::read_to_string(path).map_err(|e| {
            sensor_advisor::Error::InvalidConfiguration(
              format!("{}: {}", path.display(), e)
            )
          })?;
          AdvisorConfig::from_json_str(&raw)?
            .with_overrides(|key| std::env::var(key).ok())?
        }
      , None => AdvisorConfig::from_env()?
    };

    if let Some(host) = &args.host
    {   config.endpoint.host = host.clone();
    }
    if let Some(port) = args.port
    {   config.endpoint.port = port;
    }
    config.endpoint.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode
{   env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).init();
    let args = Args::parse();

    let config = match load_config(&args)
    {   Ok(config) => config
      , Err(e) => {
          error!("{}", e);
          return ExitCode::FAILURE;
        }
    };

    let service = match RecommendationService::new(config.endpoint)
    {   Ok(service) => service
      , Err(e) => {
          error!("{}", e);
          return ExitCode::FAILURE;
        }
    };

    if args.status
    {   return match service.status().await
        {   Ok(status) => {
              info!("Service status: {:?}", status);
              println!(
                "{}",
                status.message.or(status.status).unwrap_or_default()
              );
              ExitCode::SUCCESS
            }
          , Err(e) => {
              error!("Status check failed: {}", e);
              ExitCode::FAILURE
            }
        };
    }

    let reading = Reading::new(
      args.ph, args.tds, args.temperature, args.humidity
    );
    let requester = RecommendationRequester::new(
      service,
      Box::new(ConsoleSink::new(config.output_id))
    );

    // Failures are already logged by the requester
    let _ = match &args.search
    {   Some(term) => requester.search(term, &reading).await
      , None if args.analyze => requester.analyze(&reading).await
      , None => requester.request(&reading).await
    };
    ExitCode::SUCCESS
}
