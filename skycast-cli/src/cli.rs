use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, Password, Select, Text};
use skycast_core::{
    Config, Coordinates, DisplayState, PositionProvider, ResponseShape, WeatherFetcher,
    WeatherSession, WeatherViewModel, geolocator_from_config, source_from_config,
    suggest::{SUBMIT_DELAY, SuggestedEdit, submit_suggestion},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Current weather for where you are")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key and location preferences.
    Configure,

    /// Show current weather.
    Show {
        /// Latitude; requires --lon.
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude; requires --lat.
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Response shape: "onecall" or "current".
        #[arg(long)]
        shape: Option<String>,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Suggest a correction for the displayed weather.
    Suggest {
        #[arg(long)]
        temperature: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show {
                lat,
                lon,
                shape,
                json,
            } => {
                let explicit = lat.zip(lon).map(|(lat, lon)| Coordinates::new(lat, lon));
                show(explicit, shape, json).await
            }
            Command::Suggest {
                temperature,
                description,
            } => suggest(temperature, description).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    config.set_api_key(api_key.trim().to_string());

    let shape = Select::new("Response shape:", ResponseShape::all().to_vec())
        .prompt()
        .context("Failed to read response shape")?;
    config.set_response_shape(shape);

    let fixed = Confirm::new("Use a fixed location?")
        .with_default(config.location.is_some())
        .prompt()
        .context("Failed to read location choice")?;

    if fixed {
        let latitude = CustomType::<f64>::new("Latitude:")
            .prompt()
            .context("Failed to read latitude")?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .prompt()
            .context("Failed to read longitude")?;
        config.location = Some(Coordinates::new(latitude, longitude));
    } else {
        config.location = None;
        config.allow_ip_lookup = Confirm::new("Allow approximate location lookup by IP address?")
            .with_default(config.allow_ip_lookup)
            .prompt()
            .context("Failed to read IP lookup choice")?;
    }

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());

    Ok(())
}

async fn show(
    explicit: Option<Coordinates>,
    shape: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = Config::load()?.with_env_overrides();
    if shape.is_some() {
        config.shape = shape;
    }

    if config.api_key().is_none() {
        bail!(
            "No API key configured.\n\
             Hint: run `skycast configure` or set SKYCAST_API_KEY."
        );
    }

    let source = source_from_config(&config)?;
    let fetcher = WeatherFetcher::new(source, config.api_key().map(str::to_string));
    let position = PositionProvider::new(geolocator_from_config(&config, explicit));

    if !json {
        println!("Loading...");
    }

    let mut session = WeatherSession::new(position, fetcher);
    let display = session.run().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&display)?);
    } else {
        render(&display);
    }

    match display {
        DisplayState::Error(_) => std::process::exit(1),
        _ => Ok(()),
    }
}

fn render(display: &DisplayState) {
    match display {
        DisplayState::Loading => println!("Loading..."),
        DisplayState::Error(reason) => {
            println!("Oops!");
            println!("{reason}");
        }
        DisplayState::Ready(data) => render_weather(data),
    }
}

fn render_weather(data: &WeatherViewModel) {
    println!("{:>40}", data.time);
    println!();
    println!("{:^40}", data.icon.glyph());
    println!("{:^40}", data.temperature);
    println!("{:^40}", data.description);
    println!();

    let extras = [("Wind", &data.wind), ("Humidity", &data.humidity), ("Cloud", &data.cloud)];
    let values: Vec<String> = extras.iter().map(|(_, v)| format!("{v:^12}")).collect();
    let labels: Vec<String> = extras.iter().map(|(l, _)| format!("{l:^12}")).collect();
    println!("  {}", values.join(" "));
    println!("  {}", labels.join(" "));
}

async fn suggest(temperature: Option<String>, description: Option<String>) -> anyhow::Result<()> {
    let temperature = match temperature {
        Some(t) => t,
        None => Text::new("Temperature:").prompt().context("Failed to read temperature")?,
    };
    let description = match description {
        Some(d) => d,
        None => Text::new("Description:").prompt().context("Failed to read description")?,
    };

    println!("Submitting...");
    let edit = SuggestedEdit {
        temperature,
        description,
    };
    let receipt = submit_suggestion(edit, SUBMIT_DELAY).await;
    println!("{}", receipt.message);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn show_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "skycast", "show", "--lat", "-33.9", "--lon", "151.2", "--json",
        ])
        .expect("arguments should parse");

        match cli.command {
            Command::Show {
                lat,
                lon,
                json,
                shape,
            } => {
                assert_eq!(lat, Some(-33.9));
                assert_eq!(lon, Some(151.2));
                assert!(json);
                assert!(shape.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn lat_without_lon_is_rejected() {
        assert!(Cli::try_parse_from(["skycast", "show", "--lat", "10"]).is_err());
    }
}
