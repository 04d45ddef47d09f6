use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::Password;
use weather_core::{Config, WeatherAgentService};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-api", version, about = "LLM-powered weather agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Listen address; overrides the configured one.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Ask the agent a single question and print the answer.
    Ask {
        query: String,

        #[arg(long)]
        user_id: Option<String>,

        #[arg(long)]
        session_id: Option<String>,
    },

    /// Store the Google API key in the config file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve { bind } => {
                let config = Config::load()?;
                let bind = bind.unwrap_or_else(|| config.bind.clone());
                server::serve(&config, &bind).await?;
            }
            Command::Ask { query, user_id, session_id } => {
                let config = Config::load()?;
                let service = WeatherAgentService::from_config(&config)
                    .context("Failed to initialize agent")?;

                let user_id = user_id.unwrap_or_else(|| config.default_user_id.clone());
                let session_id = session_id.unwrap_or_else(|| config.default_session_id.clone());

                let outcome = service.query(&query, &user_id, &session_id).await?;
                println!("{}", outcome.response);
            }
            Command::Configure => {
                let mut config = Config::load()?;

                let api_key = Password::new("Google API key:")
                    .without_confirmation()
                    .prompt()
                    .context("Prompt failed")?;
                if api_key.trim().is_empty() {
                    bail!("API key cannot be empty");
                }

                config.set_api_key(api_key.trim().to_string());
                let path = config.save()?;
                println!("Configuration saved to {}", path.display());
            }
        }

        Ok(())
    }
}
