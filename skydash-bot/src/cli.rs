use anyhow::Context;
use clap::{Parser, Subcommand};
use skydash_core::{
    Config, Controller, Dashboard, DashboardEvent, InteractionError, UnitPreference,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::info;

use crate::{discord, health};

/// User id the `show` command acts as; never collides with a Discord snowflake.
const LOCAL_USER: u64 = 0;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skydash", version, about = "SkyDash weather bot for Discord")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect to Discord and serve the health-check page.
    Run,

    /// Store the Discord and Mapbox tokens in the config file.
    Configure,

    /// Render a dashboard in the terminal without Discord.
    Show {
        /// Place name, e.g. "London, UK".
        location: String,

        /// Use Fahrenheit and mph.
        #[arg(long)]
        imperial: bool,

        /// Show the 3-day forecast instead of current conditions.
        #[arg(long)]
        forecast: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Run => run_bot().await,
            Command::Configure => configure(),
            Command::Show {
                location,
                imperial,
                forecast,
            } => show(&location, imperial, forecast).await,
        }
    }
}

fn load_config() -> anyhow::Result<Config> {
    let mut config = Config::load()?;
    config.apply_env();
    Ok(config)
}

async fn run_bot() -> anyhow::Result<()> {
    let config = load_config()?;
    let token = config.discord_token()?.to_owned();
    let health_addr: SocketAddr = config
        .health_addr
        .parse()
        .with_context(|| format!("Invalid health_addr '{}'", config.health_addr))?;

    if config.mapbox_token.is_none() {
        info!("No Mapbox token configured; dashboards will have no map image");
    }

    let controller = Arc::new(Controller::from_config(&config)?);
    let sweeper = spawn_session_sweeper(Arc::clone(&controller));

    let result = tokio::select! {
        res = discord::run(&token, Arc::clone(&controller)) => res,
        res = health::serve(health_addr) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    };

    sweeper.abort();
    result
}

/// Expired sessions are also dropped lazily on access; this only bounds memory.
fn spawn_session_sweeper(controller: Arc<Controller>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let purged = controller.purge_expired_sessions();
            if purged > 0 {
                info!(purged, "dropped expired dashboard sessions");
            }
        }
    })
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let discord_token = inquire::Password::new("Discord bot token:")
        .without_confirmation()
        .with_help_message("Leave empty to keep the current value")
        .prompt()?;
    if !discord_token.trim().is_empty() {
        config.discord_token = Some(discord_token.trim().to_string());
    }

    let mapbox_token = inquire::Text::new("Mapbox access token (optional):")
        .with_help_message("Used for the static map image; leave empty to skip")
        .prompt_skippable()?;
    if let Some(token) = mapbox_token.filter(|t| !t.trim().is_empty()) {
        config.mapbox_token = Some(token.trim().to_string());
    }

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

async fn show(location: &str, imperial: bool, forecast: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    let controller = Controller::from_config(&config)?;

    if imperial {
        controller
            .preferences()
            .set(LOCAL_USER, UnitPreference::Imperial);
    }

    let mut rendered = match controller.search(LOCAL_USER, location).await {
        Ok(rendered) => rendered,
        Err(e) => return report(e),
    };

    if forecast {
        let outcome = controller
            .press(rendered.session_id, LOCAL_USER, DashboardEvent::SwitchView)
            .await?;
        if let Some(updated) = outcome.rendered() {
            rendered = updated.clone();
        }
    }

    print!("{}", format_dashboard(&rendered.dashboard));
    Ok(())
}

fn report(err: InteractionError) -> anyhow::Result<()> {
    match err {
        InteractionError::LocationNotFound(_) => {
            println!("{}", err.user_message());
            Ok(())
        }
        other => Err(other.into()),
    }
}

/// Plain-text rendering of a dashboard for the terminal.
fn format_dashboard(dashboard: &Dashboard) -> String {
    let mut out = format!("{}\n", dashboard.title);

    if let Some(description) = &dashboard.description {
        out.push_str(description.trim_start_matches('#').trim());
        out.push('\n');
    }
    out.push('\n');

    for field in &dashboard.fields {
        let value = field.value.replace("**", "").replace('\n', "\n    ");
        out.push_str(&format!("  {}: {value}\n", field.name));
    }

    if let Some(url) = &dashboard.image_url {
        out.push_str(&format!("\n  Map: {url}\n"));
    }

    let rendered_at = dashboard.timestamp.with_timezone(&chrono::Local);
    out.push_str(&format!(
        "\n{} • {}\n",
        dashboard.footer,
        rendered_at.format("%Y-%m-%d %H:%M")
    ));
    out
}
