//! Serenity adapter: slash command, autocomplete and button events in, embeds out.

use anyhow::Context as _;
use serenity::{
    all::{
        ButtonStyle, Client, Command, CommandInteraction, CommandOptionType, ComponentInteraction,
        Context, CreateActionRow, CreateAutocompleteResponse, CreateButton, CreateCommand,
        CreateCommandOption, CreateEmbed, CreateEmbedFooter, CreateInteractionResponse,
        CreateInteractionResponseFollowup, EditInteractionResponse, EventHandler, GatewayIntents,
        Interaction, ReactionType, Ready, ResolvedValue, Timestamp,
    },
    async_trait,
};
use skydash_core::{Controller, Dashboard, DashboardEvent, RenderedDashboard, ViewMode};
use std::sync::Arc;
use tracing::{debug, info, warn};

const COMMAND_NAME: &str = "weather";
const LOCATION_OPTION: &str = "location";

pub async fn run(token: &str, controller: Arc<Controller>) -> anyhow::Result<()> {
    let mut client = Client::builder(token, GatewayIntents::empty())
        .event_handler(Handler { controller })
        .await
        .context("Failed to create Discord client")?;

    client.start().await.context("Discord client stopped")
}

struct Handler {
    controller: Arc<Controller>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "connected to Discord");

        if let Err(e) = Command::create_global_command(&ctx.http, weather_command()).await {
            warn!(error = %e, "failed to register /{COMMAND_NAME}");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let result = match interaction {
            Interaction::Command(cmd) if cmd.data.name == COMMAND_NAME => {
                self.on_search(&ctx, &cmd).await
            }
            Interaction::Autocomplete(ac) if ac.data.name == COMMAND_NAME => {
                self.on_autocomplete(&ctx, &ac).await
            }
            Interaction::Component(press) => self.on_button(&ctx, &press).await,
            _ => Ok(()),
        };

        if let Err(e) = result {
            warn!(error = %e, "failed to answer interaction");
        }
    }
}

impl Handler {
    async fn on_search(&self, ctx: &Context, cmd: &CommandInteraction) -> serenity::Result<()> {
        let query = location_argument(cmd).unwrap_or_default();
        cmd.defer(&ctx.http).await?;

        let reply = match self.controller.search(cmd.user.id.get(), &query).await {
            Ok(rendered) => EditInteractionResponse::new()
                .embed(embed(&rendered.dashboard))
                .components(buttons(&rendered)),
            Err(e) => {
                info!(error = %e, "search produced no dashboard");
                EditInteractionResponse::new().content(e.user_message())
            }
        };

        cmd.edit_response(&ctx.http, reply).await?;
        Ok(())
    }

    async fn on_autocomplete(
        &self,
        ctx: &Context,
        ac: &CommandInteraction,
    ) -> serenity::Result<()> {
        let partial = ac
            .data
            .autocomplete()
            .map(|option| option.value.to_owned())
            .unwrap_or_default();

        let choices = self
            .controller
            .suggest(&partial)
            .await
            .into_iter()
            .fold(CreateAutocompleteResponse::new(), |response, s| {
                response.add_string_choice(s.label, s.value)
            });

        ac.create_response(&ctx.http, CreateInteractionResponse::Autocomplete(choices))
            .await
    }

    async fn on_button(&self, ctx: &Context, press: &ComponentInteraction) -> serenity::Result<()> {
        let Some((event, session_id)) = DashboardEvent::parse_custom_id(&press.data.custom_id)
        else {
            debug!(custom_id = %press.data.custom_id, "ignoring unknown component");
            return Ok(());
        };

        // Unit toggles re-fetch weather, which can outlast Discord's 3-second reply window.
        press.defer(&ctx.http).await?;

        match self
            .controller
            .press(session_id, press.user.id.get(), event)
            .await
        {
            Ok(outcome) => {
                if let Some(rendered) = outcome.rendered() {
                    let edit = EditInteractionResponse::new()
                        .embed(embed(&rendered.dashboard))
                        .components(buttons(rendered));
                    press.edit_response(&ctx.http, edit).await?;
                }
                if let Some(notice) = outcome.notice() {
                    ephemeral(ctx, press, notice).await?;
                }
            }
            Err(e) => {
                info!(error = %e, %session_id, "button press rejected");
                ephemeral(ctx, press, e.user_message()).await?;
            }
        }

        Ok(())
    }
}

async fn ephemeral(
    ctx: &Context,
    press: &ComponentInteraction,
    content: String,
) -> serenity::Result<()> {
    press
        .create_followup(
            &ctx.http,
            CreateInteractionResponseFollowup::new()
                .content(content)
                .ephemeral(true),
        )
        .await?;
    Ok(())
}

fn weather_command() -> CreateCommand {
    CreateCommand::new(COMMAND_NAME)
        .description("Search for weather in a specific location")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                LOCATION_OPTION,
                "Type the city or place name (e.g. London, UK)",
            )
            .required(true)
            .set_autocomplete(true),
        )
}

fn location_argument(cmd: &CommandInteraction) -> Option<String> {
    cmd.data
        .options()
        .into_iter()
        .find(|option| option.name == LOCATION_OPTION)
        .and_then(|option| match option.value {
            ResolvedValue::String(value) => Some(value.to_owned()),
            _ => None,
        })
}

fn embed(dashboard: &Dashboard) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title(&dashboard.title)
        .color(dashboard.color)
        .fields(
            dashboard
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.value.clone(), f.inline)),
        )
        .footer(CreateEmbedFooter::new(&dashboard.footer));

    if let Some(description) = &dashboard.description {
        embed = embed.description(description);
    }
    if let Some(url) = &dashboard.image_url {
        embed = embed.image(url);
    }
    if let Ok(timestamp) = Timestamp::from_unix_timestamp(dashboard.timestamp.timestamp()) {
        embed = embed.timestamp(timestamp);
    }

    embed
}

fn buttons(rendered: &RenderedDashboard) -> Vec<CreateActionRow> {
    let id = rendered.session_id;
    let (view_label, view_emoji) = match rendered.mode {
        ViewMode::Current => ("Forecast", "📅"),
        ViewMode::Forecast => ("Now", "🏠"),
    };

    vec![CreateActionRow::Buttons(vec![
        CreateButton::new(DashboardEvent::Refresh.custom_id(id))
            .label("Refresh")
            .emoji(unicode("🔄"))
            .style(ButtonStyle::Secondary),
        CreateButton::new(DashboardEvent::SwitchView.custom_id(id))
            .label(view_label)
            .emoji(unicode(view_emoji))
            .style(ButtonStyle::Primary),
        CreateButton::new(DashboardEvent::ToggleUnits.custom_id(id))
            .label("Units")
            .emoji(unicode("🌡️"))
            .style(ButtonStyle::Secondary),
    ])]
}

fn unicode(emoji: &str) -> ReactionType {
    ReactionType::Unicode(emoji.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use skydash_core::{DashboardField, SessionId};

    fn session_id() -> SessionId {
        SessionId::from_u128(0x1234)
    }

    fn rendered(mode: ViewMode) -> RenderedDashboard {
        RenderedDashboard {
            session_id: session_id(),
            mode,
            dashboard: Dashboard {
                title: "📍 London, United Kingdom".into(),
                description: Some("### ☁️ Overcast".into()),
                fields: vec![DashboardField {
                    name: "Temperature".into(),
                    value: "**15.2°C**".into(),
                    inline: true,
                }],
                image_url: None,
                footer: "SkyDash • Metric units".into(),
                color: 0x2b2d31,
                timestamp: Utc::now(),
            },
        }
    }

    #[test]
    fn buttons_carry_session_and_target_view() {
        let json = serde_json::to_string(&buttons(&rendered(ViewMode::Current))).unwrap();
        let id = session_id();

        for event in [
            DashboardEvent::Refresh,
            DashboardEvent::SwitchView,
            DashboardEvent::ToggleUnits,
        ] {
            assert!(json.contains(&event.custom_id(id)), "{json}");
        }
        assert!(json.contains("\"Forecast\""));

        let json = serde_json::to_string(&buttons(&rendered(ViewMode::Forecast))).unwrap();
        assert!(json.contains("\"Now\""));
    }

    #[test]
    fn embed_copies_dashboard() {
        let json = serde_json::to_string(&embed(&rendered(ViewMode::Current).dashboard)).unwrap();

        assert!(json.contains("📍 London, United Kingdom"));
        assert!(json.contains("**15.2°C**"));
        assert!(json.contains("SkyDash • Metric units"));
    }
}
