//! Slash command definitions registered on ready.

use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::http::Http;
use serenity::model::application::{Command, CommandOptionType};
use serenity::model::channel::ChannelType;
use serenity::model::id::GuildId;
use serenity::model::permissions::Permissions;
use tracing::info;

fn subcommand(name: &str, description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::SubCommand, name, description)
}

fn text(name: &str, description: &str) -> CreateCommandOption {
    CreateCommandOption::new(CommandOptionType::String, name, description).required(true)
}

fn avatar() -> CreateCommand {
    CreateCommand::new("avatar")
        .description("Manage your avatars")
        .add_option(subcommand("list", "Show your avatars"))
        .add_option(
            subcommand("select", "Open one of your avatars").add_sub_option(
                text("avatar", "The avatar to open").set_autocomplete(true),
            ),
        )
        .add_option(subcommand("create", "Create a new avatar"))
}

fn welcome() -> CreateCommand {
    CreateCommand::new("welcome")
        .description("Greet new members and give them roles")
        .default_member_permissions(Permissions::MANAGE_GUILD)
        .add_option(
            subcommand("message", "Set the welcome channel and message")
                .add_sub_option(
                    CreateCommandOption::new(CommandOptionType::Channel, "channel", "Where to greet")
                        .channel_types(vec![ChannelType::Text])
                        .required(true),
                )
                .add_sub_option(text(
                    "content",
                    "Message; {user.mention}, {user.name} and {server.name} are replaced",
                )),
        )
        .add_option(
            subcommand("user-roles", "Roles given to new members")
                .add_sub_option(text("roles", "Role mentions or ids")),
        )
        .add_option(
            subcommand("bot-roles", "Roles given to new bots")
                .add_sub_option(text("roles", "Role mentions or ids")),
        )
        .add_option(subcommand("preview", "Show the welcome message as you would see it"))
        .add_option(subcommand("status", "Show the welcome settings"))
        .add_option(subcommand("disable", "Stop greeting new members"))
}

fn reaction_roles() -> CreateCommand {
    CreateCommand::new("rr")
        .description("Reaction roles")
        .default_member_permissions(Permissions::MANAGE_ROLES)
        .add_option(
            subcommand("add", "Give roles to members who react to a message")
                .add_sub_option(text("message_id", "Id of the message in this channel"))
                .add_sub_option(text("roles", "Role mentions or ids"))
                .add_sub_option(text("emoji", "The emoji to react with")),
        )
        .add_option(subcommand("remove", "Remove a reaction role"))
}

fn ping() -> CreateCommand {
    CreateCommand::new("ping").description("Check the bot's latency")
}

pub fn all() -> Vec<CreateCommand> {
    vec![avatar(), welcome(), reaction_roles(), ping()]
}

/// Guild commands update instantly; global ones can take an hour to appear.
pub async fn register(http: &Http, guild_id: Option<u64>) -> serenity::Result<()> {
    let commands = all();
    let count = commands.len();
    match guild_id {
        Some(id) => {
            GuildId::new(id).set_commands(http, commands).await?;
            info!("Registered {} commands in guild {}", count, id);
        }
        None => {
            Command::set_global_commands(http, commands).await?;
            info!("Registered {} global commands", count);
        }
    }
    Ok(())
}
