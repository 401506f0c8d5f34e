//! Welcome message templates.

use crate::guild::model::WelcomeConfig;

/// Platform cap on a single message.
pub const MAX_WELCOME_LEN: usize = 2000;

/// Who joined and where, for template substitution.
#[derive(Debug, Clone)]
pub struct JoinContext<'a> {
    pub user_id: u64,
    pub user_name: &'a str,
    pub server_name: &'a str,
}

/// Substitute `{user.mention}`, `{user.name}` and `{server.name}`.
pub fn render(template: &str, join: &JoinContext<'_>) -> String {
    template
        .replace("{user.mention}", &format!("<@{}>", join.user_id))
        .replace("{user.name}", join.user_name)
        .replace("{server.name}", join.server_name)
}

pub fn validate_template(template: &str) -> Result<(), String> {
    if template.trim().is_empty() {
        return Err("Welcome message cannot be empty".to_string());
    }
    let len = template.chars().count();
    if len > MAX_WELCOME_LEN {
        return Err(format!(
            "Welcome message is {} characters (max {})",
            len, MAX_WELCOME_LEN
        ));
    }
    Ok(())
}

/// What to do when someone joins a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPlan {
    /// Channel and rendered text, when a greeting is configured.
    pub greeting: Option<(u64, String)>,
    pub role_ids: Vec<u64>,
}

impl JoinPlan {
    pub fn new(config: &WelcomeConfig, join: &JoinContext<'_>, is_bot: bool) -> Self {
        let greeting = match (config.channel_id, config.message.as_deref()) {
            (Some(channel_id), Some(template)) => {
                let mut text = render(template, join);
                if let Some((end, _)) = text.char_indices().nth(MAX_WELCOME_LEN) {
                    text.truncate(end);
                }
                Some((channel_id, text))
            }
            _ => None,
        };
        Self {
            greeting,
            role_ids: config.roles_for(is_bot).to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.greeting.is_none() && self.role_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_placeholders() {
        let join = JoinContext {
            user_id: 42,
            user_name: "aria",
            server_name: "Tavern",
        };
        assert_eq!(
            render("Welcome {user.mention} to {server.name}! Hi {user.name}, {user.name}.", &join),
            "Welcome <@42> to Tavern! Hi aria, aria."
        );
        assert_eq!(render("{unknown}", &join), "{unknown}");
    }

    #[test]
    fn test_template_length() {
        assert!(validate_template("hi").is_ok());
        assert!(validate_template(" ").is_err());
        assert!(validate_template(&"x".repeat(2001)).is_err());
    }

    #[test]
    fn test_join_plan_picks_roles_by_kind() {
        let mut config = WelcomeConfig::new(7);
        config.user_role_ids = vec![1];
        config.bot_role_ids = vec![2, 3];
        let join = JoinContext {
            user_id: 42,
            user_name: "aria",
            server_name: "Tavern",
        };

        let human = JoinPlan::new(&config, &join, false);
        assert_eq!(human.greeting, None);
        assert_eq!(human.role_ids, vec![1]);
        assert_eq!(JoinPlan::new(&config, &join, true).role_ids, vec![2, 3]);

        config.channel_id = Some(9);
        config.message = Some("Hi {user.mention}".to_string());
        let plan = JoinPlan::new(&config, &join, false);
        assert_eq!(plan.greeting, Some((9, "Hi <@42>".to_string())));
        assert!(JoinPlan::new(&WelcomeConfig::new(7), &join, false).is_empty());
    }

    #[test]
    fn test_rendered_greeting_is_capped() {
        let mut config = WelcomeConfig::new(7);
        config.channel_id = Some(9);
        config.message = Some(format!("{}{{server.name}}", "x".repeat(1990)));
        let join = JoinContext {
            user_id: 42,
            user_name: "aria",
            server_name: "The Gilded Ölmühle Tavern",
        };

        let (_, text) = JoinPlan::new(&config, &join, false).greeting.unwrap();
        assert_eq!(text.chars().count(), MAX_WELCOME_LEN);
        assert!(text.ends_with("The Gilded"));
    }
}
