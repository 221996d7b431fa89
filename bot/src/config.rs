use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::Deserialize;
use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::de::{DeserializeOwned, IntoDeserializer};
use tracing::{info, warn};

use crate::commands::parser::CommandParser;
use crate::engine::escalation::{EscalationLayout, EscalationSettings, ResolvePolicy};
use crate::engine::guild::{AdminLookup, AdminRoleRule};
use crate::engine::overwrites::BotVisibility;
use crate::engine::validation::{MAX_HISTORY_FETCH, validate_prefix};

/// Top-level bot configuration, loaded from adminbridge.toml.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct BotConfig {
    pub bot: BotSection,
    pub guild: GuildSection,
    pub escalation: EscalationSection,
    pub commands: CommandsSection,
    pub platform: PlatformSection,
}

#[derive(Deserialize)]
#[serde(default)]
pub struct BotSection {
    pub prefix: String,
    /// Bot token. Usually supplied through DISCORD_TOKEN instead.
    pub token: String,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            prefix: "~".into(),
            token: String::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct GuildSection {
    pub admin_channel_name: String,
    pub admin_role_rule: AdminRoleRule,
    /// Used by the `named` rule.
    pub admin_role_name: String,
}

impl Default for GuildSection {
    fn default() -> Self {
        Self {
            admin_channel_name: "admins".into(),
            admin_role_rule: AdminRoleRule::Named,
            admin_role_name: "admins".into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct EscalationSection {
    pub layout: EscalationLayout,
    pub resolve_policy: ResolvePolicy,
    pub bot_visibility: BotVisibility,
    pub channel_suffix: String,
    pub admin_side_suffix: String,
}

impl Default for EscalationSection {
    fn default() -> Self {
        let defaults = EscalationSettings::default();
        Self {
            layout: defaults.layout,
            resolve_policy: defaults.resolve_policy,
            bot_visibility: defaults.bot_visibility,
            channel_suffix: defaults.channel_suffix,
            admin_side_suffix: defaults.admin_side_suffix,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct CommandsSection {
    pub allow_abbrev: bool,
    pub default_sleep_secs: u64,
    pub max_sleep_secs: u64,
    /// How far back `count` looks.
    pub count_history_limit: usize,
}

impl Default for CommandsSection {
    fn default() -> Self {
        Self {
            allow_abbrev: true,
            default_sleep_secs: 5,
            max_sleep_secs: 3600,
            count_history_limit: 100,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct PlatformSection {
    pub call_timeout_secs: u64,
    /// Extra attempts for idempotent calls.
    pub max_retries: u32,
}

impl Default for PlatformSection {
    fn default() -> Self {
        Self {
            call_timeout_secs: 10,
            max_retries: 2,
        }
    }
}

impl BotConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            Self::from_toml_str(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        } else {
            info!("No config file found at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a key lookup (the process environment in
    /// production). Values that do not parse are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("DISCORD_TOKEN") {
            self.bot.token = v;
        }
        if let Some(v) = lookup("BOT_PREFIX") {
            self.bot.prefix = v;
        }
        if let Some(v) = lookup("ADMIN_CHANNEL_NAME") {
            self.guild.admin_channel_name = v;
        }
        if let Some(v) = lookup("ADMIN_ROLE_RULE")
            && let Some(rule) = parse_choice("ADMIN_ROLE_RULE", &v)
        {
            self.guild.admin_role_rule = rule;
        }
        if let Some(v) = lookup("ESCALATION_LAYOUT")
            && let Some(layout) = parse_choice("ESCALATION_LAYOUT", &v)
        {
            self.escalation.layout = layout;
        }
        if let Some(v) = lookup("RESOLVE_POLICY")
            && let Some(policy) = parse_choice("RESOLVE_POLICY", &v)
        {
            self.escalation.resolve_policy = policy;
        }
        if let Some(v) = lookup("BOT_VISIBILITY")
            && let Some(visibility) = parse_choice("BOT_VISIBILITY", &v)
        {
            self.escalation.bot_visibility = visibility;
        }
        if let Some(v) = lookup("PLATFORM_CALL_TIMEOUT_SECS") {
            match v.parse() {
                Ok(secs) => self.platform.call_timeout_secs = secs,
                Err(_) => warn!(value = %v, "ignoring invalid PLATFORM_CALL_TIMEOUT_SECS"),
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_prefix(&self.bot.prefix).map_err(anyhow::Error::msg)?;
        let commands = &self.commands;
        if commands.default_sleep_secs == 0 || commands.default_sleep_secs > commands.max_sleep_secs {
            bail!(
                "default_sleep_secs must be between 1 and max_sleep_secs ({})",
                commands.max_sleep_secs
            );
        }
        if commands.count_history_limit == 0 || commands.count_history_limit > MAX_HISTORY_FETCH {
            bail!("count_history_limit must be between 1 and {MAX_HISTORY_FETCH}");
        }
        if self.platform.call_timeout_secs == 0 {
            bail!("call_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn admin_lookup(&self) -> AdminLookup {
        AdminLookup {
            channel_name: self.guild.admin_channel_name.clone(),
            role_rule: self.guild.admin_role_rule,
            role_name: self.guild.admin_role_name.clone(),
        }
    }

    pub fn escalation_settings(&self) -> EscalationSettings {
        EscalationSettings {
            layout: self.escalation.layout,
            resolve_policy: self.escalation.resolve_policy,
            bot_visibility: self.escalation.bot_visibility,
            channel_suffix: self.escalation.channel_suffix.clone(),
            admin_side_suffix: self.escalation.admin_side_suffix.clone(),
        }
    }

    pub fn parser(&self) -> CommandParser {
        CommandParser::new(self.bot.prefix.clone())
            .allow_abbrev(self.commands.allow_abbrev)
            .sleep_bounds(self.commands.default_sleep_secs, self.commands.max_sleep_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.platform.call_timeout_secs)
    }
}

/// Parse a kebab-case enum value the same way the TOML file would.
fn parse_choice<T: DeserializeOwned>(key: &str, value: &str) -> Option<T> {
    let deserializer: StrDeserializer<'_, ValueError> = value.into_deserializer();
    match T::deserialize(deserializer) {
        Ok(choice) => Some(choice),
        Err(e) => {
            warn!(key, value, error = %e, "ignoring invalid override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::from_toml_str("").unwrap();
        assert_eq!(config.bot.prefix, "~");
        assert_eq!(config.guild.admin_channel_name, "admins");
        assert_eq!(config.escalation.layout, EscalationLayout::Paired);
        assert_eq!(config.escalation.resolve_policy, ResolvePolicy::AdminSide);
        assert_eq!(config.commands.default_sleep_secs, 5);
        assert_eq!(config.commands.count_history_limit, 100);
        assert_eq!(config.call_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_file() {
        let config = BotConfig::from_toml_str(
            r#"
            [bot]
            prefix = "!"

            [guild]
            admin_role_rule = "first-administrator"

            [escalation]
            layout = "shared"
            resolve_policy = "administrators"
            bot_visibility = "deny"

            [commands]
            allow_abbrev = false
            max_sleep_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.bot.prefix, "!");
        assert_eq!(config.guild.admin_role_rule, AdminRoleRule::FirstAdministrator);
        assert_eq!(config.escalation.layout, EscalationLayout::Shared);
        assert_eq!(config.escalation.resolve_policy, ResolvePolicy::Administrators);
        assert_eq!(config.escalation.bot_visibility, BotVisibility::Deny);
        assert!(!config.commands.allow_abbrev);
        assert_eq!(config.commands.max_sleep_secs, 60);
        assert_eq!(config.escalation.channel_suffix, "talking-to-admins");
    }

    #[test]
    fn test_unknown_choice_is_rejected_in_file() {
        assert!(BotConfig::from_toml_str("[escalation]\nlayout = \"triple\"").is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = BotConfig::default();
        config.apply_overrides(env(&[
            ("DISCORD_TOKEN", "secret"),
            ("BOT_PREFIX", "?"),
            ("ESCALATION_LAYOUT", "shared"),
            ("RESOLVE_POLICY", "administrators"),
            ("ADMIN_ROLE_RULE", "first-administrator"),
            ("PLATFORM_CALL_TIMEOUT_SECS", "3"),
        ]));
        assert_eq!(config.bot.token, "secret");
        assert_eq!(config.bot.prefix, "?");
        assert_eq!(config.escalation.layout, EscalationLayout::Shared);
        assert_eq!(config.escalation.resolve_policy, ResolvePolicy::Administrators);
        assert_eq!(config.guild.admin_role_rule, AdminRoleRule::FirstAdministrator);
        assert_eq!(config.call_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = BotConfig::default();
        config.apply_overrides(env(&[
            ("ESCALATION_LAYOUT", "sideways"),
            ("PLATFORM_CALL_TIMEOUT_SECS", "soon"),
        ]));
        assert_eq!(config.escalation.layout, EscalationLayout::Paired);
        assert_eq!(config.platform.call_timeout_secs, 10);
    }

    #[test]
    fn test_validation() {
        let mut config = BotConfig::default();
        config.bot.prefix = "two words".into();
        assert!(config.validate().is_err());

        let mut config = BotConfig::default();
        config.commands.default_sleep_secs = 0;
        assert!(config.validate().is_err());

        let mut config = BotConfig::default();
        config.commands.max_sleep_secs = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_history_limit_bounds() {
        let mut config = BotConfig::default();
        config.commands.count_history_limit = 0;
        assert!(config.validate().is_err());

        config.commands.count_history_limit = 101;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("between 1 and 100"));

        config.commands.count_history_limit = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parser_uses_prefix_bounds() {
        let mut config = BotConfig::default();
        config.commands.max_sleep_secs = 10;
        let parser = config.parser();
        assert!(parser.parse("sleep 11").is_err());
        assert!(parser.usage().contains("~summon"));
    }
}
