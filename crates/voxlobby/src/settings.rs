//! Startup settings: the JSON lobby definitions and their validation.
//!
//! ```json
//! {
//!   "group": 10,
//!   "status_channel": 20,
//!   "lobbies": [{
//!     "trigger_room": 100,
//!     "display_name": "Duo",
//!     "capacity": 2,
//!     "channel_title": "Room #{index}",
//!     "message_title": "{current}/{limit} #{index}"
//!   }]
//! }
//! ```
//!
//! Templates are parsed while deserializing, so an unknown placeholder is
//! a load-time [`ConfigError::Parse`], never a render-time surprise.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use voxlobby_lobby::{LobbyConfig, LobbyTemplates};
use voxlobby_protocol::{ChannelId, GroupId, RoomId};
use voxlobby_template::{LinkTemplate, MemberTemplate, TitleTemplate};

use crate::ConfigError;

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Default group for lobbies that do not name their own.
    #[serde(default)]
    pub group: Option<GroupId>,

    /// Default status channel for lobbies that do not name their own.
    #[serde(default)]
    pub status_channel: Option<ChannelId>,

    pub lobbies: Vec<LobbyDefinition>,
}

/// One lobby kind as written in the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyDefinition {
    pub trigger_room: RoomId,
    pub display_name: String,
    pub capacity: usize,
    #[serde(default)]
    pub group: Option<GroupId>,
    #[serde(default)]
    pub status_channel: Option<ChannelId>,
    pub channel_title: TitleTemplate,
    #[serde(default)]
    pub channel_title_full: Option<TitleTemplate>,
    pub message_title: TitleTemplate,
    #[serde(default)]
    pub message_title_full: Option<TitleTemplate>,
    #[serde(default)]
    pub member_line: Option<MemberTemplate>,
    #[serde(default)]
    pub link: Option<LinkTemplate>,
    #[serde(default)]
    pub link_full: Option<LinkTemplate>,
}

impl Settings {
    /// Parses settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validates the settings and produces one [`LobbyConfig`] per lobby,
    /// filling in process-wide defaults.
    pub fn resolve(&self) -> Result<Vec<LobbyConfig>, ConfigError> {
        let configs = self
            .lobbies
            .iter()
            .map(|def| self.resolve_one(def))
            .collect::<Result<Vec<_>, _>>()?;
        validate(&configs)?;
        Ok(configs)
    }

    fn resolve_one(&self, def: &LobbyDefinition) -> Result<LobbyConfig, ConfigError> {
        let group = def
            .group
            .or(self.group)
            .ok_or_else(|| ConfigError::MissingGroup {
                lobby: def.display_name.clone(),
            })?;
        let status_channel = def.status_channel.or(self.status_channel).ok_or_else(|| {
            ConfigError::MissingStatusChannel {
                lobby: def.display_name.clone(),
            }
        })?;

        Ok(LobbyConfig {
            trigger: def.trigger_room,
            name: def.display_name.clone(),
            capacity: def.capacity,
            group,
            status_channel,
            templates: LobbyTemplates {
                channel_title: def.channel_title.clone(),
                channel_title_full: def.channel_title_full.clone(),
                message_title: def.message_title.clone(),
                message_title_full: def.message_title_full.clone(),
                member_line: def.member_line.clone().unwrap_or_default(),
                link: def.link.clone().unwrap_or_default(),
                link_full: def.link_full.clone(),
            },
        })
    }
}

/// Checks a set of resolved lobby configurations for shape errors.
pub fn validate(configs: &[LobbyConfig]) -> Result<(), ConfigError> {
    if configs.is_empty() {
        return Err(ConfigError::NoLobbies);
    }
    let mut triggers = HashSet::new();
    for config in configs {
        if config.capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                lobby: config.name.clone(),
            });
        }
        if !triggers.insert(config.trigger) {
            return Err(ConfigError::DuplicateTrigger(config.trigger));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUO: &str = r#"{
        "group": 10,
        "status_channel": 20,
        "lobbies": [{
            "trigger_room": 100,
            "display_name": "Duo",
            "capacity": 2,
            "channel_title": "Room #{index}",
            "message_title": "{current}/{limit} #{index}"
        }]
    }"#;

    #[test]
    fn test_resolve_applies_defaults() {
        let configs = Settings::from_json(DUO).unwrap().resolve().unwrap();
        assert_eq!(configs.len(), 1);
        let duo = &configs[0];
        assert_eq!(duo.trigger, RoomId(100));
        assert_eq!(duo.group, GroupId(10));
        assert_eq!(duo.status_channel, ChannelId(20));
        assert_eq!(duo.templates.member_line.source(), "[{index}] - {tag}");
        assert_eq!(duo.templates.link.source(), "Join - {link}");
        assert!(duo.templates.message_title_full.is_none());
    }

    #[test]
    fn test_lobby_bindings_override_defaults() {
        let json = r#"{
            "group": 10,
            "status_channel": 20,
            "lobbies": [{
                "trigger_room": 100, "display_name": "Squad", "capacity": 4,
                "group": 11, "status_channel": 21,
                "channel_title": "Squad {index}",
                "message_title": "{current}/{limit}",
                "member_line": "{index}. {tag}",
                "link_full": "Squad is full"
            }]
        }"#;
        let configs = Settings::from_json(json).unwrap().resolve().unwrap();
        assert_eq!(configs[0].group, GroupId(11));
        assert_eq!(configs[0].status_channel, ChannelId(21));
        assert_eq!(configs[0].templates.member_line.source(), "{index}. {tag}");
        assert_eq!(
            configs[0].templates.link_full.as_ref().map(|t| t.source()),
            Some("Squad is full")
        );
    }

    #[test]
    fn test_missing_group_is_rejected() {
        let json = DUO.replace("\"group\": 10,", "");
        let err = Settings::from_json(&json).unwrap().resolve().unwrap_err();
        assert!(matches!(err, ConfigError::MissingGroup { lobby } if lobby == "Duo"));
    }

    #[test]
    fn test_missing_status_channel_is_rejected() {
        let json = DUO.replace("\"status_channel\": 20,", "");
        let err = Settings::from_json(&json).unwrap().resolve().unwrap_err();
        assert!(matches!(err, ConfigError::MissingStatusChannel { .. }));
    }

    #[test]
    fn test_no_lobbies_is_rejected() {
        let settings = Settings::from_json(r#"{"group": 1, "status_channel": 2, "lobbies": []}"#).unwrap();
        assert!(matches!(settings.resolve(), Err(ConfigError::NoLobbies)));
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let json = DUO.replace("\"capacity\": 2", "\"capacity\": 0");
        let err = Settings::from_json(&json).unwrap().resolve().unwrap_err();
        assert!(matches!(err, ConfigError::ZeroCapacity { .. }));
    }

    #[test]
    fn test_duplicate_trigger_is_rejected() {
        let mut settings = Settings::from_json(DUO).unwrap();
        let mut twin = settings.lobbies[0].clone();
        twin.display_name = "Twin".into();
        settings.lobbies.push(twin);
        assert!(matches!(
            settings.resolve(),
            Err(ConfigError::DuplicateTrigger(RoomId(100)))
        ));
    }

    #[test]
    fn test_unknown_placeholder_fails_at_load() {
        let json = DUO.replace("Room #{index}", "Room #{owner}");
        let err = Settings::from_json(&json).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("owner"));
    }

    #[test]
    fn test_malformed_json_fails() {
        assert!(matches!(
            Settings::from_json("{\"lobbies\": ["),
            Err(ConfigError::Parse(_))
        ));
    }
}
