use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tabmask::{
    EngineConfig, HeaderFooterPacket, Identity, PlayerListItem, Property, Skin, TeamAction,
    TeamInfo,
};
use uuid::Uuid;

/// A recorded session: the viewer, the engine configuration and the ordered
/// backend events and row commands to feed through the engine.
#[derive(Debug, Deserialize)]
pub struct Script {
    pub viewer: Uuid,
    #[serde(default)]
    pub config: EngineConfig,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid script {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Connect,
    Add {
        players: Vec<PlayerSpec>,
    },
    Remove {
        players: Vec<Uuid>,
    },
    Latency {
        player: Uuid,
        latency: i32,
    },
    GameMode {
        player: Uuid,
        game_mode: i32,
    },
    DisplayName {
        player: Uuid,
        #[serde(default)]
        display_name: Option<String>,
    },
    Team {
        name: String,
        action: TeamActionSpec,
    },
    HeaderFooter {
        header: String,
        #[serde(default)]
        footer: String,
    },
    SetRow {
        index: usize,
        #[serde(default)]
        skin: Skin,
        #[serde(default)]
        text: String,
        #[serde(default)]
        latency: i32,
    },
    SetText {
        index: usize,
        text: String,
    },
    SetLatency {
        index: usize,
        latency: i32,
    },
    SetSize {
        size: usize,
    },
    Passthrough {
        enabled: bool,
    },
    CustomHeaderFooter {
        #[serde(default)]
        content: Option<HeaderFooterSpec>,
    },
    ServerSwitch,
    Disconnect,
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::Connect => "connect",
            Step::Add { .. } => "add",
            Step::Remove { .. } => "remove",
            Step::Latency { .. } => "latency",
            Step::GameMode { .. } => "game_mode",
            Step::DisplayName { .. } => "display_name",
            Step::Team { .. } => "team",
            Step::HeaderFooter { .. } => "header_footer",
            Step::SetRow { .. } => "set_row",
            Step::SetText { .. } => "set_text",
            Step::SetLatency { .. } => "set_latency",
            Step::SetSize { .. } => "set_size",
            Step::Passthrough { .. } => "passthrough",
            Step::CustomHeaderFooter { .. } => "custom_header_footer",
            Step::ServerSwitch => "server_switch",
            Step::Disconnect => "disconnect",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSpec {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub latency: i32,
    #[serde(default)]
    pub game_mode: i32,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl PlayerSpec {
    pub fn to_item(&self) -> PlayerListItem {
        let mut item = PlayerListItem::player(Identity::from(self.id), self.name.as_str())
            .with_latency(self.latency)
            .with_game_mode(self.game_mode)
            .with_properties(self.properties.clone());
        item.display_name = self.display_name.clone();
        item
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TeamActionSpec {
    Create {
        #[serde(default)]
        info: TeamInfoSpec,
        #[serde(default)]
        members: Vec<String>,
    },
    Remove,
    UpdateInfo {
        #[serde(default)]
        info: TeamInfoSpec,
    },
    AddMembers {
        members: Vec<String>,
    },
    RemoveMembers {
        members: Vec<String>,
    },
    OverwriteMembers {
        members: Vec<String>,
    },
}

impl TeamActionSpec {
    pub fn to_action(&self) -> TeamAction {
        match self {
            TeamActionSpec::Create { info, members } => TeamAction::Create {
                info: info.to_info(),
                members: members.clone(),
            },
            TeamActionSpec::Remove => TeamAction::Remove,
            TeamActionSpec::UpdateInfo { info } => TeamAction::UpdateInfo(info.to_info()),
            TeamActionSpec::AddMembers { members } => TeamAction::AddMembers(members.clone()),
            TeamActionSpec::RemoveMembers { members } => {
                TeamAction::RemoveMembers(members.clone())
            }
            TeamActionSpec::OverwriteMembers { members } => {
                TeamAction::OverwriteMembers(members.clone())
            }
        }
    }
}

/// Team attributes; anything left out takes the client defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeamInfoSpec {
    pub display_name: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub friendly_fire: Option<u8>,
    pub name_tag_visibility: Option<String>,
    pub collision_rule: Option<String>,
    pub color: Option<i8>,
}

impl TeamInfoSpec {
    fn to_info(&self) -> TeamInfo {
        let defaults = TeamInfo::default();
        TeamInfo {
            display_name: self.display_name.clone().unwrap_or(defaults.display_name),
            prefix: self.prefix.clone().unwrap_or(defaults.prefix),
            suffix: self.suffix.clone().unwrap_or(defaults.suffix),
            friendly_fire: self.friendly_fire.unwrap_or(defaults.friendly_fire),
            name_tag_visibility: self
                .name_tag_visibility
                .clone()
                .unwrap_or(defaults.name_tag_visibility),
            collision_rule: self.collision_rule.clone().or(defaults.collision_rule),
            color: self.color.unwrap_or(defaults.color),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeaderFooterSpec {
    pub header: String,
    #[serde(default)]
    pub footer: String,
}

impl HeaderFooterSpec {
    pub fn to_packet(&self) -> HeaderFooterPacket {
        HeaderFooterPacket::new(self.header.as_str(), self.footer.as_str())
    }
}
