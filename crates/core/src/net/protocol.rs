use std::fmt;

use rkyv::{rancor, Archive, Deserialize, Serialize};
use uuid::Uuid;

pub const GAME_MODE_SURVIVAL: i32 = 0;
pub const GAME_MODE_SPECTATOR: i32 = 3;

/// UUID version used by server-side NPC integrations.
const NPC_UUID_VERSION: usize = 2;

/// Opaque 128-bit player identity as it travels on the wire.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Archive,
    Serialize,
    Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
#[serde(from = "Uuid", into = "Uuid")]
pub struct Identity(u128);

impl Identity {
    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    pub const fn as_u128(&self) -> u128 {
        self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_u128(self.0)
    }

    pub fn version_tag(&self) -> usize {
        self.to_uuid().get_version_num()
    }

    pub fn is_npc(&self) -> bool {
        self.version_tag() == NPC_UUID_VERSION
    }
}

impl From<Uuid> for Identity {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.as_u128())
    }
}

impl From<Identity> for Uuid {
    fn from(identity: Identity) -> Self {
        identity.to_uuid()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uuid().hyphenated())
    }
}

/// One signed profile property (textures and the like).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Archive,
    Serialize,
    Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[rkyv(derive(Debug))]
pub struct Property {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub signature: Option<String>,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            signature: None,
        }
    }

    pub fn signed(
        name: impl Into<String>,
        value: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            signature: Some(signature.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub enum PlayerListAction {
    AddPlayer,
    UpdateGameMode,
    UpdateLatency,
    UpdateDisplayName,
    RemovePlayer,
}

/// Only the fields relevant to the packet's action are meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct PlayerListItem {
    pub id: Identity,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub latency: i32,
    pub game_mode: i32,
    pub properties: Vec<Property>,
}

impl PlayerListItem {
    pub fn new(id: Identity) -> Self {
        Self {
            id,
            username: None,
            display_name: None,
            latency: 0,
            game_mode: GAME_MODE_SURVIVAL,
            properties: Vec::new(),
        }
    }

    pub fn player(id: Identity, username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Self::new(id)
        }
    }

    pub fn with_latency(mut self, latency: i32) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_game_mode(mut self, game_mode: i32) -> Self {
        self.game_mode = game_mode;
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_properties(mut self, properties: Vec<Property>) -> Self {
        self.properties = properties;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct PlayerListPacket {
    pub action: PlayerListAction,
    pub items: Vec<PlayerListItem>,
}

impl PlayerListPacket {
    pub fn new(action: PlayerListAction, items: Vec<PlayerListItem>) -> Self {
        Self { action, items }
    }

    pub fn add(items: Vec<PlayerListItem>) -> Self {
        Self::new(PlayerListAction::AddPlayer, items)
    }

    pub fn remove(ids: impl IntoIterator<Item = Identity>) -> Self {
        Self::new(
            PlayerListAction::RemovePlayer,
            ids.into_iter().map(PlayerListItem::new).collect(),
        )
    }

    pub fn latency(id: Identity, latency: i32) -> Self {
        Self::new(
            PlayerListAction::UpdateLatency,
            vec![PlayerListItem::new(id).with_latency(latency)],
        )
    }

    pub fn game_mode(id: Identity, game_mode: i32) -> Self {
        Self::new(
            PlayerListAction::UpdateGameMode,
            vec![PlayerListItem::new(id).with_game_mode(game_mode)],
        )
    }

    pub fn display_name(id: Identity, display_name: Option<String>) -> Self {
        let mut item = PlayerListItem::new(id);
        item.display_name = display_name;
        Self::new(PlayerListAction::UpdateDisplayName, vec![item])
    }

    pub fn ids(&self) -> impl Iterator<Item = Identity> + '_ {
        self.items.iter().map(|item| item.id)
    }
}

pub const NAME_TAG_ALWAYS: &str = "always";
pub const COLLISION_ALWAYS: &str = "always";

/// Visual attributes of a team; membership travels separately.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct TeamInfo {
    pub display_name: String,
    pub prefix: String,
    pub suffix: String,
    pub friendly_fire: u8,
    pub name_tag_visibility: String,
    pub collision_rule: Option<String>,
    pub color: i8,
}

impl Default for TeamInfo {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            prefix: String::new(),
            suffix: String::new(),
            friendly_fire: 0,
            name_tag_visibility: String::from(NAME_TAG_ALWAYS),
            collision_rule: Some(String::from(COLLISION_ALWAYS)),
            color: -1,
        }
    }
}

impl TeamInfo {
    pub fn without_collision_rule(mut self) -> Self {
        self.collision_rule = None;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum TeamAction {
    Create {
        info: TeamInfo,
        members: Vec<String>,
    },
    Remove,
    UpdateInfo(TeamInfo),
    AddMembers(Vec<String>),
    RemoveMembers(Vec<String>),
    OverwriteMembers(Vec<String>),
}

impl TeamAction {
    pub fn members(&self) -> Option<&[String]> {
        match self {
            Self::Create { members, .. }
            | Self::AddMembers(members)
            | Self::RemoveMembers(members)
            | Self::OverwriteMembers(members) => Some(members),
            Self::Remove | Self::UpdateInfo(_) => None,
        }
    }

    pub fn members_mut(&mut self) -> Option<&mut Vec<String>> {
        match self {
            Self::Create { members, .. }
            | Self::AddMembers(members)
            | Self::RemoveMembers(members)
            | Self::OverwriteMembers(members) => Some(members),
            Self::Remove | Self::UpdateInfo(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct TeamPacket {
    pub name: String,
    pub action: TeamAction,
}

impl TeamPacket {
    pub fn new(name: impl Into<String>, action: TeamAction) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct HeaderFooterPacket {
    pub header: String,
    pub footer: String,
}

impl HeaderFooterPacket {
    pub fn new(header: impl Into<String>, footer: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            footer: footer.into(),
        }
    }
}

/// Everything the engine may emit towards the client.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ClientPacket {
    PlayerList(PlayerListPacket),
    Team(TeamPacket),
    HeaderFooter(HeaderFooterPacket),
}

impl From<PlayerListPacket> for ClientPacket {
    fn from(packet: PlayerListPacket) -> Self {
        Self::PlayerList(packet)
    }
}

impl From<TeamPacket> for ClientPacket {
    fn from(packet: TeamPacket) -> Self {
        Self::Team(packet)
    }
}

impl From<HeaderFooterPacket> for ClientPacket {
    fn from(packet: HeaderFooterPacket) -> Self {
        Self::HeaderFooter(packet)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

impl ClientPacket {
    pub fn serialize(&self) -> Result<Vec<u8>, PacketError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(PacketError::Serialize)
    }

    /// Copies into an aligned buffer first; frames read off a stream carry no
    /// alignment guarantee.
    pub fn deserialize(data: &[u8]) -> Result<Self, PacketError> {
        let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(data.len());
        aligned.extend_from_slice(data);
        rkyv::from_bytes::<Self, rancor::Error>(&aligned).map_err(PacketError::Deserialize)
    }

    pub fn access_archived(data: &[u8]) -> Result<&ArchivedClientPacket, PacketError> {
        rkyv::access::<ArchivedClientPacket, rancor::Error>(data)
            .map_err(PacketError::Deserialize)
    }
}

/// What the transport should do with the backend packet it just handed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Forward the original packet untouched.
    Pass,
    /// Forward the packet as rewritten in place.
    Modified,
    /// Drop the packet; any corrective packets were already sent.
    Cancel,
}
