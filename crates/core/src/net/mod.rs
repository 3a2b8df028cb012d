mod collaborators;
mod protocol;

pub use collaborators::{BlankSkins, PacketSink, Skin, SkinSource, ViewerIdentity};
pub use protocol::{
    ArchivedClientPacket, ClientPacket, HeaderFooterPacket, Identity, PacketError,
    PlayerListAction, PlayerListItem, PlayerListPacket, Property, TeamAction, TeamInfo,
    TeamPacket, Verdict, COLLISION_ALWAYS, GAME_MODE_SPECTATOR, GAME_MODE_SURVIVAL,
    NAME_TAG_ALWAYS,
};
