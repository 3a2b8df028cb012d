pub mod engine;
pub mod error;
pub mod net;
pub mod placeholder;
pub mod roster;
pub mod slots;
pub mod team;

pub use engine::{ConnectionState, EngineConfig, TabEngine};
pub use error::EngineError;
pub use net::{
    BlankSkins, ClientPacket, GAME_MODE_SPECTATOR, GAME_MODE_SURVIVAL, HeaderFooterPacket,
    Identity, PacketError, PacketSink, PlayerListAction, PlayerListItem, PlayerListPacket,
    Property, Skin, SkinSource, TeamAction, TeamInfo, TeamPacket, Verdict, ViewerIdentity,
};
pub use placeholder::{MAX_ROWS, required_size};
pub use roster::{RosterEntry, RosterView};
pub use slots::{Occupant, Row};
