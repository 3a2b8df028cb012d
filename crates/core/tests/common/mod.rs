#![allow(dead_code)]

use std::sync::Arc;

use tabmask::placeholder;
use tabmask::{
    BlankSkins, ClientPacket, EngineConfig, Identity, PlayerListAction, PlayerListItem,
    PlayerListPacket, TabEngine, TeamAction, TeamInfo, TeamPacket,
};

pub const VIEWER: u128 = 1000;

pub type Engine = TabEngine<Vec<ClientPacket>>;

pub fn id(n: u128) -> Identity {
    Identity::from_u128(n)
}

pub fn name(n: u128) -> String {
    format!("player{n}")
}

pub fn item(n: u128) -> PlayerListItem {
    PlayerListItem::player(id(n), name(n))
}

pub fn add(ns: &[u128]) -> PlayerListPacket {
    PlayerListPacket::add(ns.iter().map(|&n| item(n)).collect())
}

pub fn remove(ns: &[u128]) -> PlayerListPacket {
    PlayerListPacket::remove(ns.iter().map(|&n| id(n)))
}

pub fn engine(config: EngineConfig) -> Engine {
    let _ = env_logger::builder().is_test(true).try_init();
    TabEngine::new(config, Vec::new(), id(VIEWER), Arc::new(BlankSkins)).unwrap()
}

/// A connected engine with the connection resync already drained.
pub fn connected(config: EngineConfig) -> Engine {
    let mut engine = engine(config);
    engine.on_connected().unwrap();
    engine.sink_mut().clear();
    engine
}

pub fn sized(size: usize) -> Engine {
    connected(EngineConfig {
        initial_size: size,
        ..EngineConfig::default()
    })
}

pub fn drain(engine: &mut Engine) -> Vec<ClientPacket> {
    std::mem::take(engine.sink_mut())
}

pub fn occupants(engine: &Engine) -> Vec<Identity> {
    engine.rows().iter().map(|row| row.occupant()).collect()
}

pub fn row_of(engine: &Engine, n: u128) -> Option<usize> {
    engine.rows().iter().position(|row| row.occupant() == id(n))
}

pub fn placeholder_id(index: usize) -> Identity {
    placeholder::pool().identity(index)
}

pub fn create_team(team: &str, members: &[&str]) -> TeamPacket {
    TeamPacket::new(
        team,
        TeamAction::Create {
            info: TeamInfo::default(),
            members: members.iter().map(|m| m.to_string()).collect(),
        },
    )
}

pub fn player_list(packets: &[ClientPacket]) -> Vec<&PlayerListPacket> {
    packets
        .iter()
        .filter_map(|packet| match packet {
            ClientPacket::PlayerList(list) => Some(list),
            _ => None,
        })
        .collect()
}

pub fn teams(packets: &[ClientPacket]) -> Vec<&TeamPacket> {
    packets
        .iter()
        .filter_map(|packet| match packet {
            ClientPacket::Team(team) => Some(team),
            _ => None,
        })
        .collect()
}

pub fn actions(packets: &[ClientPacket]) -> Vec<PlayerListAction> {
    player_list(packets).iter().map(|p| p.action).collect()
}
