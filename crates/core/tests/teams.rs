mod common;

use common::*;
use tabmask::{
    ClientPacket, EngineConfig, EngineError, Identity, PlayerListItem, PlayerListPacket,
    TeamAction, TeamInfo, TeamPacket, Verdict,
};

fn members(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Member additions and removals, in the order they went out.
fn membership(packets: &[ClientPacket]) -> Vec<(String, TeamAction)> {
    teams(packets)
        .into_iter()
        .filter(|team| {
            matches!(
                team.action,
                TeamAction::AddMembers(_) | TeamAction::RemoveMembers(_)
            )
        })
        .map(|team| (team.name.clone(), team.action.clone()))
        .collect()
}

fn slot_updates<'a>(packets: &'a [ClientPacket], slot: &str) -> Vec<&'a TeamInfo> {
    teams(packets)
        .into_iter()
        .filter(|team| team.name == slot)
        .filter_map(|team| match &team.action {
            TeamAction::UpdateInfo(info) => Some(info),
            _ => None,
        })
        .collect()
}

#[test]
fn test_team_removal_resets_slot_team() {
    let mut engine = sized(0);
    engine.on_player_list(&add(&[1])).unwrap();
    drain(&mut engine);

    let mut create = create_team("red", &[&name(1)]);
    assert_eq!(engine.on_team(&mut create).unwrap(), Verdict::Modified);
    assert_eq!(create.action.members(), Some(&[][..]));
    assert_eq!(engine.row(19).unwrap().attached_team(), Some("red"));

    let packets = drain(&mut engine);
    assert_eq!(slot_updates(&packets, " ~slot19"), vec![&TeamInfo::default()]);

    let mut removal = TeamPacket::new("red", TeamAction::Remove);
    assert_eq!(engine.on_team(&mut removal).unwrap(), Verdict::Pass);
    assert_eq!(engine.row(19).unwrap().attached_team(), None);

    let packets = drain(&mut engine);
    assert_eq!(slot_updates(&packets, " ~slot19"), vec![&TeamInfo::default()]);
}

#[test]
fn test_attached_rows_follow_team_info() {
    let mut engine = sized(0);
    engine.on_player_list(&add(&[1])).unwrap();
    engine.on_team(&mut create_team("red", &[&name(1)])).unwrap();
    drain(&mut engine);

    let info = TeamInfo {
        prefix: "[R] ".into(),
        color: 12,
        ..TeamInfo::default()
    };
    let mut update = TeamPacket::new("red", TeamAction::UpdateInfo(info.clone()));
    assert_eq!(engine.on_team(&mut update).unwrap(), Verdict::Pass);

    let packets = drain(&mut engine);
    assert_eq!(slot_updates(&packets, " ~slot19"), vec![&info]);
}

#[test]
fn test_names_in_rows_join_their_slot_team() {
    let mut engine = sized(20);
    let mut create = create_team("red", &[&name(1), "bystander"]);
    assert_eq!(engine.on_team(&mut create).unwrap(), Verdict::Pass);
    drain(&mut engine);

    engine.on_player_list(&add(&[1])).unwrap();
    let packets = drain(&mut engine);
    assert_eq!(
        membership(&packets),
        vec![(" ~slot19".to_string(), TeamAction::AddMembers(members(&[&name(1)])))]
    );
    assert_eq!(engine.row(19).unwrap().attached_team(), Some("red"));
    assert_eq!(engine.row(19).unwrap().slot_member(), Some("player1"));

    let mut rejoin = TeamPacket::new("red", TeamAction::AddMembers(members(&[&name(1)])));
    assert_eq!(engine.on_team(&mut rejoin).unwrap(), Verdict::Cancel);

    let mut mixed = TeamPacket::new(
        "red",
        TeamAction::AddMembers(members(&[&name(1), "newcomer"])),
    );
    assert_eq!(engine.on_team(&mut mixed).unwrap(), Verdict::Modified);
    assert_eq!(mixed.action, TeamAction::AddMembers(members(&["newcomer"])));

    engine.on_player_list(&remove(&[1])).unwrap();
    let packets = drain(&mut engine);
    assert_eq!(
        membership(&packets),
        vec![(" ~slot19".to_string(), TeamAction::RemoveMembers(members(&[&name(1)])))]
    );
    assert_eq!(engine.row(19).unwrap().slot_member(), None);
}

#[test]
fn test_moving_player_switches_slot_team_without_rejoining_backend_team() {
    let mut engine = sized(20);
    engine.on_team(&mut create_team("red", &[&name(1)])).unwrap();
    engine.on_player_list(&add(&[1, 2])).unwrap();
    drain(&mut engine);

    engine
        .set_row(10, tabmask::Skin::of_player(id(1), Vec::new()), "", 0)
        .unwrap();
    assert_eq!(row_of(&engine, 1), Some(10));

    let packets = drain(&mut engine);
    assert_eq!(
        membership(&packets),
        vec![
            (" ~slot19".to_string(), TeamAction::RemoveMembers(members(&[&name(1)]))),
            (" ~slot10".to_string(), TeamAction::AddMembers(members(&[&name(1)]))),
        ]
    );
    assert_eq!(engine.row(10).unwrap().attached_team(), Some("red"));
    assert_eq!(engine.row(19).unwrap().attached_team(), None);
    engine.check_invariants().unwrap();
}

#[test]
fn test_npc_rows_stay_unattached() {
    let mut engine = sized(20);
    let npc = Identity::from_u128(0x0000_0000_0000_2000_8000_0000_0000_0001);
    assert!(npc.is_npc());

    engine
        .on_player_list(&PlayerListPacket::add(vec![PlayerListItem::player(npc, "guide")]))
        .unwrap();
    let mut create = create_team("npcs", &["guide"]);
    assert_eq!(engine.on_team(&mut create).unwrap(), Verdict::Pass);

    assert_eq!(engine.row(19).unwrap().occupant(), npc);
    assert_eq!(engine.row(19).unwrap().attached_team(), None);
    assert_eq!(engine.row(19).unwrap().slot_member(), None);
    engine.check_invariants().unwrap();
}

#[test]
fn test_slot_teams_follow_collision_capability() {
    let mut engine = engine(EngineConfig {
        collision_rule_supported: false,
        ..EngineConfig::default()
    });
    engine.on_connected().unwrap();

    let packets = drain(&mut engine);
    let creates: Vec<&TeamPacket> = teams(&packets)
        .into_iter()
        .filter(|team| matches!(team.action, TeamAction::Create { .. }))
        .collect();
    assert_eq!(creates.len(), 80);
    for create in creates {
        match &create.action {
            TeamAction::Create { info, members } => {
                assert!(info.collision_rule.is_none());
                assert_eq!(members.len(), 1);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }
}

#[test]
fn test_reserved_team_names_are_fatal() {
    let mut engine = sized(20);
    let mut packet = create_team(" ~slot05", &[]);
    let err = engine.on_team(&mut packet).unwrap_err();
    assert_eq!(err, EngineError::TeamCollision(" ~slot05".to_string()));
    assert!(err.is_fatal());
}

#[test]
fn test_team_packets_pass_through_untouched() {
    let mut engine = connected(EngineConfig {
        passthrough: true,
        ..EngineConfig::default()
    });
    engine.on_player_list(&add(&[1])).unwrap();

    let mut create = create_team("red", &[&name(1)]);
    assert_eq!(engine.on_team(&mut create).unwrap(), Verdict::Pass);
    assert_eq!(create.action.members(), Some(&[name(1)][..]));
    assert!(drain(&mut engine).is_empty());
}
