mod common;

use common::*;
use tabmask::{
    ClientPacket, ConnectionState, EngineConfig, HeaderFooterPacket, PlayerListAction,
    PlayerListPacket, TeamAction, Verdict,
};

fn passthrough() -> EngineConfig {
    EngineConfig {
        passthrough: true,
        ..EngineConfig::default()
    }
}

#[test]
fn test_passthrough_round_trip_keeps_assignment() {
    let mut engine = sized(0);
    engine.on_player_list(&add(&[1, 2, 3, 4, 5])).unwrap();
    engine.on_player_list(&add(&[6])).unwrap();
    engine.on_player_list(&remove(&[2])).unwrap();
    let before = occupants(&engine);

    engine.set_passthrough(true).unwrap();
    assert!(engine.is_passthrough());
    engine.set_passthrough(false).unwrap();

    assert_eq!(occupants(&engine), before);
    engine.check_invariants().unwrap();
}

#[test]
fn test_leaving_virtualization_restores_backend_view() {
    let mut engine = sized(0);
    engine.on_header_footer(&HeaderFooterPacket::new("backend", "footer"));
    engine
        .on_player_list(&PlayerListPacket::add(vec![
            item(1),
            item(2).with_display_name("Two"),
        ]))
        .unwrap();
    engine
        .on_team(&mut create_team("red", &[&name(1)]))
        .unwrap();
    engine.set_header_footer(Some(HeaderFooterPacket::new("custom", "")));
    drain(&mut engine);

    engine.set_passthrough(true).unwrap();
    let packets = drain(&mut engine);

    assert_eq!(
        actions(&packets),
        vec![
            PlayerListAction::RemovePlayer,
            PlayerListAction::AddPlayer,
            PlayerListAction::UpdateLatency,
            PlayerListAction::UpdateGameMode,
            PlayerListAction::UpdateDisplayName,
        ]
    );
    let lists = player_list(&packets);
    assert_eq!(lists[0].items.len(), 20);
    assert_eq!(lists[1].items.len(), 2);
    assert_eq!(lists[4].items.len(), 1);
    assert_eq!(lists[4].items[0].display_name.as_deref(), Some("Two"));

    let team_packets = teams(&packets);
    let removed = team_packets
        .iter()
        .filter(|team| team.action == TeamAction::Remove)
        .count();
    assert_eq!(removed, 80);
    assert!(team_packets.iter().any(|team| team.name == "red"
        && team.action == TeamAction::AddMembers(vec![name(1)])));

    assert!(packets.contains(&ClientPacket::HeaderFooter(HeaderFooterPacket::new(
        "backend", "footer"
    ))));
    assert_eq!(engine.client_entries().len(), 2);
    assert_eq!(engine.on_player_list(&add(&[3])).unwrap(), Verdict::Pass);
}

#[test]
fn test_entering_virtualization_hides_backend_roster() {
    let mut engine = connected(passthrough());
    assert_eq!(engine.on_player_list(&add(&[1, 2])).unwrap(), Verdict::Pass);
    engine
        .on_team(&mut create_team("red", &[&name(1)]))
        .unwrap();
    assert!(drain(&mut engine).is_empty());
    assert_eq!(engine.size(), 20);

    engine.set_passthrough(false).unwrap();
    let packets = drain(&mut engine);

    assert_eq!(
        packets.first(),
        Some(&ClientPacket::PlayerList(remove(&[1, 2])))
    );
    assert_eq!(occupants(&engine)[19], id(1));
    assert_eq!(occupants(&engine)[18], id(2));
    assert!(teams(&packets).iter().any(|team| team.name == " ~slot19"
        && team.action == TeamAction::AddMembers(vec![name(1)])));
    assert!(!teams(&packets).iter().any(|team| team.name == "red"));
    engine.check_invariants().unwrap();
}

#[test]
fn test_entering_with_more_players_than_rows() {
    let mut engine = connected(passthrough());
    let crowd: Vec<u128> = (1..=90).collect();
    assert_eq!(engine.on_player_list(&add(&crowd)).unwrap(), Verdict::Pass);
    assert_eq!(engine.size(), 80);
    drain(&mut engine);

    engine.set_passthrough(false).unwrap();
    assert!(engine.is_saturated());
    let packets = drain(&mut engine);
    assert_eq!(actions(&packets), vec![PlayerListAction::AddPlayer]);
    assert_eq!(player_list(&packets)[0].items.len(), 80);
    assert!(engine.rows().iter().all(|row| row.holds_placeholder()));
    assert_eq!(engine.client_entries().len(), 80 + 90);
    engine.check_invariants().unwrap();

    assert_eq!(engine.on_player_list(&remove(&[5])).unwrap(), Verdict::Pass);
    let mut create = create_team("red", &[&name(1)]);
    assert_eq!(engine.on_team(&mut create).unwrap(), Verdict::Pass);
    assert_eq!(create.action.members(), Some(&[name(1)][..]));

    engine.set_passthrough(true).unwrap();
    let packets = drain(&mut engine);
    assert_eq!(actions(&packets), vec![PlayerListAction::RemovePlayer]);
    assert_eq!(engine.client_entries().len(), 89);
}

#[test]
fn test_custom_header_footer_overrides_backend() {
    let mut engine = sized(20);
    let backend = HeaderFooterPacket::new("welcome", "");
    let custom = HeaderFooterPacket::new("tabmask", "rows");

    assert_eq!(engine.on_header_footer(&backend), Verdict::Pass);
    engine.set_header_footer(Some(custom.clone()));
    assert_eq!(drain(&mut engine), vec![ClientPacket::HeaderFooter(custom)]);

    assert_eq!(
        engine.on_header_footer(&HeaderFooterPacket::new("updated", "")),
        Verdict::Cancel
    );

    engine.set_header_footer(None);
    assert_eq!(
        drain(&mut engine),
        vec![ClientPacket::HeaderFooter(HeaderFooterPacket::new(
            "updated", ""
        ))]
    );
}

#[test]
fn test_server_switch_clears_backend_state() {
    let mut engine = sized(0);
    engine.on_player_list(&add(&[1, 2, 3])).unwrap();
    engine
        .on_team(&mut create_team("red", &[&name(1)]))
        .unwrap();
    drain(&mut engine);

    engine.on_server_switch().unwrap();
    assert!(engine.roster().is_empty());
    assert!(engine.teams().is_empty());
    for (index, occupant) in occupants(&engine).iter().enumerate() {
        assert_eq!(*occupant, placeholder_id(index));
    }

    let packets = drain(&mut engine);
    assert!(teams(&packets)
        .iter()
        .any(|team| team.name == "red" && team.action == TeamAction::Remove));
    engine.check_invariants().unwrap();
}

#[test]
fn test_pending_connection_resyncs_on_connect() {
    let mut engine = engine(EngineConfig::default());
    assert_eq!(engine.state(), ConnectionState::Pending);
    assert_eq!(engine.on_player_list(&add(&[1])).unwrap(), Verdict::Pass);
    assert!(engine.sink().is_empty());

    engine.on_connected().unwrap();
    assert_eq!(engine.state(), ConnectionState::Connected);
    assert_eq!(occupants(&engine)[19], id(1));
    assert_eq!(
        engine.sink().first(),
        Some(&ClientPacket::PlayerList(remove(&[1])))
    );
}

#[test]
fn test_closed_connection_drops_everything() {
    let mut engine = sized(0);
    engine.on_player_list(&add(&[1])).unwrap();
    engine.on_disconnected();
    drain(&mut engine);

    assert_eq!(engine.state(), ConnectionState::Closed);
    assert_eq!(engine.on_player_list(&add(&[2])).unwrap(), Verdict::Cancel);
    assert_eq!(
        engine.on_header_footer(&HeaderFooterPacket::default()),
        Verdict::Cancel
    );
    assert!(drain(&mut engine).is_empty());
}
