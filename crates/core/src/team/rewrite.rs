use crate::net::{TeamAction, TeamInfo, TeamPacket, Verdict};
use crate::placeholder;

/// Drops every member name for which `hidden` holds.
///
/// A member add/remove left with nothing to say is cancelled; creates and
/// overwrites still go out, with the filtered list.
pub fn filter_members(packet: &mut TeamPacket, hidden: impl Fn(&str) -> bool) -> Verdict {
    let cancellable = matches!(
        packet.action,
        TeamAction::AddMembers(_) | TeamAction::RemoveMembers(_)
    );
    let Some(members) = packet.action.members_mut() else {
        return Verdict::Pass;
    };

    let before = members.len();
    members.retain(|name| !hidden(name));

    if members.len() == before {
        Verdict::Pass
    } else if members.is_empty() && cancellable {
        Verdict::Cancel
    } else {
        Verdict::Modified
    }
}

pub fn client_info(info: &TeamInfo, collision_rule_supported: bool) -> TeamInfo {
    if collision_rule_supported {
        info.clone()
    } else {
        info.clone().without_collision_rule()
    }
}

pub fn slot_team_create(index: usize, collision_rule_supported: bool) -> TeamPacket {
    let pool = placeholder::pool();
    TeamPacket::new(
        pool.team(index),
        TeamAction::Create {
            info: client_info(&TeamInfo::default(), collision_rule_supported),
            members: vec![pool.username(index).to_string()],
        },
    )
}

/// Slot team update copying a backend team's attributes, or restoring the
/// defaults when `info` is `None`.
pub fn slot_team_update(
    index: usize,
    info: Option<&TeamInfo>,
    collision_rule_supported: bool,
) -> TeamPacket {
    let default = TeamInfo::default();
    TeamPacket::new(
        placeholder::pool().team(index),
        TeamAction::UpdateInfo(client_info(
            info.unwrap_or(&default),
            collision_rule_supported,
        )),
    )
}

pub fn slot_team_remove(index: usize) -> TeamPacket {
    TeamPacket::new(placeholder::pool().team(index), TeamAction::Remove)
}

pub fn members_packet(team: &str, members: Vec<String>, add: bool) -> TeamPacket {
    let action = if add {
        TeamAction::AddMembers(members)
    } else {
        TeamAction::RemoveMembers(members)
    };
    TeamPacket::new(team, action)
}
