mod mirror;
mod rewrite;

pub use mirror::{Team, TeamMirror};
pub use rewrite::{
    client_info, filter_members, members_packet, slot_team_create, slot_team_remove,
    slot_team_update,
};
