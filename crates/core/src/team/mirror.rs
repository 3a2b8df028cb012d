use std::collections::HashMap;

use crate::net::{TeamAction, TeamInfo, TeamPacket};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub name: String,
    pub info: TeamInfo,
    /// Insertion-ordered, without duplicates.
    pub members: Vec<String>,
}

impl Team {
    pub fn new(name: impl Into<String>, info: TeamInfo) -> Self {
        Self {
            name: name.into(),
            info,
            members: Vec::new(),
        }
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|member| member == name)
    }
}

/// Backend teams as the server defined them, plus the member→team index.
/// A name belongs to at most one team; joining another leaves the first.
#[derive(Debug, Default)]
pub struct TeamMirror {
    teams: HashMap<String, Team>,
    member_team: HashMap<String, String>,
}

impl TeamMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a backend team packet. Returns `false` when the packet refers
    /// to a team the mirror does not know.
    pub fn apply(&mut self, packet: &TeamPacket) -> bool {
        let name = packet.name.as_str();
        match &packet.action {
            TeamAction::Create { info, members } => {
                match self.teams.get_mut(name) {
                    Some(team) => team.info = info.clone(),
                    None => {
                        self.teams
                            .insert(name.to_string(), Team::new(name, info.clone()));
                    }
                }
                self.overwrite(name, members);
                true
            }
            TeamAction::Remove => match self.teams.remove(name) {
                Some(team) => {
                    for member in &team.members {
                        if self.member_team.get(member).map(String::as_str) == Some(name) {
                            self.member_team.remove(member);
                        }
                    }
                    true
                }
                None => false,
            },
            TeamAction::UpdateInfo(info) => match self.teams.get_mut(name) {
                Some(team) => {
                    team.info = info.clone();
                    true
                }
                None => false,
            },
            TeamAction::AddMembers(members) => {
                if !self.teams.contains_key(name) {
                    return false;
                }
                for member in members {
                    self.join(name, member);
                }
                true
            }
            TeamAction::RemoveMembers(members) => {
                if !self.teams.contains_key(name) {
                    return false;
                }
                for member in members {
                    self.leave(name, member);
                }
                true
            }
            TeamAction::OverwriteMembers(members) => {
                if !self.teams.contains_key(name) {
                    return false;
                }
                self.overwrite(name, members);
                true
            }
        }
    }

    fn overwrite(&mut self, team: &str, members: &[String]) {
        let current = self
            .teams
            .get(team)
            .map(|t| t.members.clone())
            .unwrap_or_default();
        for member in &current {
            self.leave(team, member);
        }
        for member in members {
            self.join(team, member);
        }
    }

    fn join(&mut self, team: &str, member: &str) {
        if let Some(previous) = self.member_team.insert(member.to_string(), team.to_string()) {
            if previous != team {
                if let Some(old) = self.teams.get_mut(&previous) {
                    old.members.retain(|name| name != member);
                }
            }
        }
        if let Some(target) = self.teams.get_mut(team) {
            if !target.has_member(member) {
                target.members.push(member.to_string());
            }
        }
    }

    fn leave(&mut self, team: &str, member: &str) {
        if self.member_team.get(member).map(String::as_str) == Some(team) {
            self.member_team.remove(member);
        }
        if let Some(target) = self.teams.get_mut(team) {
            target.members.retain(|name| name != member);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Team> {
        self.teams.get(name)
    }

    pub fn team_of(&self, member: &str) -> Option<&Team> {
        self.member_team
            .get(member)
            .and_then(|team| self.teams.get(team))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.teams.contains_key(name)
    }

    /// Teams sorted by name.
    pub fn teams(&self) -> Vec<&Team> {
        let mut teams: Vec<&Team> = self.teams.values().collect();
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Forgets every team, returning their names sorted.
    pub fn reset(&mut self) -> Vec<String> {
        self.member_team.clear();
        let mut names: Vec<String> = self.teams.drain().map(|(name, _)| name).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str, members: &[&str]) -> TeamPacket {
        TeamPacket::new(
            name,
            TeamAction::Create {
                info: TeamInfo::default(),
                members: members.iter().map(|m| m.to_string()).collect(),
            },
        )
    }

    fn names(members: &[&str]) -> Vec<String> {
        members.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn test_membership_moves_between_teams() {
        let mut teams = TeamMirror::new();
        assert!(teams.apply(&create("red", &["alice", "bob"])));
        assert!(teams.apply(&create("blue", &[])));
        assert!(teams.apply(&TeamPacket::new(
            "blue",
            TeamAction::AddMembers(names(&["alice"]))
        )));

        assert_eq!(teams.team_of("alice").map(|t| t.name.as_str()), Some("blue"));
        assert_eq!(teams.get("red").unwrap().members, names(&["bob"]));
    }

    #[test]
    fn test_remove_and_overwrite() {
        let mut teams = TeamMirror::new();
        teams.apply(&create("red", &["alice", "bob"]));
        teams.apply(&TeamPacket::new(
            "red",
            TeamAction::OverwriteMembers(names(&["carol", "alice"])),
        ));
        assert!(teams.team_of("bob").is_none());
        assert_eq!(teams.get("red").unwrap().members, names(&["carol", "alice"]));

        teams.apply(&TeamPacket::new("red", TeamAction::RemoveMembers(names(&["carol"]))));
        assert!(teams.team_of("carol").is_none());

        assert!(teams.apply(&TeamPacket::new("red", TeamAction::Remove)));
        assert!(teams.team_of("alice").is_none());
        assert!(teams.is_empty());
    }

    #[test]
    fn test_unknown_team_is_reported() {
        let mut teams = TeamMirror::new();
        assert!(!teams.apply(&TeamPacket::new("ghost", TeamAction::Remove)));
        assert!(!teams.apply(&TeamPacket::new(
            "ghost",
            TeamAction::AddMembers(names(&["x"]))
        )));
        assert!(teams.team_of("x").is_none());
    }

    #[test]
    fn test_update_info_and_reset() {
        let mut teams = TeamMirror::new();
        teams.apply(&create("red", &["alice"]));
        let info = TeamInfo {
            prefix: "[R] ".into(),
            ..TeamInfo::default()
        };
        teams.apply(&TeamPacket::new("red", TeamAction::UpdateInfo(info.clone())));
        assert_eq!(teams.team_of("alice").unwrap().info, info);

        assert_eq!(teams.reset(), vec!["red".to_string()]);
        assert!(teams.team_of("alice").is_none());
    }
}
