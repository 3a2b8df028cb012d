mod allocation;
mod config;
mod mode;
mod rows;

use std::sync::Arc;

pub use config::EngineConfig;

use crate::error::EngineError;
use crate::net::{
    ClientPacket, HeaderFooterPacket, Identity, PacketSink, PlayerListAction, PlayerListItem,
    PlayerListPacket, SkinSource, TeamAction, TeamPacket, Verdict, ViewerIdentity,
};
use crate::placeholder::{self, MAX_ROWS};
use crate::roster::{RosterMirror, RosterView};
use crate::slots::{Row, SlotTable};
use crate::team::{self, TeamMirror};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Backend traffic is mirrored but nothing is rewritten yet.
    Pending,
    Connected,
    Closed,
}

/// Per-connection roster virtualization state machine.
///
/// Backend packets go in through the `on_*` handlers in arrival order; each
/// returns what to do with the original packet, and corrective packets are
/// pushed into the sink as they are computed.
pub struct TabEngine<S: PacketSink> {
    config: EngineConfig,
    sink: S,
    viewer: Box<dyn ViewerIdentity + Send>,
    roster: RosterMirror,
    teams: TeamMirror,
    slots: SlotTable,
    passthrough: bool,
    state: ConnectionState,
    custom_header_footer: Option<HeaderFooterPacket>,
    backend_header_footer: Option<HeaderFooterPacket>,
}

impl<S: PacketSink> TabEngine<S> {
    pub fn new(
        config: EngineConfig,
        sink: S,
        viewer: impl ViewerIdentity + Send + 'static,
        skins: Arc<dyn SkinSource + Send + Sync>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let mut slots = SlotTable::new(skins.default_skin());
        slots.set_size(config.initial_size);

        Ok(Self {
            passthrough: config.passthrough,
            config,
            sink,
            viewer: Box::new(viewer),
            roster: RosterMirror::new(),
            teams: TeamMirror::new(),
            slots,
            state: ConnectionState::Pending,
            custom_header_footer: None,
            backend_header_footer: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    pub fn size(&self) -> usize {
        self.slots.size()
    }

    pub fn viewer_id(&self) -> Identity {
        self.viewer.viewer_id()
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        (index < MAX_ROWS).then(|| self.slots.row(index))
    }

    pub fn rows(&self) -> &[Row] {
        self.slots.rows()
    }

    pub fn roster(&self) -> RosterView {
        self.roster.view()
    }

    pub fn teams(&self) -> &TeamMirror {
        &self.teams
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// All 80 rows are in use. Every row then shows its placeholder and the
    /// backend roster reaches the client unchanged.
    pub fn is_saturated(&self) -> bool {
        self.virtualizing() && self.slots.size() == MAX_ROWS
    }

    /// The roster as the client currently sees it.
    pub fn client_entries(&self) -> Vec<PlayerListItem> {
        if self.virtualizing() {
            let mut items: Vec<PlayerListItem> = (0..self.slots.size())
                .map(|index| self.row_item(index))
                .collect();
            if self.is_saturated() {
                items.extend(self.roster.entries().iter().map(|entry| entry.to_item()));
            }
            items
        } else {
            self.roster
                .entries()
                .iter()
                .map(|entry| entry.to_item())
                .collect()
        }
    }

    fn virtualizing(&self) -> bool {
        self.state == ConnectionState::Connected && !self.passthrough
    }

    /// Backend roster and team packets are rewritten into rows.
    fn rewriting(&self) -> bool {
        self.virtualizing() && self.slots.size() < MAX_ROWS
    }

    fn send(&mut self, packet: impl Into<ClientPacket>) {
        self.sink.send(packet.into());
    }

    pub fn on_connected(&mut self) -> Result<(), EngineError> {
        if self.state != ConnectionState::Pending {
            log::warn!("connection hook fired twice for {}", self.viewer_id());
            return Ok(());
        }
        self.state = ConnectionState::Connected;
        log::info!("client {} connected", self.viewer_id());

        if !self.passthrough {
            self.enter_virtualized()?;
        }
        Ok(())
    }

    pub fn on_disconnected(&mut self) {
        log::info!("client {} disconnected", self.viewer_id());
        self.state = ConnectionState::Closed;
        self.roster.reset();
        self.teams.reset();
        self.custom_header_footer = None;
        self.backend_header_footer = None;
    }

    /// Treats a backend switch as the old backend removing everyone, then
    /// forgets everything it had announced.
    pub fn on_server_switch(&mut self) -> Result<(), EngineError> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        log::info!(
            "backend switch for {}: dropping {} players and {} teams",
            self.viewer_id(),
            self.roster.len(),
            self.teams.len()
        );

        let ids = self.roster.ids();
        if !ids.is_empty() {
            let packet = PlayerListPacket::remove(ids);
            if self.on_player_list(&packet)? == Verdict::Pass
                && self.state == ConnectionState::Connected
            {
                self.send(packet);
            }
        }

        let names: Vec<String> = self.teams.teams().iter().map(|t| t.name.clone()).collect();
        for name in names {
            let mut packet = TeamPacket::new(name, TeamAction::Remove);
            if self.on_team(&mut packet)? != Verdict::Cancel
                && self.state == ConnectionState::Connected
            {
                self.send(packet);
            }
        }

        self.roster.reset();
        self.teams.reset();
        self.backend_header_footer = None;
        Ok(())
    }

    pub fn on_player_list(&mut self, packet: &PlayerListPacket) -> Result<Verdict, EngineError> {
        if self.state == ConnectionState::Closed {
            log::warn!("player list packet after disconnect of {}", self.viewer_id());
            return Ok(Verdict::Cancel);
        }

        match packet.action {
            PlayerListAction::AddPlayer => {
                self.roster.add(&packet.items)?;
                if self.rewriting() {
                    self.handle_add(&packet.items)?;
                } else {
                    self.track_required_size();
                }
            }
            PlayerListAction::UpdateGameMode => {
                let viewer = self.viewer_id();
                let mut viewer_change = None;
                for item in &packet.items {
                    let previous = self.roster.update_game_mode(item.id, item.game_mode);
                    if let (true, Some(previous)) = (item.id == viewer, previous) {
                        viewer_change = Some((previous, item.game_mode));
                    }
                }
                if let Some((previous, current)) = viewer_change.filter(|_| self.rewriting()) {
                    self.handle_viewer_game_mode(previous, current)?;
                }
            }
            PlayerListAction::UpdateLatency => {
                for item in &packet.items {
                    self.roster.update_latency(item.id, item.latency);
                }
            }
            PlayerListAction::UpdateDisplayName => {
                for item in &packet.items {
                    self.roster
                        .update_display_name(item.id, item.display_name.clone());
                }
            }
            PlayerListAction::RemovePlayer => {
                let removed = self.roster.remove(packet.ids());
                if self.rewriting() {
                    self.handle_remove(&removed);
                }
            }
        }

        if self.rewriting() {
            Ok(Verdict::Cancel)
        } else {
            Ok(Verdict::Pass)
        }
    }

    pub fn on_team(&mut self, packet: &mut TeamPacket) -> Result<Verdict, EngineError> {
        if self.state == ConnectionState::Closed {
            log::warn!("team packet after disconnect of {}", self.viewer_id());
            return Ok(Verdict::Cancel);
        }
        if placeholder::pool().is_slot_team(&packet.name) {
            log::error!("backend announced reserved team {:?}", packet.name);
            return Err(EngineError::TeamCollision(packet.name.clone()));
        }

        if !self.teams.apply(packet) {
            log::debug!("team packet for unknown team {:?}", packet.name);
        }
        if !self.rewriting() {
            return Ok(Verdict::Pass);
        }

        let slots = &self.slots;
        let verdict = team::filter_members(packet, |name| slots.member_row(name).is_some());

        let refresh = matches!(
            packet.action,
            TeamAction::Create { .. } | TeamAction::UpdateInfo(_)
        );
        self.reconcile_teams(refresh.then_some(packet.name.as_str()));
        Ok(verdict)
    }

    pub fn on_header_footer(&mut self, packet: &HeaderFooterPacket) -> Verdict {
        if self.state == ConnectionState::Closed {
            log::warn!("header/footer packet after disconnect of {}", self.viewer_id());
            return Verdict::Cancel;
        }
        self.backend_header_footer = Some(packet.clone());
        if self.virtualizing() && self.custom_header_footer.is_some() {
            Verdict::Cancel
        } else {
            Verdict::Pass
        }
    }

    /// Checks the row invariants of a virtualizing engine.
    pub fn check_invariants(&self) -> Result<(), String> {
        if !self.virtualizing() {
            return Ok(());
        }
        self.slots.check_invariants()?;

        if self.is_saturated() {
            return match self.slots.rows().iter().find(|row| !row.holds_placeholder()) {
                Some(row) => Err(format!("row {} is real in a full tab list", row.index())),
                None => Ok(()),
            };
        }

        let size = self.slots.size();
        for entry in self.roster.entries() {
            match self.slots.row_of(entry.id) {
                Some(row) if row < size => {}
                _ => return Err(format!("{} ({}) holds no row", entry.id, entry.username)),
            }
        }
        for row in self.slots.rows() {
            let listed = !row.occupant().is_npc() && row.occupant_name().is_some();
            if listed != row.slot_member().is_some() {
                return Err(format!("slot team of row {} out of sync", row.index()));
            }
        }
        if let Some(viewer) = self.spectating_viewer() {
            if self.slots.row_of(viewer) != size.checked_sub(1) {
                return Err(String::from("spectating viewer is not in the last row"));
            }
        }
        Ok(())
    }
}
