use std::sync::Arc;

use anyhow::{Context, Result};
use tabmask::{
    BlankSkins, ClientPacket, EngineConfig, HeaderFooterPacket, Identity, PlayerListItem,
    PlayerListPacket, TabEngine, TeamPacket, Verdict,
};

use crate::script::{Script, Step};

/// One client-visible row, flattened for printing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub index: usize,
    pub occupant: Identity,
    pub username: String,
    pub text: String,
    pub latency: i32,
    pub real: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub steps: usize,
    pub passed: usize,
    pub modified: usize,
    pub cancelled: usize,
    pub rejected: usize,
}

impl SessionStats {
    fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Pass => self.passed += 1,
            Verdict::Modified => self.modified += 1,
            Verdict::Cancel => self.cancelled += 1,
        }
    }
}

/// Feeds a script through one engine, collecting everything it sends.
pub struct Session {
    engine: TabEngine<Vec<ClientPacket>>,
    stats: SessionStats,
}

impl Session {
    pub fn new(viewer: Identity, config: EngineConfig) -> Result<Self> {
        let engine = TabEngine::new(config, Vec::new(), viewer, Arc::new(BlankSkins))?;
        Ok(Self {
            engine,
            stats: SessionStats::default(),
        })
    }

    pub fn run(&mut self, script: &Script) -> Result<()> {
        for (n, step) in script.steps.iter().enumerate() {
            self.step(step)
                .with_context(|| format!("step {} ({}) failed", n + 1, step.label()))?;
        }
        Ok(())
    }

    /// Applies a single step. Fatal engine errors abort the session; input
    /// errors are logged and the step is skipped.
    pub fn step(&mut self, step: &Step) -> Result<()> {
        self.stats.steps += 1;
        match self.apply(step) {
            Ok(()) => Ok(()),
            Err(err) if err.is_fatal() => Err(err.into()),
            Err(err) => {
                log::warn!("{} rejected: {err}", step.label());
                self.stats.rejected += 1;
                Ok(())
            }
        }
    }

    fn apply(&mut self, step: &Step) -> Result<(), tabmask::EngineError> {
        let engine = &mut self.engine;
        let verdict = match step {
            Step::Connect => {
                engine.on_connected()?;
                None
            }
            Step::Add { players } => {
                let items: Vec<PlayerListItem> = players.iter().map(|p| p.to_item()).collect();
                Some(engine.on_player_list(&PlayerListPacket::add(items))?)
            }
            Step::Remove { players } => {
                let packet = PlayerListPacket::remove(players.iter().map(|&id| Identity::from(id)));
                Some(engine.on_player_list(&packet)?)
            }
            Step::Latency { player, latency } => Some(engine.on_player_list(
                &PlayerListPacket::latency(Identity::from(*player), *latency),
            )?),
            Step::GameMode { player, game_mode } => Some(engine.on_player_list(
                &PlayerListPacket::game_mode(Identity::from(*player), *game_mode),
            )?),
            Step::DisplayName {
                player,
                display_name,
            } => Some(engine.on_player_list(&PlayerListPacket::display_name(
                Identity::from(*player),
                display_name.clone(),
            ))?),
            Step::Team { name, action } => {
                let mut packet = TeamPacket::new(name.as_str(), action.to_action());
                Some(engine.on_team(&mut packet)?)
            }
            Step::HeaderFooter { header, footer } => Some(
                engine.on_header_footer(&HeaderFooterPacket::new(header.as_str(), footer.as_str())),
            ),
            Step::SetRow {
                index,
                skin,
                text,
                latency,
            } => {
                engine.set_row(*index, skin.clone(), text, *latency)?;
                None
            }
            Step::SetText { index, text } => {
                engine.update_text(*index, text)?;
                None
            }
            Step::SetLatency { index, latency } => {
                engine.update_latency(*index, *latency)?;
                None
            }
            Step::SetSize { size } => {
                engine.set_size(*size)?;
                None
            }
            Step::Passthrough { enabled } => {
                engine.set_passthrough(*enabled)?;
                None
            }
            Step::CustomHeaderFooter { content } => {
                engine.set_header_footer(content.as_ref().map(|c| c.to_packet()));
                None
            }
            Step::ServerSwitch => {
                engine.on_server_switch()?;
                None
            }
            Step::Disconnect => {
                engine.on_disconnected();
                None
            }
        };

        if let Some(verdict) = verdict {
            log::info!("{}: {verdict:?}", step.label());
            self.stats.record(verdict);
        }
        Ok(())
    }

    pub fn engine(&self) -> &TabEngine<Vec<ClientPacket>> {
        &self.engine
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn packets(&self) -> &[ClientPacket] {
        self.engine.sink()
    }

    pub fn rows(&self) -> Vec<RowView> {
        self.engine
            .client_entries()
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let real = self
                    .engine
                    .row(index)
                    .is_some_and(|row| !row.holds_placeholder() && row.occupant() == item.id);
                RowView {
                    index,
                    occupant: item.id,
                    username: item.username.unwrap_or_default(),
                    text: item.display_name.unwrap_or_default(),
                    latency: item.latency,
                    real,
                }
            })
            .collect()
    }
}
