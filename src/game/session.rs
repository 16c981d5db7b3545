use chrono::NaiveDateTime;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::history::{HistoryLog, WindowEntry};
use super::ledger::{EntryToken, LifeChange, LifeGauge};
use super::rules::find_winner;
use super::state::{
    format_timestamp, Deck, DeckAssignment, DeckBook, DeckId, DuelSnapshot, EntryKind, EntryMode,
    Life, MatchFormat, MatchRecord, Player, PlayerNumber, Restore, ResultChar, SessionEvent,
    Winner,
};
use crate::config::SessionConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MatchPhase {
    NotStarted,
    InDuel,
    DuelFinishedUndetermined,
    DuelFinishedDetermined,
    Committed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LockReason {
    NoUser,
    FirstPlayerUnset,
    AwaitingConfirmation,
    MatchCommitted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum SessionError {
    #[error("life controls are locked ({reason:?})")]
    ControlsLocked { reason: LockReason },
    #[error("{operation} is not available while the session is {phase:?}")]
    InvalidPhase { operation: String, phase: MatchPhase },
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error("no player is flagged as decked out")]
    NoDeckOutFlagged,
    #[error("deck {deck_id} is not in the deck list")]
    UnknownDeck { deck_id: DeckId },
    #[error("format can only change before the first duel is recorded")]
    FormatLocked,
    #[error("invalid keypad token {token:?}")]
    InvalidEntryToken { token: String },
    #[error("invalid entry mode {mode:?}")]
    InvalidEntryMode { mode: String },
    #[error("deck list is empty")]
    NoDecks,
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },
}

/// 对局历史的写入方（外部持久化）。写入结果不回传给会话。
pub trait MatchArchive {
    fn append(&mut self, record: MatchRecord);
}

impl MatchArchive for Vec<MatchRecord> {
    fn append(&mut self, record: MatchRecord) {
        self.push(record);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerView {
    pub number: PlayerNumber,
    pub deck: Deck,
    pub life: Life,
    pub display: String,
    pub gauge: LifeGauge,
    pub entry: EntryMode,
    pub is_first: bool,
    pub decked_out: bool,
    pub results: Vec<ResultChar>,
}

/// 表现层所需的会话快照。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionView {
    pub phase: MatchPhase,
    pub format: MatchFormat,
    pub timestamp: String,
    pub players: Vec<PlayerView>,
    pub duels_recorded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_duel: Option<DuelSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_winner: Option<Winner>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub controls_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_reason: Option<LockReason>,
    pub can_declare_deck_out: bool,
    pub is_playing: bool,
    pub history: Vec<WindowEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionResolution {
    pub view: SessionView,
    pub events: Vec<SessionEvent>,
}

impl SessionResolution {
    pub fn new(view: SessionView, events: Vec<SessionEvent>) -> Self {
        Self { view, events }
    }
}

/// 一场对局的会话：持有双方生命账本、变动日志与进行中的记录。
#[derive(Debug, Clone)]
pub struct MatchSession {
    config: SessionConfig,
    decks: DeckBook,
    players: [Player; 2],
    history: HistoryLog,
    record: MatchRecord,
    phase: MatchPhase,
    pending_duel: Option<DuelSnapshot>,
    user_present: bool,
}

impl MatchSession {
    pub fn new(
        decks: DeckBook,
        config: SessionConfig,
        timestamp: NaiveDateTime,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let deck = decks.first().cloned().ok_or(SessionError::NoDecks)?;
        let players = [
            Player::new(PlayerNumber::One, deck.clone(), config.starting_life),
            Player::new(PlayerNumber::Two, deck.clone(), config.starting_life),
        ];
        let record = MatchRecord::new(
            DeckAssignment::new(deck.id, deck.id),
            MatchFormat::default(),
            timestamp,
        );
        Ok(Self {
            config,
            decks,
            players,
            history: HistoryLog::new(),
            record,
            phase: MatchPhase::NotStarted,
            pending_duel: None,
            user_present: false,
        })
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn player(&self, player: PlayerNumber) -> &Player {
        &self.players[player.index()]
    }

    fn player_mut(&mut self, player: PlayerNumber) -> &mut Player {
        &mut self.players[player.index()]
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn record(&self) -> &MatchRecord {
        &self.record
    }

    pub fn pending_duel(&self) -> Option<&DuelSnapshot> {
        self.pending_duel.as_ref()
    }

    pub fn user_present(&self) -> bool {
        self.user_present
    }

    pub fn set_user_present(&mut self, present: bool) {
        self.user_present = present;
    }

    fn is_editable(&self) -> bool {
        matches!(self.phase, MatchPhase::NotStarted | MatchPhase::InDuel)
    }

    pub fn lock_reason(&self) -> Option<LockReason> {
        match self.phase {
            MatchPhase::Committed => Some(LockReason::MatchCommitted),
            MatchPhase::DuelFinishedUndetermined | MatchPhase::DuelFinishedDetermined => {
                Some(LockReason::AwaitingConfirmation)
            }
            MatchPhase::NotStarted | MatchPhase::InDuel => {
                if !self.user_present {
                    Some(LockReason::NoUser)
                } else if !self.first_player_chosen() {
                    Some(LockReason::FirstPlayerUnset)
                } else {
                    None
                }
            }
        }
    }

    fn first_player_chosen(&self) -> bool {
        self.players[0].is_first != self.players[1].is_first
    }

    /// 卡组耗尽判定不是生命值操作，不要求登录。
    fn deck_out_lock(&self) -> Option<LockReason> {
        match self.lock_reason() {
            Some(LockReason::NoUser) if self.first_player_chosen() => None,
            Some(LockReason::NoUser) => Some(LockReason::FirstPlayerUnset),
            other => other,
        }
    }

    pub fn controls_enabled(&self) -> bool {
        self.lock_reason().is_none()
    }

    pub fn can_undo(&self) -> bool {
        self.is_editable() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.is_editable() && self.history.can_redo()
    }

    pub fn can_declare_deck_out(&self) -> bool {
        self.deck_out_lock().is_none() && self.players.iter().any(|player| player.decked_out)
    }

    pub fn is_playing(&self) -> bool {
        !self.record.duels.is_empty() || !self.history.is_empty()
    }

    fn ensure_controls(&self, operation: &str) -> Result<(), SessionError> {
        match self.lock_reason() {
            None => Ok(()),
            Some(reason) => {
                warn!("{operation} rejected: controls locked ({reason:?})");
                Err(SessionError::ControlsLocked { reason })
            }
        }
    }

    fn ensure_phase(&self, operation: &str, allowed: &[MatchPhase]) -> Result<(), SessionError> {
        if allowed.contains(&self.phase) {
            return Ok(());
        }
        warn!("{operation} rejected in phase {:?}", self.phase);
        Err(SessionError::InvalidPhase {
            operation: operation.into(),
            phase: self.phase,
        })
    }

    fn ensure_editable(&self, operation: &str) -> Result<(), SessionError> {
        self.ensure_phase(operation, &[MatchPhase::NotStarted, MatchPhase::InDuel])
    }

    fn projected_duels(&self) -> Vec<DuelSnapshot> {
        let mut duels = self.record.duels.clone();
        duels.extend(self.pending_duel);
        duels
    }

    /// 已记录的各局加上待确认的一局后的胜者。
    pub fn projected_winner(&self) -> Option<Winner> {
        find_winner(self.record.format, &self.projected_duels())
    }

    pub fn set_deck(
        &mut self,
        player: PlayerNumber,
        deck_id: DeckId,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_phase(
            "set_deck",
            &[
                MatchPhase::NotStarted,
                MatchPhase::InDuel,
                MatchPhase::DuelFinishedUndetermined,
                MatchPhase::DuelFinishedDetermined,
            ],
        )?;
        let deck = self
            .decks
            .get(deck_id)
            .cloned()
            .ok_or(SessionError::UnknownDeck { deck_id })?;
        self.player_mut(player).deck = deck;
        self.record.decks.set(player, deck_id);
        debug!("{player} deck set to {deck_id}");
        Ok(vec![SessionEvent::DeckAssigned { player, deck_id }])
    }

    pub fn set_format(&mut self, format: MatchFormat) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_editable("set_format")?;
        if !self.record.duels.is_empty() {
            warn!("format change rejected after {} duels", self.record.duels.len());
            return Err(SessionError::FormatLocked);
        }
        self.record.format = format;
        Ok(vec![SessionEvent::FormatChanged { format }])
    }

    pub fn toggle_first(&mut self, player: PlayerNumber) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_editable("toggle_first")?;
        let is_first = self.player_mut(player).toggle_first();
        Ok(vec![SessionEvent::FirstToggled { player, is_first }])
    }

    pub fn toggle_deck_out(
        &mut self,
        player: PlayerNumber,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_editable("toggle_deck_out")?;
        let decked_out = self.player_mut(player).toggle_deck_out();
        Ok(vec![SessionEvent::DeckOutToggled { player, decked_out }])
    }

    pub fn add_life(
        &mut self,
        player: PlayerNumber,
        delta: Life,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_controls("add_life")?;
        let change = self.player_mut(player).add_life(delta);
        Ok(self.after_life_change(player, change))
    }

    pub fn halve_life(&mut self, player: PlayerNumber) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_controls("halve_life")?;
        let change = self.player_mut(player).halve_life();
        Ok(self.after_life_change(player, change))
    }

    pub fn set_entry_mode(
        &mut self,
        player: PlayerNumber,
        kind: EntryKind,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_controls("set_entry_mode")?;
        let target = self.player_mut(player);
        target.set_entry_mode(kind);
        Ok(vec![SessionEvent::EntryModeChanged {
            player,
            mode: target.entry,
        }])
    }

    pub fn push_digit(
        &mut self,
        player: PlayerNumber,
        token: &str,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        let parsed = token
            .parse::<EntryToken>()
            .map_err(|_| SessionError::InvalidEntryToken {
                token: token.to_string(),
            })?;
        self.ensure_controls("push_digit")?;
        let target = self.player_mut(player);
        target.push_digit(parsed);
        Ok(vec![SessionEvent::EntryModeChanged {
            player,
            mode: target.entry,
        }])
    }

    pub fn confirm_entry(
        &mut self,
        player: PlayerNumber,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_controls("confirm_entry")?;
        let target = self.player_mut(player);
        let change = target.confirm_entry();
        let mut events = vec![SessionEvent::EntryModeChanged {
            player,
            mode: target.entry,
        }];
        events.extend(self.after_life_change(player, change));
        Ok(events)
    }

    /// 取消输入不受操作锁限制，重复调用无副作用。
    pub fn cancel_entry(&mut self, player: PlayerNumber) -> Vec<SessionEvent> {
        let target = self.player_mut(player);
        if target.entry == EntryMode::Idle {
            return Vec::new();
        }
        target.cancel_entry();
        vec![SessionEvent::EntryModeChanged {
            player,
            mode: EntryMode::Idle,
        }]
    }

    fn after_life_change(&mut self, player: PlayerNumber, change: LifeChange) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !self.history.record(player, change.from, change.to) {
            return events;
        }
        if self.phase == MatchPhase::NotStarted {
            self.phase = MatchPhase::InDuel;
        }
        events.push(SessionEvent::LifeChanged {
            player,
            from: change.from,
            to: change.to,
        });
        if change.is_lethal() {
            events.push(self.finish_duel());
        }
        events
    }

    fn finish_duel(&mut self) -> SessionEvent {
        let pending = DuelSnapshot::new(self.players[0].snapshot(), self.players[1].snapshot());
        self.pending_duel = Some(pending);
        let match_winner = self.projected_winner();
        self.phase = if match_winner.is_some() {
            MatchPhase::DuelFinishedDetermined
        } else {
            MatchPhase::DuelFinishedUndetermined
        };
        info!(
            "duel {} finished: duel winner {:?}, match winner {:?}",
            self.record.duels.len() + 1,
            pending.winner(),
            match_winner
        );
        SessionEvent::DuelFinished {
            duel_winner: pending.winner(),
            match_winner,
        }
    }

    pub fn declare_deck_out(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        if let Some(reason) = self.deck_out_lock() {
            warn!("declare_deck_out rejected: controls locked ({reason:?})");
            return Err(SessionError::ControlsLocked { reason });
        }
        if !self.players.iter().any(|player| player.decked_out) {
            warn!("declare_deck_out rejected: no player flagged");
            return Err(SessionError::NoDeckOutFlagged);
        }
        Ok(vec![self.finish_duel()])
    }

    /// 确认进入下一局：写入待定的一局并重置双方状态。
    pub fn next_duel(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_phase("next_duel", &[MatchPhase::DuelFinishedUndetermined])?;
        if let Some(duel) = self.pending_duel.take() {
            self.record.duels.push(duel);
        }
        let starting_life = self.config.starting_life;
        for player in &mut self.players {
            player.reset_for_duel(starting_life);
        }
        self.history.reset();
        self.phase = MatchPhase::InDuel;
        let duel_number = self.record.duels.len() + 1;
        info!("starting duel {duel_number}");
        Ok(vec![SessionEvent::NextDuelStarted { duel_number }])
    }

    /// 拒绝确认：丢弃待定的一局，回到进行中以便修正生命值。
    pub fn resume_duel(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_phase(
            "resume_duel",
            &[
                MatchPhase::DuelFinishedUndetermined,
                MatchPhase::DuelFinishedDetermined,
            ],
        )?;
        self.pending_duel = None;
        self.phase = MatchPhase::InDuel;
        debug!("duel resumed");
        Ok(vec![SessionEvent::DuelResumed])
    }

    pub fn commit<A: MatchArchive + ?Sized>(
        &mut self,
        archive: &mut A,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_phase("commit", &[MatchPhase::DuelFinishedDetermined])?;
        let winner = self
            .projected_winner()
            .ok_or_else(|| SessionError::InvalidPhase {
                operation: "commit".into(),
                phase: self.phase,
            })?;
        if let Some(duel) = self.pending_duel.take() {
            self.record.duels.push(duel);
        }
        self.phase = MatchPhase::Committed;
        info!(
            "match committed after {} duels, winner {:?}",
            self.record.duels.len(),
            winner
        );
        archive.append(self.record.clone());
        Ok(vec![SessionEvent::MatchCommitted { winner }])
    }

    pub fn undo(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_editable("undo")?;
        let entry = self.history.undo().ok_or(SessionError::NothingToUndo)?;
        self.player_mut(entry.player).restore_life(entry.from);
        debug!("undo {} {} -> {}", entry.player, entry.to, entry.from);
        Ok(vec![SessionEvent::LifeRestored {
            player: entry.player,
            from: entry.to,
            to: entry.from,
            via: Restore::Undo,
        }])
    }

    pub fn redo(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_editable("redo")?;
        let entry = self.history.redo().ok_or(SessionError::NothingToRedo)?;
        self.player_mut(entry.player).restore_life(entry.to);
        debug!("redo {} {} -> {}", entry.player, entry.from, entry.to);
        Ok(vec![SessionEvent::LifeRestored {
            player: entry.player,
            from: entry.from,
            to: entry.to,
            via: Restore::Redo,
        }])
    }

    /// 任何阶段都可以重置；进行中的记录直接丢弃。
    pub fn reset(&mut self, timestamp: NaiveDateTime) -> Vec<SessionEvent> {
        let starting_life = self.config.starting_life;
        for player in &mut self.players {
            player.reset_for_duel(starting_life);
        }
        self.history.reset();
        self.record = MatchRecord::new(self.record.decks, MatchFormat::default(), timestamp);
        self.pending_duel = None;
        self.phase = MatchPhase::NotStarted;
        info!("session reset");
        vec![SessionEvent::SessionReset]
    }

    pub fn view(&self) -> SessionView {
        let starting_life = self.config.starting_life;
        let players = self
            .players
            .iter()
            .map(|player| PlayerView {
                number: player.number,
                deck: player.deck.clone(),
                life: player.life,
                display: player.display(),
                gauge: player.gauge(starting_life),
                entry: player.entry,
                is_first: player.is_first,
                decked_out: player.decked_out,
                results: self.record.result_chars(player.number),
            })
            .collect();

        SessionView {
            phase: self.phase,
            format: self.record.format,
            timestamp: format_timestamp(&self.record.timestamp),
            players,
            duels_recorded: self.record.duels.len(),
            pending_duel: self.pending_duel,
            match_winner: self.projected_winner(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            controls_enabled: self.controls_enabled(),
            lock_reason: self.lock_reason(),
            can_declare_deck_out: self.can_declare_deck_out(),
            is_playing: self.is_playing(),
            history: self.history.visible_window(self.config.history_window),
        }
    }
}
