//! 对局核心逻辑（生命账本、变动日志、胜负判定、会话状态机）。

pub mod history;
pub mod ledger;
pub mod rules;
pub mod session;
pub mod state;

pub use history::{HistoryLog, LogEntry, WindowEntry, DEFAULT_HISTORY_WINDOW};
pub use ledger::{EntryToken, GaugeBand, LifeChange, LifeGauge};
pub use rules::{duel_winner, find_winner, net_score, result_chars};
pub use session::{
    LockReason, MatchArchive, MatchPhase, MatchSession, PlayerView, SessionError,
    SessionResolution, SessionView,
};
pub use state::{
    format_timestamp, parse_timestamp, Deck, DeckAssignment, DeckBook, DeckId, DuelSnapshot,
    EntryKind, EntryMode, Life, MatchFormat, MatchRecord, Player, PlayerNumber, Restore,
    ResultChar, SessionEvent, SideSnapshot, Winner, SUMMARY_DECK_ID,
};
