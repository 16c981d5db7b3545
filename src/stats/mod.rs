//! 对局历史统计（胜负平、胜率、先后攻、最近对局）。

pub mod aggregate;
pub mod paging;
pub mod recent;

use log::debug;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::config::StatsOptions;
use crate::game::{Deck, DeckBook, DeckId, MatchRecord, SUMMARY_DECK_ID};

pub use aggregate::{
    first_second, match_outcome, tally_matches, win_loss_draw, win_rates, DeckTally,
    FirstSecondRow, StatsBucket, StatsSubject, WinRate,
};
pub use paging::{page, page_bounds, page_count};
pub use recent::{recent_results, RecentDuel, RecentRow};

/// 汇总页使用的虚拟卡组。
pub static SUMMARY_DECK: Lazy<Deck> = Lazy::new(|| Deck::new(SUMMARY_DECK_ID, "サマリー"));

/// 侧栏可选的统计对象：汇总在前，其后为全部卡组。
pub fn subjects(decks: &DeckBook) -> Vec<Deck> {
    std::iter::once(SUMMARY_DECK.clone())
        .chain(decks.iter().cloned())
        .collect()
}

pub fn subject_deck(decks: &DeckBook, subject: StatsSubject) -> Option<Deck> {
    match subject {
        StatsSubject::Summary => Some(SUMMARY_DECK.clone()),
        StatsSubject::Deck(deck_id) => decks.get(deck_id).cloned(),
    }
}

/// 附带卡组名的统计行；名单中没有的 id 标签为 `None`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Labeled<T> {
    pub label: Option<String>,
    #[serde(flatten)]
    pub item: T,
}

fn label_rows<T>(decks: &DeckBook, rows: Vec<T>, deck_id: impl Fn(&T) -> DeckId) -> Vec<Labeled<T>> {
    rows.into_iter()
        .map(|item| Labeled {
            label: decks.name(deck_id(&item)).map(str::to_string),
            item,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub subject: StatsSubject,
    pub subject_deck: Option<Deck>,
    pub win_loss_draw: Vec<Labeled<DeckTally>>,
    pub win_rates: Vec<Labeled<WinRate>>,
    pub first_second: Vec<Labeled<FirstSecondRow>>,
    pub recent: Vec<RecentRow>,
}

impl StatsReport {
    pub fn build(
        records: &[MatchRecord],
        decks: &DeckBook,
        subject: StatsSubject,
        options: &StatsOptions,
    ) -> Self {
        debug!(
            "building stats for {:?} over {} records",
            subject,
            records.len()
        );
        Self {
            subject,
            subject_deck: subject_deck(decks, subject),
            win_loss_draw: label_rows(decks, win_loss_draw(records, subject), |row| row.deck_id),
            win_rates: label_rows(decks, win_rates(records, subject), |row| row.deck_id),
            first_second: label_rows(decks, first_second(records, subject), |row| row.deck_id),
            recent: recent_results(records, decks, subject, options.recent_limit),
        }
    }
}
