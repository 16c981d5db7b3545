use serde::{Deserialize, Serialize};

use super::aggregate::{match_outcome, StatsSubject};
use crate::game::{
    format_timestamp, DeckBook, DeckId, MatchRecord, PlayerNumber, ResultChar, SideSnapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentDuel {
    pub own: SideSnapshot,
    pub opponent: SideSnapshot,
}

/// 最近对局表中的一行，以统计对象所在的一侧为“己方”。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentRow {
    pub number: usize,
    pub timestamp: String,
    pub own_side: PlayerNumber,
    pub own_deck: DeckId,
    pub own_name: Option<String>,
    pub opponent_deck: DeckId,
    pub opponent_name: Option<String>,
    pub outcome: Option<ResultChar>,
    pub duels: Vec<RecentDuel>,
}

/// 按统计对象筛选后编号（从 1 开始），最新在前，最多 `limit` 行。
pub fn recent_results(
    records: &[MatchRecord],
    decks: &DeckBook,
    subject: StatsSubject,
    limit: usize,
) -> Vec<RecentRow> {
    let subject_id = subject.deck_id();
    let rows: Vec<(usize, &MatchRecord)> = records
        .iter()
        .filter(|record| subject.includes(record))
        .enumerate()
        .map(|(i, record)| (i + 1, record))
        .collect();

    rows.into_iter()
        .rev()
        .take(limit)
        .map(|(number, record)| {
            let own = if record.decks.two == subject_id {
                PlayerNumber::Two
            } else {
                PlayerNumber::One
            };
            let opponent = own.opponent();
            let own_deck = record.decks.get(own);
            let opponent_deck = record.decks.get(opponent);
            RecentRow {
                number,
                timestamp: format_timestamp(&record.timestamp),
                own_side: own,
                own_deck,
                own_name: decks.name(own_deck).map(str::to_string),
                opponent_deck,
                opponent_name: decks.name(opponent_deck).map(str::to_string),
                outcome: match_outcome(record, own),
                duels: record
                    .duels
                    .iter()
                    .map(|duel| RecentDuel {
                        own: *duel.side(own),
                        opponent: *duel.side(opponent),
                    })
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{parse_timestamp, Deck, DeckAssignment, DuelSnapshot, MatchFormat};

    fn decks() -> DeckBook {
        DeckBook::new(vec![
            Deck::new(1, "旋風BF"),
            Deck::new(2, "代行天使"),
            Deck::new(3, "閃刀姫"),
        ])
    }

    fn record(one: DeckId, two: DeckId, minute: u32) -> MatchRecord {
        let timestamp =
            parse_timestamp(&format!("2022-11-03 20:{minute:02}")).expect("timestamp should parse");
        MatchRecord::new(DeckAssignment::new(one, two), MatchFormat::Single, timestamp).with_duels(
            vec![DuelSnapshot::new(
                SideSnapshot::new(3000, true),
                SideSnapshot::new(0, false),
            )],
        )
    }

    #[test]
    fn summary_lists_all_newest_first() {
        let records = vec![record(1, 2, 0), record(2, 3, 1), record(3, 1, 2)];
        let rows = recent_results(&records, &decks(), StatsSubject::Summary, 50);

        let numbers: Vec<usize> = rows.iter().map(|row| row.number).collect();
        assert_eq!(numbers, vec![3, 2, 1]);
        assert!(rows.iter().all(|row| row.own_side == PlayerNumber::One));
        assert_eq!(rows[0].timestamp, "2022-11-03 20:02");
        assert_eq!(rows[2].own_name.as_deref(), Some("旋風BF"));
    }

    #[test]
    fn deck_subject_is_numbered_after_filtering() {
        let records = vec![record(1, 2, 0), record(2, 3, 1), record(3, 1, 2)];
        let rows = recent_results(&records, &decks(), StatsSubject::Deck(1), 50);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number, 2);
        assert_eq!(rows[0].own_side, PlayerNumber::Two);
        assert_eq!(rows[0].own_deck, 1);
        assert_eq!(rows[0].opponent_name.as_deref(), Some("閃刀姫"));
        assert_eq!(rows[0].outcome, Some(ResultChar::Lose));
        assert_eq!(rows[0].duels[0].own.life, 0);
        assert_eq!(rows[1].outcome, Some(ResultChar::Win));
    }

    #[test]
    fn limit_keeps_newest_rows() {
        let records: Vec<MatchRecord> = (0..60).map(|minute| record(1, 2, minute)).collect();
        let rows = recent_results(&records, &decks(), StatsSubject::Summary, 50);
        assert_eq!(rows.len(), 50);
        assert_eq!(rows[0].number, 60);
        assert_eq!(rows[49].number, 11);
    }

    #[test]
    fn unknown_deck_has_no_name() {
        let records = vec![record(1, 42, 0)];
        let rows = recent_results(&records, &decks(), StatsSubject::Deck(1), 50);
        assert_eq!(rows[0].opponent_deck, 42);
        assert_eq!(rows[0].opponent_name, None);
    }
}
