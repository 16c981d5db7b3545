use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::{DeckId, MatchRecord, PlayerNumber, ResultChar, Winner, SUMMARY_DECK_ID};

/// 统计对象：全部卡组的汇总，或某一个卡组。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsSubject {
    Summary,
    Deck(DeckId),
}

impl StatsSubject {
    pub fn from_deck_id(deck_id: DeckId) -> Self {
        if deck_id == SUMMARY_DECK_ID {
            StatsSubject::Summary
        } else {
            StatsSubject::Deck(deck_id)
        }
    }

    pub fn deck_id(self) -> DeckId {
        match self {
            StatsSubject::Summary => SUMMARY_DECK_ID,
            StatsSubject::Deck(deck_id) => deck_id,
        }
    }

    pub fn includes(self, record: &MatchRecord) -> bool {
        match self {
            StatsSubject::Summary => true,
            StatsSubject::Deck(deck_id) => record.decks.involves(deck_id),
        }
    }

    /// 记录中属于该卡组的席位；镜像对局返回两侧。
    fn sides(self, record: &MatchRecord) -> impl Iterator<Item = PlayerNumber> + '_ {
        PlayerNumber::BOTH
            .into_iter()
            .filter(move |&side| match self {
                StatsSubject::Summary => false,
                StatsSubject::Deck(deck_id) => record.decks.get(side) == deck_id,
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsBucket {
    pub win: u32,
    pub lose: u32,
    pub draw: u32,
}

impl StatsBucket {
    pub fn total(&self) -> u32 {
        self.win + self.lose + self.draw
    }

    /// 胜率（百分比）；没有对局时为 `None`。
    pub fn win_rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(100.0 * f64::from(self.win) / f64::from(total)),
        }
    }

    pub fn record(&mut self, outcome: ResultChar) {
        match outcome {
            ResultChar::Win => self.win += 1,
            ResultChar::Lose => self.lose += 1,
            ResultChar::Draw => self.draw += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckTally {
    pub deck_id: DeckId,
    #[serde(flatten)]
    pub bucket: StatsBucket,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinRate {
    pub deck_id: DeckId,
    pub win_rate: Option<f64>,
    pub games: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstSecondRow {
    pub deck_id: DeckId,
    pub first: StatsBucket,
    pub second: StatsBucket,
}

/// 按卡组累计整场对局的胜/负/平。
///
/// 汇总模式跳过镜像对局，双方卡组各计一次；单卡组模式以对手卡组为键，
/// 镜像对局按两侧各计一次。胜负未定的记录不计入。
pub fn tally_matches(records: &[MatchRecord], subject: StatsSubject) -> BTreeMap<DeckId, StatsBucket> {
    let mut acc: BTreeMap<DeckId, StatsBucket> = BTreeMap::new();
    for record in records.iter().filter(|record| subject.includes(record)) {
        let Some(winner) = record.winner() else {
            continue;
        };
        match subject {
            StatsSubject::Summary => {
                if record.decks.is_mirror() {
                    continue;
                }
                for side in PlayerNumber::BOTH {
                    acc.entry(record.decks.get(side))
                        .or_default()
                        .record(ResultChar::from_perspective(winner, side));
                }
            }
            StatsSubject::Deck(_) => {
                for side in subject.sides(record) {
                    acc.entry(record.decks.get(side.opponent()))
                        .or_default()
                        .record(ResultChar::from_perspective(winner, side));
                }
            }
        }
    }
    acc
}

/// 胜负平排行：总场数、胜、负、平依次降序，最后按卡组 id 升序。
pub fn win_loss_draw(records: &[MatchRecord], subject: StatsSubject) -> Vec<DeckTally> {
    let mut rows: Vec<DeckTally> = tally_matches(records, subject)
        .into_iter()
        .map(|(deck_id, bucket)| DeckTally { deck_id, bucket })
        .collect();
    rows.sort_by(|a, b| {
        b.bucket
            .total()
            .cmp(&a.bucket.total())
            .then(b.bucket.win.cmp(&a.bucket.win))
            .then(b.bucket.lose.cmp(&a.bucket.lose))
            .then(b.bucket.draw.cmp(&a.bucket.draw))
            .then(a.deck_id.cmp(&b.deck_id))
    });
    rows
}

fn compare_rates(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// 胜率排行：胜率降序，无数据的排在最后，同率按卡组 id 升序。
pub fn win_rates(records: &[MatchRecord], subject: StatsSubject) -> Vec<WinRate> {
    let mut rows: Vec<WinRate> = tally_matches(records, subject)
        .into_iter()
        .map(|(deck_id, bucket)| WinRate {
            deck_id,
            win_rate: bucket.win_rate(),
            games: bucket.total(),
        })
        .collect();
    rows.sort_by(|a, b| compare_rates(a.win_rate, b.win_rate).then(a.deck_id.cmp(&b.deck_id)));
    rows
}

/// 先攻/后攻拆分，按单局计数，行按卡组 id 升序。
pub fn first_second(records: &[MatchRecord], subject: StatsSubject) -> Vec<FirstSecondRow> {
    let mut acc: BTreeMap<DeckId, (StatsBucket, StatsBucket)> = BTreeMap::new();
    for record in records.iter().filter(|record| subject.includes(record)) {
        match subject {
            StatsSubject::Summary => {
                for side in PlayerNumber::BOTH {
                    acc.entry(record.decks.get(side)).or_default();
                }
                for duel in &record.duels {
                    let winner = duel.winner();
                    let first = duel.first_player();
                    let second = first.opponent();
                    acc.entry(record.decks.get(first))
                        .or_default()
                        .0
                        .record(ResultChar::from_perspective(winner, first));
                    acc.entry(record.decks.get(second))
                        .or_default()
                        .1
                        .record(ResultChar::from_perspective(winner, second));
                }
            }
            StatsSubject::Deck(_) => {
                for side in subject.sides(record) {
                    let buckets = acc.entry(record.decks.get(side.opponent())).or_default();
                    for duel in &record.duels {
                        let outcome = ResultChar::from_perspective(duel.winner(), side);
                        if duel.side(side).is_first {
                            buckets.0.record(outcome);
                        } else {
                            buckets.1.record(outcome);
                        }
                    }
                }
            }
        }
    }
    acc.into_iter()
        .map(|(deck_id, (first, second))| FirstSecondRow {
            deck_id,
            first,
            second,
        })
        .collect()
}

/// 某一方视角下整场对局的结果；胜负未定时为 `None`。
pub fn match_outcome(record: &MatchRecord, side: PlayerNumber) -> Option<ResultChar> {
    record
        .winner()
        .map(|winner: Winner| ResultChar::from_perspective(winner, side))
}
