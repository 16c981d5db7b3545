use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::state::{EntryKind, EntryMode, Life, Player};

/// 生命值变化 `(from, to)`；仅当两者不同时才需要记入历史。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeChange {
    pub from: Life,
    pub to: Life,
}

impl LifeChange {
    pub fn new(from: Life, to: Life) -> Self {
        Self { from, to }
    }

    fn unchanged(life: Life) -> Self {
        Self::new(life, life)
    }

    pub fn is_change(&self) -> bool {
        self.from != self.to
    }

    pub fn is_lethal(&self) -> bool {
        self.is_change() && self.to <= 0
    }
}

/// 数字键盘按键。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryToken {
    Digit(u8),
    DoubleZero,
}

impl EntryToken {
    fn append_to(self, buffer: Life) -> Option<Life> {
        match self {
            EntryToken::Digit(digit) => buffer.checked_mul(10)?.checked_add(Life::from(digit)),
            EntryToken::DoubleZero => buffer.checked_mul(100),
        }
    }
}

impl FromStr for EntryToken {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "00" => Ok(EntryToken::DoubleZero),
            _ => {
                let mut chars = s.chars();
                match (chars.next().and_then(|c| c.to_digit(10)), chars.next()) {
                    (Some(digit), None) => Ok(EntryToken::Digit(digit as u8)),
                    _ => Err(()),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GaugeBand {
    Healthy,
    Caution,
    Danger,
}

/// 生命条：相对初始生命的百分比与颜色档位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeGauge {
    pub level: u32,
    pub band: GaugeBand,
}

impl Player {
    pub fn add_life(&mut self, delta: Life) -> LifeChange {
        let from = self.life;
        let to = from.saturating_add(delta).max(0);
        self.life = to;
        debug!("{} life {from} -> {to} (delta {delta})", self.number);
        LifeChange::new(from, to)
    }

    /// 向上取整减半，因此 1 仍为 1。
    pub fn halve_life(&mut self) -> LifeChange {
        let from = self.life;
        let to = from / 2 + from % 2;
        self.life = to;
        debug!("{} life halved {from} -> {to}", self.number);
        LifeChange::new(from, to)
    }

    pub fn set_entry_mode(&mut self, kind: EntryKind) {
        self.entry = match kind {
            EntryKind::Idle => EntryMode::Idle,
            EntryKind::Adding => EntryMode::Adding { buffer: 0 },
            EntryKind::Subtracting => EntryMode::Subtracting { buffer: 0 },
        };
    }

    pub fn push_digit(&mut self, token: EntryToken) -> LifeChange {
        let number = self.number;
        match &mut self.entry {
            EntryMode::Idle => {
                debug!("{number} ignored keypad input while idle");
            }
            EntryMode::Adding { buffer } | EntryMode::Subtracting { buffer } => {
                match token.append_to(*buffer) {
                    Some(next) => *buffer = next,
                    None => warn!("{number} keypad buffer overflow, input {token:?} dropped"),
                }
            }
        }
        LifeChange::unchanged(self.life)
    }

    pub fn confirm_entry(&mut self) -> LifeChange {
        let delta = match self.entry {
            EntryMode::Idle => return LifeChange::unchanged(self.life),
            EntryMode::Adding { buffer } => buffer,
            EntryMode::Subtracting { buffer } => -buffer,
        };
        self.entry = EntryMode::Idle;
        self.add_life(delta)
    }

    pub fn cancel_entry(&mut self) {
        self.entry = EntryMode::Idle;
    }

    /// 撤销/重做时直接写回历史中的生命值。
    pub fn restore_life(&mut self, life: Life) {
        self.life = life.max(0);
    }

    pub fn toggle_first(&mut self) -> bool {
        self.is_first = !self.is_first;
        self.is_first
    }

    pub fn toggle_deck_out(&mut self) -> bool {
        self.decked_out = !self.decked_out;
        self.decked_out
    }

    /// 进入下一局：保留卡组，其余回到初始状态。
    pub fn reset_for_duel(&mut self, starting_life: Life) {
        self.life = starting_life;
        self.is_first = false;
        self.decked_out = false;
        self.entry = EntryMode::Idle;
    }

    pub fn display(&self) -> String {
        match self.entry {
            EntryMode::Adding { buffer } if buffer != 0 => format!("{}+{}", self.life, buffer),
            EntryMode::Subtracting { buffer } if buffer != 0 => {
                format!("{}-{}", self.life, buffer)
            }
            _ => self.life.to_string(),
        }
    }

    pub fn gauge(&self, starting_life: Life) -> LifeGauge {
        let starting_life = starting_life.max(1);
        let level = self.life.saturating_mul(100) / starting_life;
        let band = if self.life.saturating_mul(2) > starting_life {
            GaugeBand::Healthy
        } else if self.life.saturating_mul(4) > starting_life {
            GaugeBand::Caution
        } else {
            GaugeBand::Danger
        };
        LifeGauge {
            level: u32::try_from(level).unwrap_or(u32::MAX),
            band,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Deck, PlayerNumber};
    use proptest::prelude::*;

    fn player(life: Life) -> Player {
        Player::new(PlayerNumber::One, Deck::new(1, "旋風BF"), life)
    }

    fn type_digits(player: &mut Player, tokens: &[&str]) {
        for token in tokens {
            let parsed = token.parse::<EntryToken>().expect("token should parse");
            player.push_digit(parsed);
        }
    }

    #[test]
    fn add_life_floors_at_zero_without_ceiling() {
        let mut p = player(8000);
        assert_eq!(p.add_life(-9000), LifeChange::new(8000, 0));
        assert_eq!(p.life, 0);

        let mut p = player(8000);
        for _ in 0..3 {
            p.add_life(100_000);
        }
        assert_eq!(p.life, 308_000);
    }

    #[test]
    fn halving_rounds_up() {
        let mut p = player(8000);
        assert_eq!(p.halve_life(), LifeChange::new(8000, 4000));

        let mut p = player(1001);
        assert_eq!(p.halve_life().to, 501);

        let mut p = player(1);
        let change = p.halve_life();
        assert_eq!(change.to, 1);
        assert!(!change.is_change());

        let mut p = player(0);
        assert_eq!(p.halve_life().to, 0);
    }

    #[test]
    fn keypad_builds_and_applies_subtraction() {
        let mut p = player(8000);
        p.set_entry_mode(EntryKind::Subtracting);
        type_digits(&mut p, &["1", "5", "00"]);

        assert_eq!(p.entry, EntryMode::Subtracting { buffer: 1500 });
        assert_eq!(p.life, 8000, "typing digits must not touch life");
        assert_eq!(p.display(), "8000-1500");

        let change = p.confirm_entry();
        assert_eq!(change, LifeChange::new(8000, 6500));
        assert_eq!(p.entry, EntryMode::Idle);
        assert_eq!(p.display(), "6500");
    }

    #[test]
    fn keypad_addition_and_leading_double_zero() {
        let mut p = player(500);
        p.set_entry_mode(EntryKind::Adding);
        type_digits(&mut p, &["00"]);
        assert_eq!(p.entry, EntryMode::Adding { buffer: 0 });
        assert_eq!(p.display(), "500", "empty buffer is not rendered");

        type_digits(&mut p, &["3", "00"]);
        assert_eq!(p.display(), "500+300");
        assert_eq!(p.confirm_entry(), LifeChange::new(500, 800));
    }

    #[test]
    fn switching_mode_starts_fresh_buffer() {
        let mut p = player(8000);
        p.set_entry_mode(EntryKind::Adding);
        type_digits(&mut p, &["7"]);
        p.set_entry_mode(EntryKind::Subtracting);
        assert_eq!(p.entry, EntryMode::Subtracting { buffer: 0 });
        p.set_entry_mode(EntryKind::Idle);
        assert_eq!(p.entry.buffer(), None);
    }

    #[test]
    fn idle_keypad_is_inert() {
        let mut p = player(8000);
        type_digits(&mut p, &["9"]);
        assert_eq!(p.entry, EntryMode::Idle);
        assert!(!p.confirm_entry().is_change());
    }

    #[test]
    fn cancel_entry_is_idempotent() {
        let mut p = player(8000);
        p.set_entry_mode(EntryKind::Subtracting);
        type_digits(&mut p, &["4", "2"]);

        p.cancel_entry();
        let once = p.clone();
        p.cancel_entry();

        assert_eq!(p, once);
        assert_eq!(p.entry, EntryMode::Idle);
        assert_eq!(p.life, 8000);
    }

    #[test]
    fn overflowing_digit_is_dropped() {
        let mut p = player(8000);
        p.entry = EntryMode::Adding {
            buffer: Life::MAX / 10,
        };
        type_digits(&mut p, &["00"]);
        assert_eq!(p.entry, EntryMode::Adding { buffer: Life::MAX / 10 });
    }

    #[test]
    fn invalid_tokens_are_rejected() {
        assert!("".parse::<EntryToken>().is_err());
        assert!("12".parse::<EntryToken>().is_err());
        assert!("a".parse::<EntryToken>().is_err());
        assert_eq!("0".parse::<EntryToken>(), Ok(EntryToken::Digit(0)));
    }

    #[test]
    fn gauge_tracks_default_thresholds() {
        let gauge = |life| player(life).gauge(8000);
        assert_eq!(gauge(8000), LifeGauge { level: 100, band: GaugeBand::Healthy });
        assert_eq!(gauge(4001).band, GaugeBand::Healthy);
        assert_eq!(gauge(4000).band, GaugeBand::Caution);
        assert_eq!(gauge(2001).band, GaugeBand::Caution);
        assert_eq!(gauge(2000), LifeGauge { level: 25, band: GaugeBand::Danger });
        assert_eq!(gauge(79).level, 0);
    }

    #[test]
    fn reset_for_duel_keeps_deck() {
        let mut p = player(100);
        p.is_first = true;
        p.decked_out = true;
        p.set_entry_mode(EntryKind::Adding);
        p.reset_for_duel(8000);
        assert_eq!(p.life, 8000);
        assert!(!p.is_first && !p.decked_out);
        assert_eq!(p.entry, EntryMode::Idle);
        assert_eq!(p.deck.id, 1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(Life),
        Halve,
        Keyed(bool, Life),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-20_000i64..20_000).prop_map(Op::Add),
            Just(Op::Halve),
            (any::<bool>(), 0i64..10_000).prop_map(|(add, amount)| Op::Keyed(add, amount)),
        ]
    }

    proptest! {
        #[test]
        fn life_never_goes_negative(start in 0i64..50_000, ops in prop::collection::vec(op_strategy(), 0..40)) {
            let mut p = player(start);
            for op in ops {
                let change = match op {
                    Op::Add(delta) => p.add_life(delta),
                    Op::Halve => p.halve_life(),
                    Op::Keyed(add, amount) => {
                        p.set_entry_mode(if add { EntryKind::Adding } else { EntryKind::Subtracting });
                        for digit in amount.to_string().chars() {
                            p.push_digit(EntryToken::Digit(digit.to_digit(10).unwrap() as u8));
                        }
                        p.confirm_entry()
                    }
                };
                prop_assert!(change.to >= 0);
                prop_assert!(p.life >= 0);
                prop_assert_eq!(p.life, change.to);
            }
        }
    }
}
