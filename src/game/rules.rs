use super::state::{DuelSnapshot, MatchFormat, PlayerNumber, ResultChar, Winner};

/// 单局胜负：卡组耗尽优先于生命值判断。
pub fn duel_winner(duel: &DuelSnapshot) -> Winner {
    match (duel.one.decked_out, duel.two.decked_out) {
        (true, true) => Winner::Draw,
        (true, false) => Winner::Player(PlayerNumber::Two),
        (false, true) => Winner::Player(PlayerNumber::One),
        (false, false) if duel.one.life > 0 => Winner::Player(PlayerNumber::One),
        (false, false) if duel.two.life > 0 => Winner::Player(PlayerNumber::Two),
        (false, false) => Winner::Draw,
    }
}

fn signed(winner: Winner) -> i32 {
    match winner {
        Winner::Player(PlayerNumber::One) => 1,
        Winner::Player(PlayerNumber::Two) => -1,
        Winner::Draw => 0,
    }
}

/// 各局净胜分之和：1P 胜 +1，2P 胜 -1，平局 0。
pub fn net_score(duels: &[DuelSnapshot]) -> i32 {
    duels.iter().map(|duel| signed(duel_winner(duel))).sum()
}

/// 判定整场对局的胜者；`None` 表示还需要继续下一局。
pub fn find_winner(format: MatchFormat, duels: &[DuelSnapshot]) -> Option<Winner> {
    match format {
        MatchFormat::Single => duels.first().map(duel_winner),
        MatchFormat::Match => {
            if duels.len() < 2 {
                return None;
            }
            let score = net_score(duels);
            if duels.len() == 2 && score.abs() <= 1 {
                return None;
            }
            Some(match score {
                s if s > 0 => Winner::Player(PlayerNumber::One),
                s if s < 0 => Winner::Player(PlayerNumber::Two),
                _ => Winner::Draw,
            })
        }
    }
}

impl ResultChar {
    pub fn from_perspective(winner: Winner, side: PlayerNumber) -> Self {
        match winner {
            Winner::Draw => ResultChar::Draw,
            Winner::Player(player) if player == side => ResultChar::Win,
            Winner::Player(_) => ResultChar::Lose,
        }
    }
}

pub fn result_chars(duels: &[DuelSnapshot], side: PlayerNumber) -> Vec<ResultChar> {
    duels
        .iter()
        .map(|duel| ResultChar::from_perspective(duel_winner(duel), side))
        .collect()
}
