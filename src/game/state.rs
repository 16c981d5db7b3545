use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::rules;

/// 卡组标识。
pub type DeckId = u32;
/// 生命值（始终非负）。
pub type Life = i64;

/// 统计页面中“全部卡组”使用的哨兵 id。
pub const SUMMARY_DECK_ID: DeckId = 0;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
}

impl Deck {
    pub fn new(id: DeckId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// 外部提供的只读卡组列表，按 id 查找。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct DeckBook {
    decks: Vec<Deck>,
}

impl DeckBook {
    pub fn new(decks: Vec<Deck>) -> Self {
        Self { decks }
    }

    pub fn get(&self, id: DeckId) -> Option<&Deck> {
        self.decks.iter().find(|deck| deck.id == id)
    }

    pub fn name(&self, id: DeckId) -> Option<&str> {
        self.get(id).map(|deck| deck.name.as_str())
    }

    pub fn first(&self) -> Option<&Deck> {
        self.decks.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Deck> {
        self.decks.iter()
    }
}

/// 玩家席位，序列化为 1 / 2。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PlayerNumber {
    One,
    Two,
}

impl PlayerNumber {
    pub const BOTH: [PlayerNumber; 2] = [PlayerNumber::One, PlayerNumber::Two];

    pub fn opponent(self) -> Self {
        match self {
            PlayerNumber::One => PlayerNumber::Two,
            PlayerNumber::Two => PlayerNumber::One,
        }
    }

    pub fn index(self) -> usize {
        match self {
            PlayerNumber::One => 0,
            PlayerNumber::Two => 1,
        }
    }
}

impl From<PlayerNumber> for u8 {
    fn from(value: PlayerNumber) -> Self {
        match value {
            PlayerNumber::One => 1,
            PlayerNumber::Two => 2,
        }
    }
}

impl TryFrom<u8> for PlayerNumber {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PlayerNumber::One),
            2 => Ok(PlayerNumber::Two),
            other => Err(format!("player number must be 1 or 2, got {other}")),
        }
    }
}

impl fmt::Display for PlayerNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}P", u8::from(*self))
    }
}

/// 对局或单局的胜者；序列化为 0（平局）/ 1 / 2。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Winner {
    Draw,
    Player(PlayerNumber),
}

impl From<Winner> for u8 {
    fn from(value: Winner) -> Self {
        match value {
            Winner::Draw => 0,
            Winner::Player(player) => player.into(),
        }
    }
}

impl TryFrom<u8> for Winner {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Winner::Draw),
            other => PlayerNumber::try_from(other).map(Winner::Player),
        }
    }
}

/// 从某一方视角看到的单局结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultChar {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "L")]
    Lose,
    #[serde(rename = "D")]
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchFormat {
    Single,
    Match,
}

impl Default for MatchFormat {
    fn default() -> Self {
        MatchFormat::Match
    }
}

impl FromStr for MatchFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(MatchFormat::Single),
            "match" | "bo3" => Ok(MatchFormat::Match),
            _ => Err(()),
        }
    }
}

/// 数值输入状态；空闲时不存在缓冲区。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum EntryMode {
    Idle,
    Adding { buffer: Life },
    Subtracting { buffer: Life },
}

impl Default for EntryMode {
    fn default() -> Self {
        EntryMode::Idle
    }
}

impl EntryMode {
    pub fn buffer(&self) -> Option<Life> {
        match self {
            EntryMode::Idle => None,
            EntryMode::Adding { buffer } | EntryMode::Subtracting { buffer } => Some(*buffer),
        }
    }
}

/// `setEntryMode` 的目标模式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Idle,
    Adding,
    Subtracting,
}

impl FromStr for EntryKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "idle" | "normal" => Ok(EntryKind::Idle),
            "adding" | "add" | "+" => Ok(EntryKind::Adding),
            "subtracting" | "subtract" | "-" => Ok(EntryKind::Subtracting),
            _ => Err(()),
        }
    }
}

/// 对局进行中的玩家状态，仅通过生命账本操作修改。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub number: PlayerNumber,
    pub deck: Deck,
    pub life: Life,
    #[serde(default)]
    pub is_first: bool,
    #[serde(default)]
    pub decked_out: bool,
    #[serde(default)]
    pub entry: EntryMode,
}

impl Player {
    pub fn new(number: PlayerNumber, deck: Deck, starting_life: Life) -> Self {
        Self {
            number,
            deck,
            life: starting_life,
            is_first: false,
            decked_out: false,
            entry: EntryMode::Idle,
        }
    }

    pub fn snapshot(&self) -> SideSnapshot {
        SideSnapshot {
            life: self.life,
            is_first: self.is_first,
            decked_out: self.decked_out,
        }
    }
}

/// 单局结束时一方的状态。字段名与已保存的历史文档保持一致。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SideSnapshot {
    #[serde(rename = "lp")]
    pub life: Life,
    #[serde(rename = "isFirst")]
    pub is_first: bool,
    #[serde(rename = "lo", default)]
    pub decked_out: bool,
}

impl SideSnapshot {
    pub fn new(life: Life, is_first: bool) -> Self {
        Self {
            life,
            is_first,
            decked_out: false,
        }
    }

    pub fn decked_out(mut self) -> Self {
        self.decked_out = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuelSnapshot {
    #[serde(rename = "1")]
    pub one: SideSnapshot,
    #[serde(rename = "2")]
    pub two: SideSnapshot,
}

impl DuelSnapshot {
    pub fn new(one: SideSnapshot, two: SideSnapshot) -> Self {
        Self { one, two }
    }

    pub fn side(&self, player: PlayerNumber) -> &SideSnapshot {
        match player {
            PlayerNumber::One => &self.one,
            PlayerNumber::Two => &self.two,
        }
    }

    /// 先攻方；若 1P 未标记先攻则视为 2P。
    pub fn first_player(&self) -> PlayerNumber {
        if self.one.is_first {
            PlayerNumber::One
        } else {
            PlayerNumber::Two
        }
    }

    pub fn winner(&self) -> Winner {
        rules::duel_winner(self)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeckAssignment {
    #[serde(rename = "1")]
    pub one: DeckId,
    #[serde(rename = "2")]
    pub two: DeckId,
}

impl DeckAssignment {
    pub fn new(one: DeckId, two: DeckId) -> Self {
        Self { one, two }
    }

    pub fn get(&self, player: PlayerNumber) -> DeckId {
        match player {
            PlayerNumber::One => self.one,
            PlayerNumber::Two => self.two,
        }
    }

    pub fn set(&mut self, player: PlayerNumber, deck_id: DeckId) {
        match player {
            PlayerNumber::One => self.one = deck_id,
            PlayerNumber::Two => self.two = deck_id,
        }
    }

    pub fn is_mirror(&self) -> bool {
        self.one == self.two
    }

    pub fn involves(&self, deck_id: DeckId) -> bool {
        self.one == deck_id || self.two == deck_id
    }
}

/// 一场对局的记录；提交后不可变。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchRecord {
    pub decks: DeckAssignment,
    #[serde(default)]
    pub duels: Vec<DuelSnapshot>,
    #[serde(default)]
    pub format: MatchFormat,
    #[serde(rename = "datetime", with = "timestamp")]
    pub timestamp: NaiveDateTime,
}

impl MatchRecord {
    pub fn new(decks: DeckAssignment, format: MatchFormat, timestamp: NaiveDateTime) -> Self {
        Self {
            decks,
            duels: Vec::new(),
            format,
            timestamp,
        }
    }

    pub fn with_duels(mut self, duels: Vec<DuelSnapshot>) -> Self {
        self.duels = duels;
        self
    }

    pub fn winner(&self) -> Option<Winner> {
        rules::find_winner(self.format, &self.duels)
    }

    pub fn result_chars(&self, player: PlayerNumber) -> Vec<ResultChar> {
        rules::result_chars(&self.duels, player)
    }
}

pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
}

pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Restore {
    Undo,
    Redo,
}

/// 会话事件流，返回给表现层。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SessionEvent {
    LifeChanged {
        player: PlayerNumber,
        from: Life,
        to: Life,
    },
    LifeRestored {
        player: PlayerNumber,
        from: Life,
        to: Life,
        via: Restore,
    },
    EntryModeChanged {
        player: PlayerNumber,
        mode: EntryMode,
    },
    FirstToggled {
        player: PlayerNumber,
        is_first: bool,
    },
    DeckOutToggled {
        player: PlayerNumber,
        decked_out: bool,
    },
    DeckAssigned {
        player: PlayerNumber,
        deck_id: DeckId,
    },
    FormatChanged {
        format: MatchFormat,
    },
    DuelFinished {
        duel_winner: Winner,
        #[serde(skip_serializing_if = "Option::is_none")]
        match_winner: Option<Winner>,
    },
    NextDuelStarted {
        duel_number: usize,
    },
    DuelResumed,
    MatchCommitted {
        winner: Winner,
    },
    SessionReset,
}
