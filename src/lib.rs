pub mod config;
pub mod game;
pub mod stats;
pub mod utils;

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use log::{info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value, Serializer};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::js_sys::{Date, Function, Promise};

pub use config::{SessionConfig, StatsOptions};
pub use game::{
    Deck, DeckBook, DeckId, DuelSnapshot, EntryKind, EntryMode, HistoryLog, Life, LockReason,
    MatchArchive, MatchFormat, MatchPhase, MatchRecord, MatchSession, Player, PlayerNumber,
    ResultChar, SessionError, SessionEvent, SessionResolution, SessionView, SideSnapshot, Winner,
};
pub use stats::{StatsBucket, StatsReport, StatsSubject};
pub use utils::{flip_coin, roll_die, CoinFace};

use utils::{init_logging, set_panic_hook};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    init_logging();
}

fn to_js_error(error: SessionError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn to_js_json<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn make_resolution_json(resolution: SessionResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

fn player_number(number: u8) -> Result<PlayerNumber, JsValue> {
    PlayerNumber::try_from(number).map_err(|error| JsValue::from_str(&error))
}

/// 浏览器本地时间，精确到分钟。
fn browser_timestamp() -> Result<NaiveDateTime, JsValue> {
    let now = Date::new_0();
    NaiveDate::from_ymd_opt(now.get_full_year() as i32, now.get_month() + 1, now.get_date())
        .and_then(|date| date.and_hms_opt(now.get_hours(), now.get_minutes(), 0))
        .ok_or_else(|| JsValue::from_str("browser clock returned an invalid date"))
}

fn timestamp_or_now(raw: Option<String>) -> Result<NaiveDateTime, JsValue> {
    match raw {
        Some(raw) => game::parse_timestamp(&raw).map_err(serde_to_js_error),
        None => browser_timestamp(),
    }
}

fn notify(callback: Option<Function>, value: &JsValue) {
    if let Some(callback) = callback {
        if let Err(error) = callback.call1(&JsValue::NULL, value) {
            warn!("persistence callback threw: {error:?}");
        }
    }
}

/// 把提交的记录交给前端的历史保存函数。保存结果只回调给前端。
struct JsArchive<'a> {
    save: &'a Function,
    on_success: Option<Function>,
    on_failure: Option<Function>,
}

impl MatchArchive for JsArchive<'_> {
    fn append(&mut self, record: MatchRecord) {
        let payload = match to_js_json(&record) {
            Ok(payload) => payload,
            Err(error) => {
                warn!("match record could not be converted for saving");
                notify(self.on_failure.take(), &error);
                return;
            }
        };
        let returned = match self.save.call1(&JsValue::NULL, &payload) {
            Ok(returned) => returned,
            Err(error) => {
                warn!("match history provider threw synchronously");
                notify(self.on_failure.take(), &error);
                return;
            }
        };

        let on_success = self.on_success.take();
        let on_failure = self.on_failure.take();
        spawn_local(async move {
            match JsFuture::from(Promise::resolve(&returned)).await {
                Ok(value) => {
                    info!("match record saved");
                    notify(on_success, &value);
                }
                Err(error) => {
                    warn!("match record save failed: {error:?}");
                    notify(on_failure, &error);
                }
            }
        });
    }
}

#[wasm_bindgen]
pub struct MatchEngine {
    session: MatchSession,
}

impl MatchEngine {
    fn execute<F>(&mut self, action: F) -> Result<String, JsValue>
    where
        F: FnOnce(&mut MatchSession) -> Result<Vec<SessionEvent>, SessionError>,
    {
        let events = action(&mut self.session).map_err(to_js_error)?;
        make_resolution_json(SessionResolution::new(self.session.view(), events))
    }
}

#[wasm_bindgen]
impl MatchEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(
        decks_json: &str,
        config_json: Option<String>,
        timestamp: Option<String>,
    ) -> Result<MatchEngine, JsValue> {
        let decks: DeckBook = serde_json::from_str(decks_json).map_err(serde_to_js_error)?;
        let config = match config_json {
            Some(json) => SessionConfig::from_json(&json).map_err(to_js_error)?,
            None => SessionConfig::default(),
        };
        let session =
            MatchSession::new(decks, config, timestamp_or_now(timestamp)?).map_err(to_js_error)?;
        Ok(MatchEngine { session })
    }

    pub fn view(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.view()).map_err(serde_to_js_error)
    }

    #[wasm_bindgen(js_name = "recordJson")]
    pub fn record_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.record()).map_err(serde_to_js_error)
    }

    #[wasm_bindgen(js_name = "setUserPresent")]
    pub fn set_user_present(&mut self, present: bool) -> Result<String, JsValue> {
        self.execute(|session| {
            session.set_user_present(present);
            Ok(Vec::new())
        })
    }

    #[wasm_bindgen(js_name = "setDeck")]
    pub fn set_deck(&mut self, player: u8, deck_id: DeckId) -> Result<String, JsValue> {
        let player = player_number(player)?;
        self.execute(|session| session.set_deck(player, deck_id))
    }

    #[wasm_bindgen(js_name = "setFormat")]
    pub fn set_format(&mut self, format: &str) -> Result<String, JsValue> {
        let format = MatchFormat::from_str(format)
            .map_err(|_| JsValue::from_str(&format!("unknown match format {format:?}")))?;
        self.execute(|session| session.set_format(format))
    }

    #[wasm_bindgen(js_name = "toggleFirst")]
    pub fn toggle_first(&mut self, player: u8) -> Result<String, JsValue> {
        let player = player_number(player)?;
        self.execute(|session| session.toggle_first(player))
    }

    #[wasm_bindgen(js_name = "toggleDeckOut")]
    pub fn toggle_deck_out(&mut self, player: u8) -> Result<String, JsValue> {
        let player = player_number(player)?;
        self.execute(|session| session.toggle_deck_out(player))
    }

    #[wasm_bindgen(js_name = "addLife")]
    pub fn add_life(&mut self, player: u8, delta: i32) -> Result<String, JsValue> {
        let player = player_number(player)?;
        self.execute(|session| session.add_life(player, Life::from(delta)))
    }

    #[wasm_bindgen(js_name = "halveLife")]
    pub fn halve_life(&mut self, player: u8) -> Result<String, JsValue> {
        let player = player_number(player)?;
        self.execute(|session| session.halve_life(player))
    }

    #[wasm_bindgen(js_name = "setEntryMode")]
    pub fn set_entry_mode(&mut self, player: u8, mode: &str) -> Result<String, JsValue> {
        let player = player_number(player)?;
        self.execute(|session| {
            let kind = EntryKind::from_str(mode).map_err(|_| SessionError::InvalidEntryMode {
                mode: mode.to_string(),
            })?;
            session.set_entry_mode(player, kind)
        })
    }

    #[wasm_bindgen(js_name = "pushDigit")]
    pub fn push_digit(&mut self, player: u8, token: &str) -> Result<String, JsValue> {
        let player = player_number(player)?;
        self.execute(|session| session.push_digit(player, token))
    }

    #[wasm_bindgen(js_name = "confirmEntry")]
    pub fn confirm_entry(&mut self, player: u8) -> Result<String, JsValue> {
        let player = player_number(player)?;
        self.execute(|session| session.confirm_entry(player))
    }

    #[wasm_bindgen(js_name = "cancelEntry")]
    pub fn cancel_entry(&mut self, player: u8) -> Result<String, JsValue> {
        let player = player_number(player)?;
        self.execute(|session| Ok(session.cancel_entry(player)))
    }

    #[wasm_bindgen(js_name = "declareDeckOut")]
    pub fn declare_deck_out(&mut self) -> Result<String, JsValue> {
        self.execute(MatchSession::declare_deck_out)
    }

    pub fn undo(&mut self) -> Result<String, JsValue> {
        self.execute(MatchSession::undo)
    }

    pub fn redo(&mut self) -> Result<String, JsValue> {
        self.execute(MatchSession::redo)
    }

    #[wasm_bindgen(js_name = "nextDuel")]
    pub fn next_duel(&mut self) -> Result<String, JsValue> {
        self.execute(MatchSession::next_duel)
    }

    #[wasm_bindgen(js_name = "resumeDuel")]
    pub fn resume_duel(&mut self) -> Result<String, JsValue> {
        self.execute(MatchSession::resume_duel)
    }

    /// `save(record)` 可以返回 Promise；其结果通过回调通知，会话不会回滚。
    pub fn commit(
        &mut self,
        save: &Function,
        on_success: Option<Function>,
        on_failure: Option<Function>,
    ) -> Result<String, JsValue> {
        let mut archive = JsArchive {
            save,
            on_success,
            on_failure,
        };
        self.execute(|session| session.commit(&mut archive))
    }

    pub fn reset(&mut self, timestamp: Option<String>) -> Result<String, JsValue> {
        let timestamp = timestamp_or_now(timestamp)?;
        self.execute(|session| Ok(session.reset(timestamp)))
    }
}

/// 整场胜者：0 平局，1/2 玩家，未定为 `null`。
#[wasm_bindgen(js_name = "findWinner")]
pub fn record_winner(record: JsValue) -> Result<JsValue, JsValue> {
    let record: MatchRecord = from_value(record).map_err(JsValue::from)?;
    to_js_json(&record.winner())
}

#[wasm_bindgen(js_name = "resultChars")]
pub fn record_result_chars(record: JsValue, side: u8) -> Result<JsValue, JsValue> {
    let record: MatchRecord = from_value(record).map_err(JsValue::from)?;
    let side = player_number(side)?;
    to_js_json(&record.result_chars(side))
}

#[wasm_bindgen(js_name = "statsReport")]
pub fn stats_report(
    results: JsValue,
    decks: JsValue,
    subject_id: DeckId,
    options: JsValue,
) -> Result<JsValue, JsValue> {
    let results: Vec<MatchRecord> = from_value(results).map_err(JsValue::from)?;
    let decks: DeckBook = from_value(decks).map_err(JsValue::from)?;
    let options: StatsOptions = if options.is_undefined() || options.is_null() {
        StatsOptions::default()
    } else {
        from_value(options).map_err(JsValue::from)?
    };
    let report = StatsReport::build(
        &results,
        &decks,
        StatsSubject::from_deck_id(subject_id),
        &options,
    );
    to_js_json(&report)
}

/// 统计侧栏的对象列表（汇总在前）。
#[wasm_bindgen(js_name = "statsSubjects")]
pub fn stats_subjects(decks: JsValue) -> Result<JsValue, JsValue> {
    let decks: DeckBook = from_value(decks).map_err(JsValue::from)?;
    to_js_json(&stats::subjects(&decks))
}

#[wasm_bindgen(js_name = "pageCount")]
pub fn page_count(len: u32, page_size: u32) -> u32 {
    stats::page_count(len as usize, page_size as usize) as u32
}

/// 返回 `[start, end)`。
#[wasm_bindgen(js_name = "pageBounds")]
pub fn page_bounds(len: u32, page_size: u32, index: u32) -> Vec<u32> {
    let range = stats::page_bounds(len as usize, page_size as usize, index as usize);
    vec![range.start as u32, range.end as u32]
}

#[wasm_bindgen(js_name = "flipCoin")]
pub fn flip_coin_js() -> Result<JsValue, JsValue> {
    let mut rng = SmallRng::from_entropy();
    to_value(&flip_coin(&mut rng)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "rollDice")]
pub fn roll_dice() -> u8 {
    let mut rng = SmallRng::from_entropy();
    roll_die(&mut rng)
}
