//! 浏览器环境下的 wasm 接口测试：`wasm-pack test --headless --chrome`

#![cfg(target_arch = "wasm32")]

use duel_log::{
    page_bounds, page_count, record_result_chars, record_winner, roll_dice, stats_report,
    stats_subjects, MatchEngine,
};
use serde_json::Value;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;
use web_sys::js_sys::{global, Function, Reflect, JSON};

wasm_bindgen_test_configure!(run_in_browser);

const DECKS: &str = r#"[{"id": 1, "name": "旋風BF"}, {"id": 2, "name": "代行天使"}]"#;

fn parse(json: &str) -> Value {
    serde_json::from_str(json).expect("engine returns valid JSON")
}

fn js(json: &str) -> JsValue {
    JSON::parse(json).expect("fixture is valid JSON")
}

/// 1P 卡组 1 对 2P 卡组 2；`lives` 为每局 (1P, 2P) 的剩余生命值，1P 每局先攻。
fn record_json(format: &str, lives: &[(i32, i32)]) -> String {
    let duels: Vec<String> = lives
        .iter()
        .map(|(one, two)| {
            format!(
                r#"{{"1": {{"lp": {one}, "isFirst": true}}, "2": {{"lp": {two}, "isFirst": false}}}}"#
            )
        })
        .collect();
    format!(
        r#"{{"decks": {{"1": 1, "2": 2}}, "duels": [{}], "format": "{format}", "datetime": "2022-11-03 19:30"}}"#,
        duels.join(",")
    )
}

fn ready_engine() -> MatchEngine {
    let mut engine = MatchEngine::new(DECKS, None, Some("2022-11-03 19:30".into()))
        .expect("engine should build");
    engine.set_user_present(true).expect("user present");
    engine.set_deck(2, 2).expect("deck 2 exists");
    engine.toggle_first(1).expect("first player");
    engine
}

#[wasm_bindgen_test]
fn locked_controls_reject_with_typed_error() {
    let mut engine = MatchEngine::new(DECKS, None, Some("2022-11-03 19:30".into())).unwrap();
    let error = engine.add_life(1, -1000).expect_err("no user yet");
    let error: Value = serde_wasm_bindgen::from_value(error).expect("error is an object");
    assert_eq!(error["type"], "ControlsLocked");
    assert_eq!(error["reason"], "NoUser");
}

#[wasm_bindgen_test]
fn life_change_returns_view_and_events() {
    let mut engine = ready_engine();
    let resolution = parse(&engine.add_life(2, -3000).unwrap());

    assert_eq!(resolution["events"][0]["type"], "LifeChanged");
    assert_eq!(resolution["view"]["players"][1]["life"], 5000);
    assert_eq!(resolution["view"]["phase"], "InDuel");
    assert_eq!(resolution["view"]["history"][0]["is_current"], true);
}

#[wasm_bindgen_test]
fn single_duel_commits_to_js_archive() {
    let mut engine = ready_engine();
    engine.set_format("single").unwrap();
    let finished = parse(&engine.add_life(2, -8000).unwrap());
    assert_eq!(finished["view"]["phase"], "DuelFinishedDetermined");

    let save = Function::new_with_args("record", "globalThis.__savedRecord = record;");
    let committed = parse(&engine.commit(&save, None, None).unwrap());
    assert_eq!(committed["events"][0]["type"], "MatchCommitted");
    assert_eq!(committed["events"][0]["winner"], 1);

    let saved = Reflect::get(&global(), &JsValue::from_str("__savedRecord")).unwrap();
    let saved: Value = serde_wasm_bindgen::from_value(saved).unwrap();
    assert_eq!(saved["decks"]["2"], 2);
    assert_eq!(saved["datetime"], "2022-11-03 19:30");
    assert_eq!(saved["duels"][0]["2"]["lp"], 0);
}

#[wasm_bindgen_test]
fn paging_and_dice_helpers() {
    assert_eq!(page_count(41, 20), 3);
    assert_eq!(page_bounds(41, 20, 2), vec![40, 41]);
    assert!((1..=6).contains(&roll_dice()));
}

#[wasm_bindgen_test]
fn undetermined_winner_is_null_not_undefined() {
    let split = record_winner(js(&record_json("Match", &[(1000, 0), (0, 2000)]))).unwrap();
    assert!(split.is_null());
    assert!(!split.is_undefined());
}

#[wasm_bindgen_test]
fn determined_winner_is_an_integer() {
    let cases = [
        ("Match", vec![(1000, 0), (3000, 0)], 1.0),
        ("Single", vec![(0, 0)], 0.0),
        ("Single", vec![(0, 2000)], 2.0),
    ];
    for (format, lives, expected) in cases {
        let winner = record_winner(js(&record_json(format, &lives))).unwrap();
        assert_eq!(winner.as_f64(), Some(expected), "{format} {lives:?}");
    }
}

#[wasm_bindgen_test]
fn result_chars_from_each_side() {
    let record = record_json("Match", &[(1000, 0), (0, 2000), (0, 0)]);
    let chars = |side| -> Value {
        serde_wasm_bindgen::from_value(record_result_chars(js(&record), side).unwrap()).unwrap()
    };
    let (one, two) = (chars(1), chars(2));
    assert_eq!(one, serde_json::json!(["W", "L", "D"]));
    assert_eq!(two, serde_json::json!(["L", "W", "D"]));
    assert!(record_result_chars(js(&record), 3).is_err());
}

#[wasm_bindgen_test]
fn summary_report_skips_undetermined_matches() {
    let results = format!(
        "[{}, {}]",
        record_json("Match", &[(1000, 0), (3000, 0)]),
        record_json("Match", &[(1000, 0), (0, 2000)])
    );
    let report = stats_report(js(&results), js(DECKS), 0, JsValue::UNDEFINED).unwrap();
    let report: Value = serde_wasm_bindgen::from_value(report).unwrap();

    assert_eq!(report["subject"], "Summary");
    assert_eq!(report["subject_deck"]["name"], "サマリー");
    let top = &report["win_loss_draw"][0];
    assert_eq!(top["deck_id"], 1);
    assert_eq!(top["label"], "旋風BF");
    assert_eq!((top["win"].as_u64(), top["lose"].as_u64()), (Some(1), Some(0)));
    assert_eq!(report["win_rates"][0]["win_rate"], 100.0);
    assert_eq!(report["win_rates"][1]["win_rate"], 0.0);
}

#[wasm_bindgen_test]
fn subjects_put_summary_first() {
    let subjects = stats_subjects(js(DECKS)).unwrap();
    let subjects: Value = serde_wasm_bindgen::from_value(subjects).unwrap();
    let names: Vec<&str> = subjects
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|deck| deck["name"].as_str())
        .collect();
    assert_eq!(names, ["サマリー", "旋風BF", "代行天使"]);
}
