use rand::Rng;
use serde::{Deserialize, Serialize};

#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
pub fn set_panic_hook() {}

/// 在浏览器控制台输出 `log` 日志；重复初始化会被忽略。
#[cfg(feature = "browser_log")]
pub fn init_logging() {
    if console_log::init_with_level(log::Level::Debug).is_err() {
        log::debug!("logger already initialised");
    }
}

#[cfg(not(feature = "browser_log"))]
pub fn init_logging() {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoinFace {
    Heads,
    Tails,
}

pub fn flip_coin<R: Rng + ?Sized>(rng: &mut R) -> CoinFace {
    if rng.gen_bool(0.5) {
        CoinFace::Heads
    } else {
        CoinFace::Tails
    }
}

/// 六面骰子，返回 1..=6。
pub fn roll_die<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.gen_range(1..=6)
}
