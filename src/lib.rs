pub mod ai;
pub mod game;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{ai_action, AiLevel, Strategy};
pub use game::{
    BedDefense, Card, CardPool, Damage, DamageType, DefenseProfile, DestroyCategory, Effect,
    EffectKind, GameEvent, GameOutcome, GamePhase, GameSettings, GameState, Health, HumanAction,
    HumanCommand, KeyLocalizer, Localizer, Player, PlayerId, RuleEngine, RuleError,
    RuleResolution, ScriptedController, TableLocalizer, TurnController, Usage, VictoryReason,
    DEFAULT_CATALOG,
};

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// 把 `log` 记录转发到浏览器控制台。
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!(
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        ));
        match record.level() {
            Level::Error => web_sys::console::error_1(&line),
            Level::Warn => web_sys::console::warn_1(&line),
            Level::Info => web_sys::console::info_1(&line),
            Level::Debug | Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn set_log_level(debug: bool) {
    log::set_max_level(if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
}

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
    // 重复初始化时 set_logger 会失败，可以忽略
    let _ = log::set_logger(&LOGGER);
    set_log_level(false);
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(state: &GameState, events: Vec<GameEvent>) -> Result<String, JsValue> {
    let resolution = RuleResolution::new(state.clone(), events);
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

#[wasm_bindgen]
pub struct GameEngine {
    state: GameState,
    engine: RuleEngine,
    localizer: TableLocalizer,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(settings_json: Option<String>, seed: Option<u32>) -> Result<GameEngine, JsValue> {
        let settings = match settings_json {
            Some(json) => GameSettings::from_json(&json).map_err(to_js_error)?,
            None => GameSettings::default(),
        };
        set_log_level(settings.debug);
        let state = GameState::new(settings).map_err(to_js_error)?;
        let engine = match seed {
            Some(seed) => RuleEngine::with_seed(u64::from(seed)),
            None => RuleEngine::new(),
        };
        Ok(GameEngine {
            state,
            engine,
            localizer: TableLocalizer::default(),
        })
    }

    pub fn add_player(&mut self, name: &str, ai_level: u8) -> Result<u8, JsValue> {
        let level = AiLevel::try_from(ai_level).map_err(to_js_error)?;
        self.state.add_player(name, level).map_err(to_js_error)
    }

    pub fn setup(&mut self) -> Result<String, JsValue> {
        let events = self.engine.setup(&mut self.state).map_err(to_js_error)?;
        make_resolution_json(&self.state, events)
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        state.settings.validate().map_err(to_js_error)?;
        set_log_level(state.settings.debug);
        self.state = state;
        Ok(())
    }

    pub fn set_translations_json(&mut self, json: &str) -> Result<(), JsValue> {
        self.localizer = TableLocalizer::from_json(json).map_err(to_js_error)?;
        Ok(())
    }

    /// 下一位行动的玩家。
    pub fn current_player(&self) -> Option<u8> {
        self.state.next_player()
    }

    pub fn needs_human_input(&self) -> bool {
        !self.state.is_finished()
            && self
                .state
                .next_player()
                .and_then(|id| self.state.get_player(id))
                .is_some_and(Player::is_human)
    }

    pub fn human_actions(&self) -> Result<JsValue, JsValue> {
        let labels: Vec<&str> = self
            .state
            .next_player()
            .and_then(|id| self.state.get_player(id))
            .map(|player| {
                HumanAction::available(player)
                    .iter()
                    .map(HumanAction::label)
                    .collect()
            })
            .unwrap_or_default();
        to_value(&labels).map_err(JsValue::from)
    }

    /// 推进一个回合。人类玩家的回合需要一条 `HumanCommand` JSON；
    /// 指令被拒绝时返回错误且对局状态保持不变。
    pub fn step_json(&mut self, command_json: Option<String>) -> Result<String, JsValue> {
        let mut controller = match command_json {
            Some(json) => {
                let command: HumanCommand =
                    serde_json::from_str(&json).map_err(serde_to_js_error)?;
                ScriptedController::new([command])
            }
            None if self.needs_human_input() => {
                return Err(to_js_error(RuleError::InvalidArgument {
                    reason: "a command is required for a human turn".into(),
                }))
            }
            None => ScriptedController::default(),
        };

        let mut state = self.state.clone();
        let mut engine = self.engine.clone();
        let events = engine
            .play_next_turn(&mut state, &mut controller)
            .map_err(to_js_error)?;
        if let Some(error) = controller.take_rejection() {
            return Err(to_js_error(error));
        }

        self.state = state;
        self.engine = engine;
        make_resolution_json(&self.state, events)
    }

    pub fn ai_thinking_delay_ms(&mut self) -> u32 {
        if self.needs_human_input() {
            return 0;
        }
        self.engine
            .ai_thinking_delay(&self.state)
            .map(|delay| delay.as_millis() as u32)
            .unwrap_or(0)
    }

    /// AI 回合前的展示性停顿，resolve 为实际等待的毫秒数。
    pub fn pace_ai(&mut self) -> Promise {
        let delay = self.ai_thinking_delay_ms();
        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            Ok(JsValue::from(delay))
        })
    }

    pub fn describe_events(&self, events_json: &str) -> Result<JsValue, JsValue> {
        let events: Vec<GameEvent> =
            serde_json::from_str(events_json).map_err(serde_to_js_error)?;
        let lines: Vec<String> = events
            .iter()
            .map(|event| event.describe(&self.state, &self.localizer))
            .collect();
        to_value(&lines).map_err(JsValue::from)
    }

    pub fn event_log_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state.event_log).map_err(serde_to_js_error)
    }

    pub fn winner(&self) -> Option<u8> {
        self.state.winner()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }
}

#[derive(Serialize)]
struct CatalogEntry {
    name: &'static str,
    count: u32,
}

#[wasm_bindgen(js_name = "defaultCatalog")]
pub fn default_catalog() -> Result<JsValue, JsValue> {
    let entries: Vec<CatalogEntry> = DEFAULT_CATALOG
        .iter()
        .map(|(name, count)| CatalogEntry {
            name: *name,
            count: *count,
        })
        .collect();
    to_value(&entries).map_err(JsValue::from)
}

#[derive(Serialize)]
struct CardInfo {
    name: String,
    usage: Usage,
    defense: DefenseProfile,
    need_target: bool,
    self_use: bool,
    bed_card: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    attack_delay: Option<u32>,
}

#[wasm_bindgen(js_name = "cardInfo")]
pub fn card_info(name: &str, settings: JsValue) -> Result<JsValue, JsValue> {
    let settings: GameSettings = if settings.is_undefined() || settings.is_null() {
        GameSettings::default()
    } else {
        from_value(settings).map_err(JsValue::from)?
    };
    let card = Card::new(name, &settings).map_err(to_js_error)?;
    let info = CardInfo {
        name: card.name().to_string(),
        usage: card.usage(),
        defense: card.destroy_defense_type(),
        need_target: card.need_target(),
        self_use: card.is_self_use(),
        bed_card: card.is_bed_card(),
        attack_delay: card.attack_delay(),
    };
    to_value(&info).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateSettings")]
pub fn validate_settings(settings_json: &str) -> Result<(), JsValue> {
    GameSettings::from_json(settings_json)
        .map(|_| ())
        .map_err(to_js_error)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
