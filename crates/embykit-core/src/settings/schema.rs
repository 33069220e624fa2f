//! Per-field schema for the server-held application settings.
//!
//! Every known setting declares its kind once; merging server data coerces
//! against this table instead of inspecting whatever value happens to be in
//! memory.

use super::SettingValue;

/// Canonical engine order (ordered list of translator identifiers).
pub const ENGINES_FIELD: &str = "translator_engines_order";
/// Comma-joined rendering of [`ENGINES_FIELD`] for text inputs.
pub const ENGINES_TEXT_FIELD: &str = "translator_engines_order_str";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingKind {
    Text,
    Number,
    Bool,
    List,
}

#[derive(Clone, Copy, Debug)]
pub enum FieldDefault {
    Text(&'static str),
    Number(f64),
    Bool(bool),
    List(&'static [&'static str]),
}

impl FieldDefault {
    pub fn kind(self) -> SettingKind {
        match self {
            FieldDefault::Text(_) => SettingKind::Text,
            FieldDefault::Number(_) => SettingKind::Number,
            FieldDefault::Bool(_) => SettingKind::Bool,
            FieldDefault::List(_) => SettingKind::List,
        }
    }

    pub fn to_value(self) -> SettingValue {
        match self {
            FieldDefault::Text(s) => SettingValue::Text(s.to_string()),
            FieldDefault::Number(n) => SettingValue::Number(n),
            FieldDefault::Bool(b) => SettingValue::Bool(b),
            FieldDefault::List(items) => {
                SettingValue::List(items.iter().map(|s| s.to_string()).collect())
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub default: FieldDefault,
}

impl FieldSpec {
    pub fn kind(&self) -> SettingKind {
        self.default.kind()
    }
}

const fn field(name: &'static str, default: FieldDefault) -> FieldSpec {
    FieldSpec { name, default }
}

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

const DEFAULT_TRANSLATION_PROMPT: &str = "You are a professional film and TV translator. \
Translate the given actor or character name precisely.\n\
Rules:\n\
1. Return only the translated text, with no explanations, labels or punctuation.\n\
2. If the input is already Chinese, or is a proper noun that should not be translated, return it unchanged.\n\
3. Prefer the renderings commonly used by the Chinese film industry.";

use self::FieldDefault::{Bool, List, Number, Text};

/// All known settings, grouped as the backend groups them.
pub const FIELDS: &[FieldSpec] = &[
    // Emby
    field("emby_server_url", Text("")),
    field("emby_api_key", Text("")),
    field("emby_user_id", Text("")),
    field("emby_api_timeout", Number(60.0)),
    field("refresh_emby_after_update", Bool(true)),
    field("libraries_to_process", List(&[])),
    field("emby_admin_user", Text("")),
    field("emby_admin_pass", Text("")),
    // Reverse proxy
    field("proxy_enabled", Bool(false)),
    field("proxy_port", Number(8097.0)),
    field("proxy_merge_native_libraries", Bool(true)),
    field("proxy_native_view_selection", List(&[])),
    field("proxy_native_view_order", Text("before")),
    field("proxy_302_redirect_url", Text("")),
    // TMDB / GitHub
    field("tmdb_api_key", Text("")),
    field("tmdb_api_base_url", Text("https://api.themoviedb.org/3")),
    field("tmdb_image_base_url", Text("https://image.tmdb.org/t/p")),
    field("github_token", Text("")),
    // Douban
    field("api_douban_default_cooldown_seconds", Number(1.0)),
    field("douban_cookie", Text("")),
    // MoviePilot
    field("moviepilot_url", Text("")),
    field("moviepilot_username", Text("")),
    field("moviepilot_password", Text("")),
    field("autosub_enabled", Bool(false)),
    field("resubscribe_completed_on_missing", Bool(false)),
    field("resubscribe_daily_cap", Number(200.0)),
    field("resubscribe_delay_seconds", Number(1.5)),
    // Translation
    field(ENGINES_FIELD, List(&["bing", "google"])),
    // Data source
    field("data_source_mode", Text("local_then_online")),
    field("local_data_path", Text("")),
    // General
    field("delay_between_items_sec", Number(0.5)),
    field("min_score_for_review", Number(6.0)),
    field("process_episodes", Bool(true)),
    field("auto_lock_cast_after_update", Bool(true)),
    field("max_actors_to_process", Number(50.0)),
    // Network
    field("network_proxy_enabled", Bool(false)),
    field("network_http_proxy_url", Text("")),
    field("user_agent", Text(DEFAULT_USER_AGENT)),
    field("accept_language", Text("zh-CN,zh;q=0.9,en;q=0.8")),
    // AI translation
    field("ai_translation_enabled", Bool(false)),
    field("ai_provider", Text("openai")),
    field("ai_api_key", Text("")),
    field("ai_model_name", Text("gpt-3.5-turbo")),
    field("ai_base_url", Text("")),
    field("ai_translation_mode", Text("fast")),
    field("ai_translation_prompt", Text(DEFAULT_TRANSLATION_PROMPT)),
    // Scheduler
    field("task_chain_enabled", Bool(false)),
    field("task_chain_cron", Text("0 2 * * *")),
    field("task_chain_sequence", List(&[])),
    // Actor
    field("actor_role_add_prefix", Bool(false)),
    // Logging
    field("log_rotation_size_mb", Number(5.0)),
    field("log_rotation_backup_count", Number(10.0)),
];

/// Look up the schema entry for a setting name.
pub fn lookup(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|spec| spec.name == name)
}
