//! In-memory mirror of the backend's application settings.

pub mod schema;

use crate::binder::{CommaList, DerivedFieldBinder, LastEdited};
use crate::error::SyncError;
use schema::{ENGINES_FIELD, ENGINES_TEXT_FIELD, FIELDS, SettingKind};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single setting value.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingValue {
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<String>),
    /// Value of a setting the schema does not know, kept verbatim.
    Other(Value),
}

impl SettingValue {
    pub fn kind(&self) -> Option<SettingKind> {
        match self {
            SettingValue::Text(_) => Some(SettingKind::Text),
            SettingValue::Number(_) => Some(SettingKind::Number),
            SettingValue::Bool(_) => Some(SettingKind::Bool),
            SettingValue::List(_) => Some(SettingKind::List),
            SettingValue::Other(_) => None,
        }
    }

    /// Convert an untyped JSON value without coercion.
    fn from_json(value: &Value) -> Self {
        match value {
            Value::String(s) => SettingValue::Text(s.clone()),
            Value::Bool(b) => SettingValue::Bool(*b),
            Value::Number(n) => n
                .as_f64()
                .map(SettingValue::Number)
                .unwrap_or_else(|| SettingValue::Other(value.clone())),
            Value::Array(items) if items.iter().all(Value::is_string) => {
                SettingValue::List(items.iter().map(string_form).collect())
            }
            other => SettingValue::Other(other.clone()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            SettingValue::Text(s) => Value::String(s.clone()),
            SettingValue::Bool(b) => Value::Bool(*b),
            SettingValue::Number(n) => number_to_json(*n),
            SettingValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            SettingValue::Other(v) => v.clone(),
        }
    }
}

// Integral values go back out as integers so the backend's int fields
// round-trip unchanged.
fn number_to_json(n: f64) -> Value {
    const MAX_SAFE_INT: f64 = 9_007_199_254_740_991.0;
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INT {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Outcome of merging a JSON object into a snapshot.
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Number of fields written.
    pub applied: usize,
    /// Fields whose value had to fall back during coercion.
    pub warnings: Vec<SyncError>,
}

impl MergeReport {
    pub fn first_warning(&self) -> Option<&SyncError> {
        self.warnings.first()
    }
}

/// How the engine-order pair is treated while merging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EnginePolicy {
    /// Server data: the stored list is canonical, the text is re-rendered.
    ListWins,
    /// Local edits headed for the server: the text is authoritative, and a
    /// list without text only applies when the text was not typed after the
    /// list was last set.
    TextWins,
}

/// Complete in-memory mirror of the settings domain.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigSnapshot {
    values: BTreeMap<String, SettingValue>,
    engines: DerivedFieldBinder<CommaList>,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        let mut values = BTreeMap::new();
        let mut engines = Vec::new();
        for spec in FIELDS {
            match (spec.name, spec.default.to_value()) {
                (ENGINES_FIELD, SettingValue::List(list)) => engines = list,
                (name, value) => {
                    values.insert(name.to_string(), value);
                }
            }
        }
        Self {
            values,
            engines: DerivedFieldBinder::new(engines),
        }
    }
}

impl ConfigSnapshot {
    /// Defaults overlaid with a server object.
    pub fn from_json(map: &Map<String, Value>) -> (Self, MergeReport) {
        let mut snapshot = Self::default();
        let report = snapshot.merge_json(map);
        (snapshot, report)
    }

    pub fn get(&self, name: &str) -> Option<SettingValue> {
        match name {
            ENGINES_FIELD => Some(SettingValue::List(self.engines().to_vec())),
            ENGINES_TEXT_FIELD => Some(SettingValue::Text(self.engines_text().to_string())),
            _ => self.values.get(name).cloned(),
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(SettingValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(SettingValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(SettingValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        if name == ENGINES_FIELD {
            return Some(self.engines());
        }
        match self.values.get(name) {
            Some(SettingValue::List(items)) => Some(items),
            _ => None,
        }
    }

    pub fn engines(&self) -> &[String] {
        self.engines.canonical()
    }

    pub fn engines_text(&self) -> &str {
        self.engines.derived()
    }

    pub fn engine_binder(&self) -> &DerivedFieldBinder<CommaList> {
        &self.engines
    }

    pub fn set_engines(&mut self, engines: Vec<String>) {
        self.engines.set_canonical(engines);
    }

    pub fn set_engines_text(&mut self, text: impl Into<String>) {
        self.engines.set_derived(text.into());
    }

    /// Set a field from a local edit.
    ///
    /// Known fields must receive a value of their declared kind; the engine
    /// pair is routed through its binder.
    pub fn set(&mut self, name: &str, value: SettingValue) -> Result<(), SyncError> {
        match (name, value) {
            (ENGINES_FIELD, SettingValue::List(list)) => {
                self.set_engines(list);
                Ok(())
            }
            (ENGINES_TEXT_FIELD, SettingValue::Text(text)) => {
                self.set_engines_text(text);
                Ok(())
            }
            (ENGINES_FIELD | ENGINES_TEXT_FIELD, value) => Err(SyncError::validation(format!(
                "{}: unexpected value {:?}",
                name, value
            ))),
            (name, value) => {
                if let Some(spec) = schema::lookup(name) {
                    if value.kind() != Some(spec.kind()) {
                        return Err(SyncError::validation(format!(
                            "{}: expected {:?}, got {:?}",
                            name,
                            spec.kind(),
                            value
                        )));
                    }
                }
                self.values.insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    /// Merge a server object field-by-field.
    ///
    /// Fields missing from `map` keep their current value. Known fields are
    /// coerced to their schema kind; unknown fields are stored verbatim.
    pub fn merge_json(&mut self, map: &Map<String, Value>) -> MergeReport {
        self.merge_with(map, EnginePolicy::ListWins)
    }

    /// Overlay local edits (e.g. an explicit save payload).
    ///
    /// Same coercion as [`merge_json`](Self::merge_json), except that the
    /// engine text is authoritative: a payload carrying only the list leaves
    /// a text edited after the list in place.
    pub fn apply_edits(&mut self, map: &Map<String, Value>) -> MergeReport {
        self.merge_with(map, EnginePolicy::TextWins)
    }

    fn merge_with(&mut self, map: &Map<String, Value>, policy: EnginePolicy) -> MergeReport {
        let mut report = MergeReport::default();

        for (name, incoming) in map {
            if name == ENGINES_FIELD || name == ENGINES_TEXT_FIELD {
                continue;
            }
            let merged = match schema::lookup(name) {
                Some(spec) => {
                    let previous = self.values.get(name);
                    match coerce(name, spec.kind(), previous, incoming) {
                        Coerced::Value(value) => value,
                        Coerced::Fallback(value, warning) => {
                            report.warnings.push(warning);
                            value
                        }
                        Coerced::Keep => continue,
                    }
                }
                None => SettingValue::from_json(incoming),
            };
            self.values.insert(name.clone(), merged);
            report.applied += 1;
        }

        let list = map.get(ENGINES_FIELD);
        let text = map.get(ENGINES_TEXT_FIELD);
        match (policy, list, text) {
            (_, None, None) => {}
            (EnginePolicy::ListWins, Some(list), _) => {
                let engines = engine_list(list, &mut report);
                self.engines.set_canonical(engines);
                report.applied += 1;
            }
            (EnginePolicy::TextWins, _, Some(text)) | (EnginePolicy::ListWins, None, Some(text)) => {
                self.engines.set_derived(string_form_or_empty(text));
                report.applied += 1;
            }
            (EnginePolicy::TextWins, Some(list), None) => {
                if self.engines.last_edited() == LastEdited::Derived {
                    log::debug!(
                        "{} given without {}; keeping the text edited since",
                        ENGINES_FIELD,
                        ENGINES_TEXT_FIELD
                    );
                } else {
                    let engines = engine_list(list, &mut report);
                    self.engines.set_canonical(engines);
                    report.applied += 1;
                }
            }
        }

        report
    }

    /// Wire representation sent to `POST /api/config`.
    pub fn to_json(&self) -> Map<String, Value> {
        let mut map: Map<String, Value> = self
            .values
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        map.insert(
            ENGINES_FIELD.to_string(),
            SettingValue::List(self.engines().to_vec()).to_json(),
        );
        map.insert(
            ENGINES_TEXT_FIELD.to_string(),
            Value::String(self.engines_text().to_string()),
        );
        map
    }
}

fn string_form_or_empty(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => string_form(other),
    }
}

enum Coerced {
    Value(SettingValue),
    Fallback(SettingValue, SyncError),
    Keep,
}

fn coerce(name: &str, kind: SettingKind, previous: Option<&SettingValue>, incoming: &Value) -> Coerced {
    match kind {
        SettingKind::Number => match incoming {
            Value::Number(n) => match n.as_f64() {
                Some(f) => Coerced::Value(SettingValue::Number(f)),
                None => number_fallback(name, previous, incoming),
            },
            other => match string_form(other).trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Coerced::Value(SettingValue::Number(f)),
                _ => number_fallback(name, previous, incoming),
            },
        },
        SettingKind::Bool => match incoming {
            Value::Bool(b) => Coerced::Value(SettingValue::Bool(*b)),
            other => Coerced::Value(SettingValue::Bool(
                string_form(other).trim().eq_ignore_ascii_case("true"),
            )),
        },
        SettingKind::List => coerce_list(name, incoming),
        SettingKind::Text => match incoming {
            Value::Null => Coerced::Keep,
            other => Coerced::Value(SettingValue::Text(string_form(other))),
        },
    }
}

fn number_fallback(name: &str, previous: Option<&SettingValue>, incoming: &Value) -> Coerced {
    let fallback = match previous {
        Some(SettingValue::Number(n)) => *n,
        _ => 0.0,
    };
    Coerced::Fallback(
        SettingValue::Number(fallback),
        SyncError::validation(format!("{}: expected a number, got {}", name, incoming)),
    )
}

fn engine_list(value: &Value, report: &mut MergeReport) -> Vec<String> {
    match coerce_list(ENGINES_FIELD, value) {
        Coerced::Value(SettingValue::List(items)) => items,
        Coerced::Fallback(_, warning) => {
            report.warnings.push(warning);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn coerce_list(name: &str, incoming: &Value) -> Coerced {
    match incoming {
        Value::Array(items) => Coerced::Value(SettingValue::List(
            items
                .iter()
                .filter(|item| !item.is_null())
                .map(string_form)
                .collect(),
        )),
        other => Coerced::Fallback(
            SettingValue::List(Vec::new()),
            SyncError::validation(format!("{}: expected a list, got {}", name, other)),
        ),
    }
}
