/// Option translation: permissive config object → ordered engine flags.
///
/// Each algorithm declares an ordered [`OptionSpec`] table. Flags are emitted
/// in table order, never in config key order, because some engine parsers
/// are order-sensitive.

pub mod algorithms;

use log::{debug, warn};
use serde_json::{Map, Value as JsonValue};

use crate::config::OptionPolicy;
use crate::data::model::format_number;
use crate::data::schema::{parse_overrides, AttributeOverrideSpec};
use crate::error::{OptionError, Result};

/// Caller-supplied configuration, as parsed from JSON.
pub type ConfigObject = Map<String, JsonValue>;

pub const DATA_ATTRIBUTES: &str = "dataAttributes";
pub const DATASET_NAME: &str = "datasetName";
pub const CLASS_INDEX: &str = "classIndex";
pub const CLASSIFY_INSTANCE: &str = "classifyInstance";
pub const CLUSTER_INSTANCE: &str = "clusterInstance";

const RESERVED_KEYS: [&str; 5] = [
    DATA_ATTRIBUTES,
    DATASET_NAME,
    CLASS_INDEX,
    CLASSIFY_INSTANCE,
    CLUSTER_INSTANCE,
];

// ---------------------------------------------------------------------------
// Option declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Bare `-X`, emitted when the value is truthy.
    Presence,
    /// `-X <value>`, emitted whenever the value is present.
    Valued,
}

/// Documented value domain of a recognised option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Domain {
    /// Anything; presence flags use this.
    Any,
    Text,
    Number,
    NonNegative,
    /// Rates and weights in `[0, 1]`.
    UnitInterval,
    /// Percentages in `[0, 100]`.
    Percent,
    Integer,
    IntRange(i64, i64),
    PositiveInt,
    OneOf(&'static [&'static str]),
    /// Comma-separated layer sizes or the wildcards `a`, `i`, `o`, `t`.
    Layers,
}

impl Domain {
    pub fn accepts(&self, value: &JsonValue) -> bool {
        match self {
            Domain::Any => true,
            Domain::Text => value.is_string(),
            Domain::Number => as_number(value).is_some(),
            Domain::NonNegative => as_number(value).is_some_and(|v| v >= 0.0),
            Domain::UnitInterval => as_number(value).is_some_and(|v| (0.0..=1.0).contains(&v)),
            Domain::Percent => as_number(value).is_some_and(|v| (0.0..=100.0).contains(&v)),
            Domain::Integer => as_integer(value).is_some(),
            Domain::IntRange(lo, hi) => as_integer(value).is_some_and(|v| (*lo..=*hi).contains(&v)),
            Domain::PositiveInt => as_integer(value).is_some_and(|v| v >= 1),
            Domain::OneOf(choices) => value.as_str().is_some_and(|s| choices.iter().any(|c| *c == s)),
            Domain::Layers => match value {
                JsonValue::Array(items) => !items.is_empty() && items.iter().all(is_layer),
                JsonValue::String(s) => !s.is_empty() && s.split(',').all(|t| is_layer_token(t.trim())),
                other => is_layer(other),
            },
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Domain::Any => "any value".to_string(),
            Domain::Text => "a string".to_string(),
            Domain::Number => "a number".to_string(),
            Domain::NonNegative => "a number >= 0".to_string(),
            Domain::UnitInterval => "a number in [0, 1]".to_string(),
            Domain::Percent => "a number in [0, 100]".to_string(),
            Domain::Integer => "an integer".to_string(),
            Domain::IntRange(lo, hi) => format!("an integer in [{lo}, {hi}]"),
            Domain::PositiveInt => "an integer >= 1".to_string(),
            Domain::OneOf(choices) => format!("one of {}", choices.join(", ")),
            Domain::Layers => "comma-separated layer sizes or a, i, o, t".to_string(),
        }
    }
}

fn as_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn as_integer(value: &JsonValue) -> Option<i64> {
    as_number(value)
        .filter(|v| v.fract() == 0.0 && v.abs() < 9.0e15)
        .map(|v| v as i64)
}

fn is_layer(value: &JsonValue) -> bool {
    match value {
        JsonValue::String(s) => is_layer_token(s.trim()),
        other => as_integer(other).is_some_and(|v| v >= 0),
    }
}

fn is_layer_token(token: &str) -> bool {
    matches!(token, "a" | "i" | "o" | "t") || token.parse::<u32>().is_ok()
}

/// An extra result an algorithm can return when its key is truthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Centroids,
    FrequencyCounts,
    ClusterSizes,
    /// Pairwise distances between test instances.
    Distances,
    /// The evolved fuzzy system.
    FuzzySystem,
}

impl Output {
    pub fn key(&self) -> &'static str {
        match self {
            Output::Centroids => "getCentroids",
            Output::FrequencyCounts => "frequencyCounts",
            Output::ClusterSizes => "getClusterSizes",
            Output::Distances => "distance",
            Output::FuzzySystem => "system",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    /// Config key, e.g. `minInstances`.
    pub key: &'static str,
    pub flag: char,
    pub kind: OptionKind,
    pub domain: Domain,
    /// Rewrites the stringified value, e.g. to qualify a class name.
    pub formatter: Option<fn(&str) -> String>,
}

impl OptionSpec {
    pub const fn presence(key: &'static str, flag: char) -> Self {
        Self {
            key,
            flag,
            kind: OptionKind::Presence,
            domain: Domain::Any,
            formatter: None,
        }
    }

    pub const fn valued(key: &'static str, flag: char, domain: Domain) -> Self {
        Self {
            key,
            flag,
            kind: OptionKind::Valued,
            domain,
            formatter: None,
        }
    }

    pub const fn with_formatter(self, formatter: fn(&str) -> String) -> Self {
        Self {
            formatter: Some(formatter),
            ..self
        }
    }

    pub fn flag_token(&self) -> String {
        format!("-{}", self.flag)
    }
}

// ---------------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------------

/// Result of one translation. Built once per invocation, consumed once.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Translation {
    pub flags: Vec<String>,
    pub overrides: Option<AttributeOverrideSpec>,
    pub dataset_name: Option<String>,
    /// `None` or `-1` defer to the engine's last-attribute convention.
    pub class_index: Option<i64>,
    /// Whether most-likely labels were requested per instance.
    pub predict_labels: bool,
    /// Extra results requested, in declaration order.
    pub outputs: Vec<Output>,
}

impl Translation {
    pub fn wants(&self, output: Output) -> bool {
        self.outputs.contains(&output)
    }
}

/// Translate with the strict policy.
pub fn translate(options: &ConfigObject, recognized: &[OptionSpec]) -> Result<Translation> {
    translate_with(options, recognized, OptionPolicy::Strict)
}

/// Like [`translate`], for options that are not known to be an object yet.
pub fn translate_json(
    options: &JsonValue,
    recognized: &[OptionSpec],
    policy: OptionPolicy,
) -> Result<Translation> {
    match options {
        JsonValue::Object(map) => translate_with(map, recognized, policy),
        JsonValue::Null => translate_with(&ConfigObject::new(), recognized, policy),
        other => Err(OptionError::NotAnObject(other.to_string()).into()),
    }
}

pub fn translate_with(
    options: &ConfigObject,
    recognized: &[OptionSpec],
    policy: OptionPolicy,
) -> Result<Translation> {
    translate_for(options, recognized, &[], policy)
}

/// Like [`translate_with`], also extracting requests for `outputs`.
pub fn translate_for(
    options: &ConfigObject,
    recognized: &[OptionSpec],
    outputs: &[Output],
    policy: OptionPolicy,
) -> Result<Translation> {
    let mut out = Translation::default();

    for spec in recognized {
        let Some(value) = options.get(spec.key).filter(|v| !v.is_null()) else {
            continue;
        };
        match spec.kind {
            OptionKind::Presence => {
                if is_truthy(value) {
                    out.flags.push(spec.flag_token());
                }
            }
            OptionKind::Valued => {
                if !check(spec.key, value, &spec.domain, policy)? {
                    continue;
                }
                let text = stringify(value);
                out.flags.push(spec.flag_token());
                out.flags.push(match spec.formatter {
                    Some(format) => format(&text),
                    None => text,
                });
            }
        }
    }

    if let Some(value) = options.get(DATA_ATTRIBUTES).filter(|v| !v.is_null()) {
        out.overrides = Some(parse_overrides(value)?);
    }
    if let Some(value) = options.get(DATASET_NAME).filter(|v| !v.is_null()) {
        if check(DATASET_NAME, value, &Domain::Text, policy)? {
            out.dataset_name = value.as_str().map(str::to_string);
        }
    }
    if let Some(value) = options.get(CLASS_INDEX).filter(|v| !v.is_null()) {
        if check(CLASS_INDEX, value, &Domain::IntRange(-1, i64::MAX), policy)? {
            out.class_index = as_integer(value);
        }
    }
    out.predict_labels = [CLASSIFY_INSTANCE, CLUSTER_INSTANCE]
        .iter()
        .any(|k| options.get(*k).is_some_and(is_truthy));
    out.outputs = outputs
        .iter()
        .copied()
        .filter(|o| options.get(o.key()).is_some_and(is_truthy))
        .collect();

    let ignored: Vec<&str> = options
        .keys()
        .map(String::as_str)
        .filter(|k| {
            !RESERVED_KEYS.iter().any(|r| r == k)
                && !recognized.iter().any(|s| s.key == *k)
                && !outputs.iter().any(|o| o.key() == *k)
        })
        .collect();
    if !ignored.is_empty() {
        debug!("ignoring unrecognised options: {}", ignored.join(", "));
    }
    debug!("translated options to flags {:?}", out.flags);

    Ok(out)
}

/// `Ok(false)` means the value was dropped under the lenient policy.
fn check(key: &str, value: &JsonValue, domain: &Domain, policy: OptionPolicy) -> Result<bool> {
    if domain.accepts(value) {
        return Ok(true);
    }
    match policy {
        OptionPolicy::Strict => Err(OptionError::OutOfDomain {
            key: key.to_string(),
            value: value.to_string(),
            expected: domain.describe(),
        }
        .into()),
        OptionPolicy::Lenient => {
            warn!(
                "dropping option '{key}' = {value}: expected {}",
                domain.describe()
            );
            Ok(false)
        }
    }
}

/// Scripting-style truthiness: `false`, `0`, `""` and `null` are falsy.
pub fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Default string conversion for flag values; arrays join with commas.
fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.as_f64().map_or_else(|| n.to_string(), format_number),
        JsonValue::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    const SPECS: &[OptionSpec] = &[
        OptionSpec::presence("verbose", 'V'),
        OptionSpec::valued("rate", 'R', Domain::UnitInterval),
        OptionSpec::valued("name", 'N', Domain::Text).with_formatter(qualify),
    ];

    fn qualify(s: &str) -> String {
        format!("pkg.{s}")
    }

    fn object(value: JsonValue) -> ConfigObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn emission_follows_declaration_order() {
        let opts = object(json!({"name": "Thing", "rate": 0.5, "verbose": true}));
        let t = translate(&opts, SPECS).unwrap();
        assert_eq!(t.flags, vec!["-V", "-R", "0.5", "-N", "pkg.Thing"]);
    }

    #[test]
    fn falsy_presence_and_absent_values_emit_nothing() {
        for v in [json!(false), json!(0), json!(""), json!(null)] {
            let t = translate(&object(json!({"verbose": v.clone(), "rate": null})), SPECS).unwrap();
            assert!(t.flags.is_empty(), "{v} should emit nothing");
        }
        assert_eq!(translate(&object(json!({"verbose": "yes"})), SPECS).unwrap().flags, vec!["-V"]);
    }

    #[test]
    fn out_of_domain_fails_in_strict_mode() {
        let err = translate(&object(json!({"rate": 1.5})), SPECS).unwrap_err();
        match err {
            Error::Option(OptionError::OutOfDomain { key, value, .. }) => {
                assert_eq!(key, "rate");
                assert_eq!(value, "1.5");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn lenient_mode_drops_bad_values() {
        let opts = object(json!({"rate": "fast", "verbose": true}));
        let t = translate_with(&opts, SPECS, OptionPolicy::Lenient).unwrap();
        assert_eq!(t.flags, vec!["-V"]);
    }

    #[test]
    fn reserved_keys_are_extracted_not_emitted() {
        let opts = object(json!({
            "dataAttributes": [[0, "string", "id"]],
            "datasetName": "iris",
            "classIndex": 4,
            "classifyInstance": true,
            "unknown": 12
        }));
        let t = translate(&opts, SPECS).unwrap();
        assert!(t.flags.is_empty());
        assert_eq!(t.overrides.map(|o| o.len()), Some(1));
        assert_eq!(t.dataset_name.as_deref(), Some("iris"));
        assert_eq!(t.class_index, Some(4));
        assert!(t.predict_labels);
    }

    #[test]
    fn output_requests_are_extracted_when_truthy() {
        let outputs = [Output::Centroids, Output::ClusterSizes];
        let opts = object(json!({"getCentroids": true, "getClusterSizes": 0, "system": true}));
        let t = translate_for(&opts, SPECS, &outputs, OptionPolicy::Strict).unwrap();
        assert!(t.flags.is_empty());
        assert_eq!(t.outputs, vec![Output::Centroids]);
        assert!(t.wants(Output::Centroids));
        assert!(!t.wants(Output::FuzzySystem));
    }

    #[test]
    fn class_index_below_minus_one_is_rejected() {
        let err = translate(&object(json!({"classIndex": -2})), SPECS).unwrap_err();
        assert!(matches!(err, Error::Option(OptionError::OutOfDomain { .. })));
    }

    #[test]
    fn options_must_be_an_object() {
        let err = translate_json(&json!([1, 2]), SPECS, OptionPolicy::Strict).unwrap_err();
        assert!(matches!(err, Error::Option(OptionError::NotAnObject(_))));
        assert_eq!(
            translate_json(&json!(null), SPECS, OptionPolicy::Strict).unwrap(),
            Translation::default()
        );
    }

    #[test]
    fn stringify_matches_scripting_conversion() {
        assert_eq!(stringify(&json!(3)), "3");
        assert_eq!(stringify(&json!(3.0)), "3");
        assert_eq!(stringify(&json!(0.25)), "0.25");
        assert_eq!(stringify(&json!([4, 2])), "4,2");
        assert_eq!(stringify(&json!(true)), "true");
    }

    #[test]
    fn layer_domain() {
        let layers = Domain::Layers;
        assert!(layers.accepts(&json!("a")));
        assert!(layers.accepts(&json!("4, 2")));
        assert!(layers.accepts(&json!([4, "i"])));
        assert!(layers.accepts(&json!(3)));
        assert!(!layers.accepts(&json!("x")));
        assert!(!layers.accepts(&json!(-1)));
        assert!(!layers.accepts(&json!([])));
    }
}
