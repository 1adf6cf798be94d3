//! Parameter normalization
//!
//! Turns an arbitrarily shaped configuration object into a fully defaulted,
//! type-normalized parameter set by walking the variant's field table once.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::errors::{Result, TranslateError};
use crate::fields::{names, FieldDefault, FieldKind, FieldSpec, FitVariant};

/// A field value in its canonical type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    IntSeq(Vec<i64>),
    FloatSeq(Vec<f64>),
}

impl ParamValue {
    fn from_default(default: FieldDefault) -> Option<Self> {
        match default {
            FieldDefault::Int(value) => Some(ParamValue::Int(value)),
            FieldDefault::Float(value) => Some(ParamValue::Float(value)),
            FieldDefault::Bool(value) => Some(ParamValue::Bool(value)),
            FieldDefault::Text(value) => Some(ParamValue::Text(value.to_string())),
            FieldDefault::Ints(values) => Some(ParamValue::IntSeq(values.to_vec())),
            FieldDefault::Floats(values) => Some(ParamValue::FloatSeq(values.to_vec())),
            FieldDefault::NoText => None,
        }
    }

    /// Number of stages carried by a sequence value.
    pub fn stage_len(&self) -> Option<usize> {
        match self {
            ParamValue::IntSeq(values) => Some(values.len()),
            ParamValue::FloatSeq(values) => Some(values.len()),
            _ => None,
        }
    }

    /// Render as positional argument text.
    ///
    /// Booleans become `0`/`1`; sequences join their elements with a space and
    /// are normally flattened by the argument builder before reaching here.
    pub fn render(&self) -> String {
        match self {
            ParamValue::Int(value) => value.to_string(),
            ParamValue::Float(value) => render_float(*value),
            ParamValue::Bool(value) => render_flag(*value).to_string(),
            ParamValue::Text(value) => value.clone(),
            ParamValue::IntSeq(values) => values
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(" "),
            ParamValue::FloatSeq(values) => values
                .iter()
                .map(|value| render_float(*value))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Per-stage elements rendered individually; scalars yield themselves.
    pub fn render_elements(&self) -> Vec<String> {
        match self {
            ParamValue::IntSeq(values) => values.iter().map(i64::to_string).collect(),
            ParamValue::FloatSeq(values) => values.iter().map(|v| render_float(*v)).collect(),
            scalar => vec![scalar.render()],
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

/// Decimal text for a float: integral values keep one decimal place, other
/// values use the shortest round-trip form. Never scientific notation.
pub fn render_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

pub fn render_flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Fully defaulted parameters for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedParameterSet {
    variant: FitVariant,
    values: BTreeMap<&'static str, ParamValue>,
    stage_count: usize,
}

impl NormalizedParameterSet {
    pub fn variant(&self) -> FitVariant {
        self.variant
    }

    /// Common length of every per-stage sequence.
    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Value of a table field, falling back to the table default when absent.
    pub fn value_or_default(&self, name: &str) -> Option<ParamValue> {
        self.get(name).cloned().or_else(|| {
            self.variant
                .fields()
                .iter()
                .find(|spec| spec.name == name)
                .and_then(|spec| ParamValue::from_default(spec.default))
        })
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_text)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(ParamValue::as_bool).unwrap_or(false)
    }

    pub fn dataname(&self) -> &str {
        self.text(names::DATANAME).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ParamValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Nested configuration object equivalent to this set. Dotted names expand
    /// into nested objects, so normalizing the result yields this set again.
    pub fn to_config_object(&self) -> Value {
        let mut root = Map::new();
        for (name, value) in &self.values {
            let value = serde_json::to_value(value).unwrap_or(Value::Null);
            insert_dotted(&mut root, name, value);
        }
        Value::Object(root)
    }
}

fn insert_dotted(root: &mut Map<String, Value>, name: &str, value: Value) {
    match name.split_once('.') {
        None => {
            root.insert(name.to_string(), value);
        }
        Some((head, rest)) => {
            let child = root
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                insert_dotted(child, rest, value);
            }
        }
    }
}

/// Normalizes raw configuration objects against a variant's field table.
#[derive(Debug, Clone, Copy)]
pub struct ParameterNormalizer {
    variant: FitVariant,
}

impl ParameterNormalizer {
    pub fn new(variant: FitVariant) -> Self {
        Self { variant }
    }

    pub fn normalize(&self, config: &Value) -> Result<NormalizedParameterSet> {
        normalize(config, self.variant)
    }
}

/// Normalize `config` for `variant`.
///
/// Unknown keys are ignored and `config` is never modified.
pub fn normalize(config: &Value, variant: FitVariant) -> Result<NormalizedParameterSet> {
    let root = config
        .as_object()
        .ok_or_else(|| TranslateError::malformed("$", "expected a JSON object"))?;

    let mut values = BTreeMap::new();
    for spec in variant.fields() {
        let value = match lookup_field(root, spec)? {
            Some(raw) => Some(coerce(spec, raw)?),
            None => ParamValue::from_default(spec.default),
        };
        if let Some(value) = value {
            values.insert(spec.name, value);
        }
    }

    let stage_count = check_stage_arity(variant, &values)?;

    Ok(NormalizedParameterSet {
        variant,
        values,
        stage_count,
    })
}

fn lookup_field<'a>(root: &'a Map<String, Value>, spec: &FieldSpec) -> Result<Option<&'a Value>> {
    for source in spec.sources() {
        if let Some(value) = lookup_path(root, source)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Walk a dotted path. Missing keys and `null` read as absent.
fn lookup_path<'a>(root: &'a Map<String, Value>, path: &str) -> Result<Option<&'a Value>> {
    let mut current = root;
    let mut segments = path.split('.').peekable();
    let mut walked = String::new();

    while let Some(segment) = segments.next() {
        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(segment);

        let value = match current.get(segment) {
            None | Some(Value::Null) => return Ok(None),
            Some(value) => value,
        };

        if segments.peek().is_none() {
            return Ok(Some(value));
        }

        current = value
            .as_object()
            .ok_or_else(|| TranslateError::malformed(walked.clone(), "expected an object"))?;
    }

    Ok(None)
}

fn coerce(spec: &FieldSpec, raw: &Value) -> Result<ParamValue> {
    let kind = spec.kind();
    let mismatch = || {
        TranslateError::malformed(
            spec.name,
            format!("expected {}, got {}", kind.describe(), json_type(raw)),
        )
    };

    match kind {
        FieldKind::Int => coerce_int(raw).map(ParamValue::Int).ok_or_else(mismatch),
        FieldKind::Float => coerce_float(raw).map(ParamValue::Float).ok_or_else(mismatch),
        FieldKind::Bool => coerce_bool(raw).map(ParamValue::Bool).ok_or_else(mismatch),
        FieldKind::Text => coerce_text(raw).map(ParamValue::Text).ok_or_else(mismatch),
        FieldKind::IntSeq => coerce_seq(spec, raw, coerce_int).map(ParamValue::IntSeq),
        FieldKind::FloatSeq => coerce_seq(spec, raw, coerce_float).map(ParamValue::FloatSeq),
    }
}

fn coerce_seq<T>(spec: &FieldSpec, raw: &Value, element: fn(&Value) -> Option<T>) -> Result<Vec<T>> {
    let kind = spec.kind();
    match raw {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(TranslateError::malformed(spec.name, "sequence must not be empty"));
            }
            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    element(item).ok_or_else(|| {
                        TranslateError::malformed(
                            spec.name,
                            format!(
                                "element {index}: expected {}, got {}",
                                kind.describe(),
                                json_type(item)
                            ),
                        )
                    })
                })
                .collect()
        }
        Value::Object(_) => Err(TranslateError::malformed(
            spec.name,
            format!("expected {}, got object", kind.describe()),
        )),
        scalar => element(scalar).map(|value| vec![value]).ok_or_else(|| {
            TranslateError::malformed(
                spec.name,
                format!("expected {}, got {}", kind.describe(), json_type(scalar)),
            )
        }),
    }
}

fn coerce_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(truncate_float)),
        Value::Bool(value) => Some(i64::from(*value)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(truncate_float))
        }
        _ => None,
    }
}

fn truncate_float(value: f64) -> Option<i64> {
    if value.is_finite() && value.abs() < i64::MAX as f64 {
        Some(value.trunc() as i64)
    } else {
        None
    }
}

fn coerce_float(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(number) => number.as_f64(),
        Value::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

fn coerce_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(value) => Some(*value),
        Value::Number(number) => number.as_f64().map(|value| value != 0.0),
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Every per-stage sequence must carry the same number of stages.
fn check_stage_arity(
    variant: FitVariant,
    values: &BTreeMap<&'static str, ParamValue>,
) -> Result<usize> {
    let mut reference: Option<(&'static str, usize)> = None;

    // Table order, so the first stage field named in the table anchors the check.
    for spec in variant.fields().iter().filter(|spec| spec.kind().is_sequence()) {
        let Some(len) = values.get(spec.name).and_then(ParamValue::stage_len) else {
            continue;
        };
        match reference {
            None => reference = Some((spec.name, len)),
            Some((left, left_len)) if left_len != len => {
                return Err(TranslateError::StageArityMismatch {
                    left: left.to_string(),
                    left_len,
                    right: spec.name.to_string(),
                    right_len: len,
                });
            }
            Some(_) => {}
        }
    }

    Ok(reference.map(|(_, len)| len).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_gets_regression_defaults() {
        let params = normalize(&json!({}), FitVariant::Regression).unwrap();

        assert_eq!(params.dataname(), "1193_BNG_lowbwt_train");
        assert_eq!(params.get("steps"), Some(&ParamValue::Int(200)));
        assert_eq!(params.get("splitRatio"), Some(&ParamValue::Float(0.1)));
        assert_eq!(params.get("loss.index"), Some(&ParamValue::Int(1)));
        assert_eq!(
            params.get("childPartitionSize"),
            Some(&ParamValue::IntSeq(vec![500, 50]))
        );
        assert_eq!(params.get("localDataPath"), None);
        assert_eq!(params.stage_count(), 2);
    }

    #[test]
    fn test_scalar_broadcasts_to_single_stage() {
        let config = json!({
            "childPartitionSize": 300,
            "childLearningRate": 0.05,
            "childActivePartitionRatio": 0.4,
            "childMaxDepth": 3,
            "childMinLeafSize": 5,
            "childMinimumGainSplit": 0.001,
        });
        let params = normalize(&config, FitVariant::Regression).unwrap();

        assert_eq!(
            params.get("childPartitionSize"),
            Some(&ParamValue::IntSeq(vec![300]))
        );
        assert_eq!(
            params.get("childLearningRate"),
            Some(&ParamValue::FloatSeq(vec![0.05]))
        );
        assert_eq!(params.stage_count(), 1);
    }

    #[test]
    fn test_stage_arity_mismatch_names_both_fields() {
        let config = json!({ "childPartitionSize": [500, 50, 5] });
        let err = normalize(&config, FitVariant::Regression).unwrap_err();

        assert_eq!(
            err,
            TranslateError::StageArityMismatch {
                left: "childPartitionSize".into(),
                left_len: 3,
                right: "childLearningRate".into(),
                right_len: 2,
            }
        );
        assert_eq!(err.kind(), "stage_arity_mismatch");
    }

    #[test]
    fn test_nested_object_in_sequence_is_malformed() {
        let config = json!({ "childMaxDepth": { "depth": 2 } });
        let err = normalize(&config, FitVariant::Regression).unwrap_err();

        assert_eq!(err.kind(), "malformed_field");
        assert_eq!(err.field(), Some("childMaxDepth"));
    }

    #[test]
    fn test_non_object_loss_is_malformed() {
        let err = normalize(&json!({ "loss": 3 }), FitVariant::Regression).unwrap_err();
        assert_eq!(err.field(), Some("loss"));
    }

    #[test]
    fn test_root_must_be_object() {
        let err = normalize(&json!([1, 2]), FitVariant::Regression).unwrap_err();
        assert_eq!(err.field(), Some("$"));
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let err = normalize(&json!({ "childLearningRate": [] }), FitVariant::Regression)
            .unwrap_err();
        assert_eq!(err.field(), Some("childLearningRate"));
    }

    #[test]
    fn test_classification_loss_fallbacks() {
        let from_data = normalize(
            &json!({ "loss": { "index": 1, "data": 4 }, "lossFn": 7 }),
            FitVariant::Classification,
        )
        .unwrap();
        assert_eq!(from_data.get("loss.data"), Some(&ParamValue::Int(4)));

        let from_fn = normalize(&json!({ "lossFn": 7 }), FitVariant::Classification).unwrap();
        assert_eq!(from_fn.get("loss.data"), Some(&ParamValue::Int(7)));

        let fallback = normalize(&json!({}), FitVariant::Classification).unwrap();
        assert_eq!(fallback.get("loss.data"), Some(&ParamValue::Int(10)));
    }

    #[test]
    fn test_classification_bounds_truncate() {
        let params = normalize(
            &json!({ "upper_val": -1.7, "lowerVal": 2.9 }),
            FitVariant::Classification,
        )
        .unwrap();
        assert_eq!(params.get("upperVal"), Some(&ParamValue::Int(-1)));
        assert_eq!(params.get("lowerVal"), Some(&ParamValue::Int(2)));
    }

    #[test]
    fn test_null_reads_as_absent() {
        let params = normalize(&json!({ "steps": null }), FitVariant::Regression).unwrap();
        assert_eq!(params.get("steps"), Some(&ParamValue::Int(200)));
    }

    #[test]
    fn test_string_and_numeric_coercions() {
        let params = normalize(
            &json!({ "steps": "25", "recursiveFit": "false", "clamp_gradient": 1, "lossPower": "2" }),
            FitVariant::Regression,
        )
        .unwrap();
        assert_eq!(params.get("steps"), Some(&ParamValue::Int(25)));
        assert_eq!(params.get("recursiveFit"), Some(&ParamValue::Bool(false)));
        assert_eq!(params.get("clamp_gradient"), Some(&ParamValue::Bool(true)));
        assert_eq!(params.get("lossPower"), Some(&ParamValue::Float(2.0)));
    }

    #[test]
    fn test_bad_boolean_is_malformed() {
        let err = normalize(&json!({ "recursiveFit": "maybe" }), FitVariant::Regression)
            .unwrap_err();
        assert_eq!(err.field(), Some("recursiveFit"));
    }

    #[test]
    fn test_config_object_nests_dotted_names() {
        let params = normalize(&json!({}), FitVariant::Regression).unwrap();
        let object = params.to_config_object();

        assert_eq!(object["loss"]["index"], json!(1));
        assert_eq!(object["childLearningRate"], json!([0.01, 0.01]));
        assert_eq!(object["recursiveFit"], json!(true));
    }

    #[test]
    fn test_render_float_forms() {
        assert_eq!(render_float(1.0), "1.0");
        assert_eq!(render_float(-1.0), "-1.0");
        assert_eq!(render_float(0.01), "0.01");
        assert_eq!(render_float(2.4), "2.4");
        assert_eq!(render_float(0.0001), "0.0001");
        assert_eq!(render_float(1500000.0), "1500000.0");
    }

    #[test]
    fn test_value_or_default_covers_table_fields() {
        let params = normalize(&json!({}), FitVariant::Classification).unwrap();
        assert_eq!(
            params.value_or_default("numTrees"),
            Some(ParamValue::Int(10))
        );
        assert_eq!(params.value_or_default("unknown"), None);
    }
}
