//! Declarative field tables for the two fit protocols
//!
//! Each protocol variant owns one table listing every recognized field with its
//! canonical type and default. The normalizer walks the table once; nothing else
//! in the crate carries a default of its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use self::names::*;

/// Canonical field names shared by the tables and the argument layouts.
pub mod names {
    pub const DATANAME: &str = "dataname";
    pub const LOCAL_DATA_PATH: &str = "localDataPath";
    pub const DATASET_NAME: &str = "datasetName";
    pub const STEPS: &str = "steps";
    pub const SPLIT_RATIO: &str = "splitRatio";
    pub const SHOW_OOS_EACH_STEP: &str = "showOOSEachStep";
    pub const NUM_TREES: &str = "numTrees";

    pub const CHILD_PARTITION_SIZE: &str = "childPartitionSize";
    pub const CHILD_NUM_STEPS: &str = "childNumSteps";
    pub const CHILD_LEARNING_RATE: &str = "childLearningRate";
    pub const CHILD_ACTIVE_PARTITION_RATIO: &str = "childActivePartitionRatio";
    pub const CHILD_MAX_DEPTH: &str = "childMaxDepth";
    pub const CHILD_MIN_LEAF_SIZE: &str = "childMinLeafSize";
    pub const CHILD_MINIMUM_GAIN_SPLIT: &str = "childMinimumGainSplit";

    pub const LOSS_INDEX: &str = "loss.index";
    pub const LOSS_DATA: &str = "loss.data";
    pub const LOSS_FN: &str = "lossFn";
    pub const LOSS_POWER: &str = "lossPower";
    pub const COL_SUBSAMPLE_RATIO: &str = "colSubsampleRatio";
    pub const RECURSIVE_FIT: &str = "recursiveFit";
    pub const CLAMP_GRADIENT: &str = "clamp_gradient";
    pub const UPPER_VAL_SNAKE: &str = "upper_val";
    pub const LOWER_VAL_SNAKE: &str = "lower_val";
    pub const UPPER_VAL: &str = "upperVal";
    pub const LOWER_VAL: &str = "lowerVal";
    pub const RUN_ON_TEST_DATASET: &str = "runOnTestDataset";
}

/// One of the two fixed external invocation shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitVariant {
    Regression,
    Classification,
}

impl FitVariant {
    /// Field table consulted when normalizing a request for this variant.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            FitVariant::Regression => REGRESSION_FIELDS,
            FitVariant::Classification => CLASSIFICATION_FIELDS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FitVariant::Regression => "regression",
            FitVariant::Classification => "classification",
        }
    }
}

impl fmt::Display for FitVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitVariant {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "regression" => Ok(FitVariant::Regression),
            "classification" | "classifier" => Ok(FitVariant::Classification),
            other => Err(format!("unknown fit variant: {other}")),
        }
    }
}

/// Canonical type of a normalized field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
    Bool,
    Text,
    IntSeq,
    FloatSeq,
}

impl FieldKind {
    /// Sequence fields broadcast a bare scalar to a one-element sequence and
    /// count as per-stage parameters.
    pub fn is_sequence(self) -> bool {
        matches!(self, FieldKind::IntSeq | FieldKind::FloatSeq)
    }

    pub fn describe(self) -> &'static str {
        match self {
            FieldKind::Int => "integer",
            FieldKind::Float => "float",
            FieldKind::Bool => "boolean",
            FieldKind::Text => "string",
            FieldKind::IntSeq => "sequence of integers",
            FieldKind::FloatSeq => "sequence of floats",
        }
    }
}

/// Default substituted when a field is absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(&'static str),
    Ints(&'static [i64]),
    Floats(&'static [f64]),
    /// Optional text field; stays absent when the caller omits it.
    NoText,
}

impl FieldDefault {
    pub fn kind(self) -> FieldKind {
        match self {
            FieldDefault::Int(_) => FieldKind::Int,
            FieldDefault::Float(_) => FieldKind::Float,
            FieldDefault::Bool(_) => FieldKind::Bool,
            FieldDefault::Text(_) | FieldDefault::NoText => FieldKind::Text,
            FieldDefault::Ints(_) => FieldKind::IntSeq,
            FieldDefault::Floats(_) => FieldKind::FloatSeq,
        }
    }
}

/// A recognized configuration field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Canonical (dotted) name; also the first source key.
    pub name: &'static str,
    /// Source keys tried in order when `name` is absent.
    pub fallbacks: &'static [&'static str],
    pub default: FieldDefault,
}

impl FieldSpec {
    const fn new(name: &'static str, default: FieldDefault) -> Self {
        Self {
            name,
            fallbacks: &[],
            default,
        }
    }

    const fn with_fallbacks(
        name: &'static str,
        fallbacks: &'static [&'static str],
        default: FieldDefault,
    ) -> Self {
        Self {
            name,
            fallbacks,
            default,
        }
    }

    pub fn kind(&self) -> FieldKind {
        self.default.kind()
    }

    /// Source keys in lookup order.
    pub fn sources(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.name).chain(self.fallbacks.iter().copied())
    }
}

pub static REGRESSION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(DATANAME, FieldDefault::Text("1193_BNG_lowbwt_train")),
    FieldSpec::new(LOCAL_DATA_PATH, FieldDefault::NoText),
    FieldSpec::new(DATASET_NAME, FieldDefault::NoText),
    FieldSpec::new(STEPS, FieldDefault::Int(200)),
    FieldSpec::new(SPLIT_RATIO, FieldDefault::Float(0.1)),
    FieldSpec::new(SHOW_OOS_EACH_STEP, FieldDefault::Bool(false)),
    FieldSpec::new(CHILD_PARTITION_SIZE, FieldDefault::Ints(&[500, 50])),
    FieldSpec::new(CHILD_LEARNING_RATE, FieldDefault::Floats(&[0.01, 0.01])),
    FieldSpec::new(CHILD_ACTIVE_PARTITION_RATIO, FieldDefault::Floats(&[0.5, 0.5])),
    FieldSpec::new(CHILD_MAX_DEPTH, FieldDefault::Ints(&[0, 0])),
    FieldSpec::new(CHILD_MIN_LEAF_SIZE, FieldDefault::Ints(&[1, 1])),
    FieldSpec::new(CHILD_MINIMUM_GAIN_SPLIT, FieldDefault::Floats(&[0.0, 0.0])),
    FieldSpec::new(LOSS_INDEX, FieldDefault::Int(1)),
    FieldSpec::new(LOSS_POWER, FieldDefault::Float(2.4)),
    FieldSpec::new(COL_SUBSAMPLE_RATIO, FieldDefault::Float(1.0)),
    FieldSpec::new(RECURSIVE_FIT, FieldDefault::Bool(true)),
    FieldSpec::new(CLAMP_GRADIENT, FieldDefault::Bool(false)),
    FieldSpec::new(UPPER_VAL_SNAKE, FieldDefault::Float(0.0)),
    FieldSpec::new(LOWER_VAL_SNAKE, FieldDefault::Float(0.0)),
    FieldSpec::new(RUN_ON_TEST_DATASET, FieldDefault::Bool(true)),
];

pub static CLASSIFICATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new(DATANAME, FieldDefault::Text("sonar")),
    FieldSpec::new(LOCAL_DATA_PATH, FieldDefault::NoText),
    FieldSpec::new(DATASET_NAME, FieldDefault::NoText),
    FieldSpec::new(STEPS, FieldDefault::Int(200)),
    FieldSpec::new(NUM_TREES, FieldDefault::Int(10)),
    FieldSpec::new(SHOW_OOS_EACH_STEP, FieldDefault::Bool(false)),
    FieldSpec::new(CHILD_PARTITION_SIZE, FieldDefault::Ints(&[250])),
    FieldSpec::new(CHILD_NUM_STEPS, FieldDefault::Ints(&[1])),
    FieldSpec::new(CHILD_LEARNING_RATE, FieldDefault::Floats(&[0.01])),
    FieldSpec::new(CHILD_ACTIVE_PARTITION_RATIO, FieldDefault::Floats(&[0.5])),
    FieldSpec::new(CHILD_MAX_DEPTH, FieldDefault::Ints(&[0])),
    FieldSpec::new(CHILD_MIN_LEAF_SIZE, FieldDefault::Ints(&[1])),
    FieldSpec::new(CHILD_MINIMUM_GAIN_SPLIT, FieldDefault::Floats(&[0.0])),
    FieldSpec::with_fallbacks(LOSS_DATA, &[LOSS_FN], FieldDefault::Int(10)),
    FieldSpec::new(LOSS_POWER, FieldDefault::Float(2.4)),
    FieldSpec::new(RECURSIVE_FIT, FieldDefault::Bool(true)),
    FieldSpec::new(CLAMP_GRADIENT, FieldDefault::Bool(false)),
    FieldSpec::with_fallbacks(UPPER_VAL, &[UPPER_VAL_SNAKE], FieldDefault::Int(0)),
    FieldSpec::with_fallbacks(LOWER_VAL, &[LOWER_VAL_SNAKE], FieldDefault::Int(0)),
    FieldSpec::new(RUN_ON_TEST_DATASET, FieldDefault::Bool(true)),
];
