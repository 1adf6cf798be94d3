//! Positional argument layouts for the external fit scripts
//!
//! Each variant carries its own ordered slot list. The builder walks the list
//! and never branches on the variant itself.

use crate::dataset::DatasetResolution;
use crate::fields::{names::*, FitVariant};
use crate::normalize::{render_flag, NormalizedParameterSet, ParamValue};

/// One position (or group of positions) in an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSlot {
    /// Number of stages.
    StageCount,
    /// Per-stage sequence, flattened one argument per stage.
    Stage(&'static str),
    /// Fixed literal.
    Constant(&'static str),
    /// Effective dataset identifier from the resolution.
    DatasetId,
    /// Scalar field; booleans render as `0`/`1`.
    Scalar(&'static str),
    /// Boolean field rendered inverted (`true` -> `0`).
    InvertedFlag(&'static str),
}

pub static REGRESSION_LAYOUT: &[ArgSlot] = &[
    ArgSlot::StageCount,
    ArgSlot::Stage(CHILD_PARTITION_SIZE),
    ArgSlot::Constant("1"),
    ArgSlot::Constant("1"),
    ArgSlot::Stage(CHILD_LEARNING_RATE),
    ArgSlot::Stage(CHILD_ACTIVE_PARTITION_RATIO),
    ArgSlot::Stage(CHILD_MAX_DEPTH),
    ArgSlot::Stage(CHILD_MIN_LEAF_SIZE),
    ArgSlot::Stage(CHILD_MINIMUM_GAIN_SPLIT),
    ArgSlot::DatasetId,
    ArgSlot::Scalar(STEPS),
    ArgSlot::Scalar(LOSS_INDEX),
    ArgSlot::Scalar(LOSS_POWER),
    ArgSlot::Scalar(COL_SUBSAMPLE_RATIO),
    ArgSlot::Scalar(RECURSIVE_FIT),
    ArgSlot::Scalar(CLAMP_GRADIENT),
    ArgSlot::Scalar(UPPER_VAL_SNAKE),
    ArgSlot::Scalar(LOWER_VAL_SNAKE),
    ArgSlot::Scalar(RUN_ON_TEST_DATASET),
    ArgSlot::Scalar(SPLIT_RATIO),
];

// The second recursiveFit and the inverted run-on-test flag are part of the
// classifier script's positional contract.
pub static CLASSIFICATION_LAYOUT: &[ArgSlot] = &[
    ArgSlot::StageCount,
    ArgSlot::Stage(CHILD_PARTITION_SIZE),
    ArgSlot::Stage(CHILD_NUM_STEPS),
    ArgSlot::Stage(CHILD_LEARNING_RATE),
    ArgSlot::Stage(CHILD_ACTIVE_PARTITION_RATIO),
    ArgSlot::Stage(CHILD_MAX_DEPTH),
    ArgSlot::Stage(CHILD_MIN_LEAF_SIZE),
    ArgSlot::Stage(CHILD_MINIMUM_GAIN_SPLIT),
    ArgSlot::DatasetId,
    ArgSlot::Scalar(STEPS),
    ArgSlot::Scalar(LOSS_DATA),
    ArgSlot::Scalar(LOSS_POWER),
    ArgSlot::Scalar(RECURSIVE_FIT),
    ArgSlot::Scalar(CLAMP_GRADIENT),
    ArgSlot::Scalar(RECURSIVE_FIT),
    ArgSlot::Scalar(UPPER_VAL),
    ArgSlot::Scalar(LOWER_VAL),
    ArgSlot::InvertedFlag(RUN_ON_TEST_DATASET),
];

/// A protocol variant paired with its ordered layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationProtocol {
    RegressionInvocation,
    ClassificationInvocation,
}

impl InvocationProtocol {
    pub fn for_variant(variant: FitVariant) -> Self {
        match variant {
            FitVariant::Regression => InvocationProtocol::RegressionInvocation,
            FitVariant::Classification => InvocationProtocol::ClassificationInvocation,
        }
    }

    pub fn layout(self) -> &'static [ArgSlot] {
        match self {
            InvocationProtocol::RegressionInvocation => REGRESSION_LAYOUT,
            InvocationProtocol::ClassificationInvocation => CLASSIFICATION_LAYOUT,
        }
    }
}

pub struct ArgumentBuilder;

impl ArgumentBuilder {
    /// Emit the ordered argument vector for an already-normalized set.
    pub fn build(
        params: &NormalizedParameterSet,
        resolution: &DatasetResolution,
        variant: FitVariant,
    ) -> Vec<String> {
        let layout = InvocationProtocol::for_variant(variant).layout();
        let mut args = Vec::with_capacity(layout.len() + 6 * params.stage_count());

        for slot in layout {
            match *slot {
                ArgSlot::StageCount => args.push(params.stage_count().to_string()),
                ArgSlot::Stage(name) => {
                    if let Some(value) = params.value_or_default(name) {
                        args.extend(value.render_elements());
                    }
                }
                ArgSlot::Constant(text) => args.push(text.to_string()),
                ArgSlot::DatasetId => args.push(resolution.effective_dataset_id.clone()),
                ArgSlot::Scalar(name) => {
                    if let Some(value) = params.value_or_default(name) {
                        args.push(value.render());
                    }
                }
                ArgSlot::InvertedFlag(name) => {
                    let flag = params
                        .value_or_default(name)
                        .as_ref()
                        .and_then(ParamValue::as_bool)
                        .unwrap_or(false);
                    args.push(render_flag(!flag).to_string());
                }
            }
        }

        args
    }
}
