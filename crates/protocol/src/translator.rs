//! Request translation
//!
//! Composes normalization, dataset resolution, argument layout and environment
//! derivation into one call. The first failing stage short-circuits with its own
//! error unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::arguments::ArgumentBuilder;
use crate::dataset::{DataRoots, DatasetResolution, DatasetResolver};
use crate::environment::{EnvironmentMap, InvocationContext, DEFAULT_PROJECT_ROOT};
use crate::errors::Result;
use crate::fields::FitVariant;
use crate::normalize::{normalize, NormalizedParameterSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorSettings {
    pub project_root: String,
    pub roots: DataRoots,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            project_root: DEFAULT_PROJECT_ROOT.to_string(),
            roots: DataRoots::default(),
        }
    }
}

/// Everything the process runner needs: positional arguments and environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationDescriptor {
    pub argument_vector: Vec<String>,
    pub environment: EnvironmentMap,
}

/// Result of a successful translation.
#[derive(Debug, Clone)]
pub struct Translation {
    pub variant: FitVariant,
    pub parameters: NormalizedParameterSet,
    pub resolution: DatasetResolution,
    pub invocation: InvocationDescriptor,
}

/// Stateless between requests; safe to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Translator {
    resolver: DatasetResolver,
    context: InvocationContext,
    base_environment: EnvironmentMap,
}

impl Translator {
    /// Translator whose base environment is the current process environment.
    /// Variables that are not valid UTF-8 are skipped.
    pub fn new(settings: TranslatorSettings) -> Self {
        let base = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self::with_base_environment(settings, base)
    }

    pub fn with_base_environment(settings: TranslatorSettings, base: EnvironmentMap) -> Self {
        Self {
            resolver: DatasetResolver::new(settings.roots),
            context: InvocationContext::new(settings.project_root),
            base_environment: base,
        }
    }

    pub fn resolver(&self) -> &DatasetResolver {
        &self.resolver
    }

    pub fn project_root(&self) -> &str {
        self.context.project_root()
    }

    pub fn translate(&self, config: &Value, variant: FitVariant) -> Result<Translation> {
        let parameters = normalize(config, variant)?;
        let resolution = self.resolver.resolve_parameters(&parameters)?;
        let argument_vector = ArgumentBuilder::build(&parameters, &resolution, variant);
        let environment = self
            .context
            .build_environment(&self.base_environment, &resolution);

        debug!(
            %variant,
            stages = parameters.stage_count(),
            args = argument_vector.len(),
            "translated fit request"
        );

        Ok(Translation {
            variant,
            parameters,
            resolution,
            invocation: InvocationDescriptor {
                argument_vector,
                environment,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{DATA_DIR_VAR, SHOW_OOS_EACH_STEP_VAR};
    use crate::errors::TranslateError;
    use serde_json::json;

    fn translator() -> Translator {
        Translator::with_base_environment(TranslatorSettings::default(), EnvironmentMap::new())
    }

    #[test]
    fn test_translate_regression_example() {
        let config = json!({
            "dataname": "1193_BNG_lowbwt_train",
            "steps": 10,
            "childPartitionSize": [500, 50],
            "childLearningRate": [0.01, 0.01],
            "childActivePartitionRatio": [0.5, 0.5],
            "childMaxDepth": [0, 0],
            "childMinLeafSize": [1, 1],
            "childMinimumGainSplit": [0.0, 0.0],
            "loss": { "index": 1 },
            "lossPower": 2.4,
            "recursiveFit": true,
            "clamp_gradient": true,
            "upper_val": -1.0,
            "lower_val": 1.0,
            "runOnTestDataset": true,
            "splitRatio": 0.0
        });

        let translation = translator().translate(&config, FitVariant::Regression).unwrap();
        let args = &translation.invocation.argument_vector;

        assert_eq!(args[0], "2");
        assert_eq!(args[15], "1193_BNG_lowbwt_train");
        assert_eq!(
            &args[16..],
            &["10", "1", "2.4", "1.0", "1", "1", "-1.0", "1.0", "1", "0.0"]
        );
        assert_eq!(
            translation.invocation.environment.get(DATA_DIR_VAR).map(String::as_str),
            Some("/opt/data/Regression")
        );
    }

    #[test]
    fn test_stepwise_flag_reaches_environment() {
        let translation = translator()
            .translate(&json!({ "showOOSEachStep": true }), FitVariant::Regression)
            .unwrap();
        assert!(translation.resolution.stepwise_oos_enabled);
        assert_eq!(
            translation
                .invocation
                .environment
                .get(SHOW_OOS_EACH_STEP_VAR)
                .map(String::as_str),
            Some("1")
        );
    }

    #[test]
    fn test_missing_local_path_short_circuits() {
        let err = translator()
            .translate(
                &json!({ "localDataPath": "/no/such/mount/data" }),
                FitVariant::Classification,
            )
            .unwrap_err();
        assert!(matches!(err, TranslateError::DatasetPathNotFound { .. }));
    }
}
