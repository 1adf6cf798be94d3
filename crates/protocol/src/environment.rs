//! Request-scoped environment for the external executable

use std::collections::BTreeMap;

use crate::dataset::DatasetResolution;

pub const PROJECT_ROOT_VAR: &str = "IB_PROJECT_ROOT";
pub const DATA_DIR_VAR: &str = "IB_DATA_DIR";
pub const SHOW_OOS_EACH_STEP_VAR: &str = "IB_SHOW_OOS_EACH_STEP";

pub const DEFAULT_PROJECT_ROOT: &str = "/opt/multiboost";

pub type EnvironmentMap = BTreeMap<String, String>;

/// Derives the environment handed to the executable alongside the arguments.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    project_root: String,
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new(DEFAULT_PROJECT_ROOT)
    }
}

impl InvocationContext {
    pub fn new<S: Into<String>>(project_root: S) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn project_root(&self) -> &str {
        &self.project_root
    }

    /// Copy `base` and amend it for one request. The stepwise flag is present
    /// only when enabled, even if `base` already carries it.
    pub fn build_environment(
        &self,
        base: &EnvironmentMap,
        resolution: &DatasetResolution,
    ) -> EnvironmentMap {
        let mut env = base.clone();
        env.insert(PROJECT_ROOT_VAR.to_string(), self.project_root.clone());
        env.insert(DATA_DIR_VAR.to_string(), resolution.data_root_path.clone());

        if resolution.stepwise_oos_enabled {
            env.insert(SHOW_OOS_EACH_STEP_VAR.to_string(), "1".to_string());
        } else {
            env.remove(SHOW_OOS_EACH_STEP_VAR);
        }

        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetSource;

    fn resolution(stepwise: bool) -> DatasetResolution {
        DatasetResolution {
            effective_dataset_id: "1193_BNG_lowbwt_train".into(),
            data_root_path: "/opt/data/Regression".into(),
            stepwise_oos_enabled: stepwise,
            source: DatasetSource::RegressionFamily,
        }
    }

    #[test]
    fn test_sets_roots_and_keeps_base() {
        let mut base = EnvironmentMap::new();
        base.insert("PATH".into(), "/usr/bin".into());
        base.insert(DATA_DIR_VAR.into(), "/elsewhere".into());

        let env = InvocationContext::default().build_environment(&base, &resolution(false));

        assert_eq!(env.get("PATH").map(String::as_str), Some("/usr/bin"));
        assert_eq!(env.get(PROJECT_ROOT_VAR).map(String::as_str), Some("/opt/multiboost"));
        assert_eq!(env.get(DATA_DIR_VAR).map(String::as_str), Some("/opt/data/Regression"));
        assert!(!env.contains_key(SHOW_OOS_EACH_STEP_VAR));
        assert_eq!(base.get(DATA_DIR_VAR).map(String::as_str), Some("/elsewhere"));
    }

    #[test]
    fn test_stepwise_flag_only_when_enabled() {
        let mut base = EnvironmentMap::new();
        base.insert(SHOW_OOS_EACH_STEP_VAR.into(), "0".into());
        let context = InvocationContext::new("/srv/multiboost");

        let disabled = context.build_environment(&base, &resolution(false));
        assert!(!disabled.contains_key(SHOW_OOS_EACH_STEP_VAR));

        let enabled = context.build_environment(&base, &resolution(true));
        assert_eq!(enabled.get(SHOW_OOS_EACH_STEP_VAR).map(String::as_str), Some("1"));
        assert_eq!(enabled.get(PROJECT_ROOT_VAR).map(String::as_str), Some("/srv/multiboost"));
    }
}
