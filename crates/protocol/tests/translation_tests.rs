//! End-to-end translation tests for both fit protocols.

use anyhow::Result;
use multiboost_protocol::environment::{DATA_DIR_VAR, PROJECT_ROOT_VAR};
use multiboost_protocol::{
    normalize, DataRoots, EnvironmentMap, FieldDefault, FitVariant, ParamValue, TranslateError,
    Translator, TranslatorSettings,
};
use serde_json::json;
use tempfile::TempDir;

fn translator() -> Translator {
    Translator::with_base_environment(TranslatorSettings::default(), EnvironmentMap::new())
}

#[test]
fn test_every_omitted_scalar_takes_its_default() -> Result<()> {
    for variant in [FitVariant::Regression, FitVariant::Classification] {
        let params = normalize(&json!({}), variant)?;
        for spec in variant.fields() {
            let expected = match spec.default {
                FieldDefault::Int(v) => Some(ParamValue::Int(v)),
                FieldDefault::Float(v) => Some(ParamValue::Float(v)),
                FieldDefault::Bool(v) => Some(ParamValue::Bool(v)),
                FieldDefault::Text(v) => Some(ParamValue::Text(v.to_string())),
                FieldDefault::Ints(v) => Some(ParamValue::IntSeq(v.to_vec())),
                FieldDefault::Floats(v) => Some(ParamValue::FloatSeq(v.to_vec())),
                FieldDefault::NoText => None,
            };
            assert_eq!(params.get(spec.name), expected.as_ref(), "{variant}: {}", spec.name);
        }
    }
    Ok(())
}

#[test]
fn test_unknown_keys_are_ignored() -> Result<()> {
    let config = json!({
        "useWeights": false,
        "serializeModel": true,
        "quietRun": true,
        "depth": 0
    });
    let with_extras = normalize(&config, FitVariant::Regression)?;
    let plain = normalize(&json!({}), FitVariant::Regression)?;
    assert_eq!(with_extras, plain);
    Ok(())
}

#[test]
fn test_regression_marker_wins_regardless_of_other_fields() -> Result<()> {
    let translation = translator().translate(
        &json!({
            "dataname": "/opt/data/custom_BNG_lowbwt_copy",
            "showOOSEachStep": true,
            "steps": 3
        }),
        FitVariant::Regression,
    )?;

    assert_eq!(translation.resolution.data_root_path, "/opt/data/Regression");
    assert_eq!(
        translation.invocation.environment.get(DATA_DIR_VAR).map(String::as_str),
        Some("/opt/data/Regression")
    );
    Ok(())
}

#[test]
fn test_full_client_payload_translates_for_both_variants() -> Result<()> {
    // Shape used by the bundled client scripts; carries fields for both scripts.
    let payload = json!({
        "steps": 10,
        "recursiveFit": true,
        "useWeights": false,
        "rowSubsampleRatio": 1.0,
        "colSubsampleRatio": 1.0,
        "loss": { "index": 1, "data": 1 },
        "lossPower": 2.4,
        "clamp_gradient": true,
        "upper_val": -1.0,
        "lower_val": 1.0,
        "numTrees": 10,
        "childPartitionSize": [500, 50],
        "childNumSteps": [1, 1],
        "childLearningRate": [0.01, 0.01],
        "childActivePartitionRatio": [0.5, 0.5],
        "childMinLeafSize": [1, 1],
        "childMinimumGainSplit": [0.0, 0.0],
        "childMaxDepth": [0, 0],
        "serializeModel": true,
        "dataname": "1193_BNG_lowbwt_train"
    });

    let regression = translator().translate(&payload, FitVariant::Regression)?;
    assert_eq!(regression.invocation.argument_vector.len(), 26);

    let classification = translator().translate(&payload, FitVariant::Classification)?;
    let args = &classification.invocation.argument_vector;
    assert_eq!(args[0], "2");
    assert_eq!(&args[1..5], &["500", "50", "1", "1"]);
    // loss.data, then recursiveFit twice around clamp_gradient, then truncated bounds.
    assert_eq!(
        &args[15..],
        &["1193_BNG_lowbwt_train", "10", "1", "2.4", "1", "1", "1", "-1", "1", "0"]
    );
    Ok(())
}

#[test]
fn test_local_path_never_reaches_builder_when_missing() {
    let err = translator()
        .translate(
            &json!({ "localDataPath": "/nowhere/to/be/found", "childPartitionSize": [1, 2] }),
            FitVariant::Regression,
        )
        .unwrap_err();
    assert_eq!(err.kind(), "dataset_path_not_found");
}

#[test]
fn test_arity_is_checked_before_dataset_resolution() {
    let err = translator()
        .translate(
            &json!({ "localDataPath": "/nowhere/to/be/found", "childPartitionSize": [1, 2, 3] }),
            FitVariant::Regression,
        )
        .unwrap_err();
    assert!(matches!(err, TranslateError::StageArityMismatch { .. }));
}

#[test]
fn test_local_path_with_custom_roots() -> Result<()> {
    let mount = TempDir::new()?;
    let translator = Translator::with_base_environment(
        TranslatorSettings {
            project_root: "/srv/multiboost".into(),
            roots: DataRoots {
                data_root: "/srv/data".into(),
                regression_data_root: "/srv/data/Regression".into(),
                regression_marker: "BNG_lowbwt".into(),
            },
        },
        EnvironmentMap::new(),
    );

    let local = mount.path().to_string_lossy().into_owned();
    let translation = translator.translate(
        &json!({ "localDataPath": local, "datasetName": "wine_train" }),
        FitVariant::Classification,
    )?;

    let expected_id = mount.path().join("wine_train").to_string_lossy().into_owned();
    assert_eq!(translation.invocation.argument_vector[8], expected_id);
    assert_eq!(
        translation.invocation.environment.get(DATA_DIR_VAR).map(String::as_str),
        Some("/srv/data")
    );
    assert_eq!(
        translation.invocation.environment.get(PROJECT_ROOT_VAR).map(String::as_str),
        Some("/srv/multiboost")
    );
    Ok(())
}
