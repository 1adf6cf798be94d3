//! MultiBoost fit protocol
//!
//! Translates a loosely shaped fit configuration into the exact positional
//! argument vector and environment expected by the MultiBoost fit scripts:
//! - declarative field tables with defaults per protocol variant
//! - normalization with scalar broadcast and stage arity checks
//! - dataset root selection from dataset-name heuristics or a local path
//! - ordered argument layouts for the regression and classification scripts

pub mod arguments;
pub mod dataset;
pub mod environment;
pub mod errors;
pub mod fields;
pub mod normalize;
pub mod translator;

pub use arguments::{ArgSlot, ArgumentBuilder, InvocationProtocol};
pub use dataset::{DataRoots, DatasetResolution, DatasetResolver, DatasetSource};
pub use environment::{EnvironmentMap, InvocationContext};
pub use errors::TranslateError;
pub use fields::{FieldDefault, FieldKind, FieldSpec, FitVariant};
pub use normalize::{normalize, NormalizedParameterSet, ParamValue, ParameterNormalizer};
pub use translator::{InvocationDescriptor, Translation, Translator, TranslatorSettings};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
