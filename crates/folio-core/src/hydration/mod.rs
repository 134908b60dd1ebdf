//! Hydration: re-deriving data, conditions and interpolated text over a
//! section tree for one language and one user.
//!
//! The pipeline is synchronous and owns no I/O of its own. Data retrieval,
//! condition evaluation and placeholder substitution are delegated to the
//! collaborator traits in [`collaborators`].

pub mod collaborators;
pub mod conditions;
pub mod interpolate;
pub mod pipeline;

pub use collaborators::{ConditionEvaluator, ConditionOutcome, DataSourceGateway, InterpolationEngine};
pub use conditions::JsonLogicEvaluator;
pub use interpolate::PlaceholderInterpolator;
pub use pipeline::{
    DegradedNode, HydrationOutput, HydrationPipeline, HydrationRequest, TreeSource,
};
