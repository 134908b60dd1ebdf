use folio_core_types::{LanguageId, UserId};
use serde_json::{Map, Value};

use crate::errors::HydrationError;
use crate::model::{DataContext, DataSourceConfig};

/// Result of evaluating one condition expression
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionOutcome {
    pub result: bool,
    /// Evaluator-specific extra fields, copied into the debug payload
    pub fields: Map<String, Value>,
    /// Value each referenced variable resolved to
    pub variables: Map<String, Value>,
}

/// Decides whether a section is included in the output.
pub trait ConditionEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        user_id: Option<UserId>,
        section_keyword: &str,
        context: &DataContext,
    ) -> Result<ConditionOutcome, HydrationError>;
}

/// Fetches the rows behind one data-source entry.
///
/// The returned value is already shaped by the config's retrieve mode.
pub trait DataSourceGateway {
    fn fetch(
        &self,
        config: &DataSourceConfig,
        context: &DataContext,
        language_id: LanguageId,
    ) -> Result<Value, HydrationError>;
}

/// Substitutes `{{var}}` placeholders in a template.
pub trait InterpolationEngine {
    fn substitute(&self, template: &str, context: &DataContext) -> String;
}
