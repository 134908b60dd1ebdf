//! Recursive hydration of a section tree.
//!
//! Each node is processed in a fixed order:
//!
//! 1. interpolate its data-source configs with the parent's context
//! 2. fetch each data source (a failing entry is skipped, not fatal)
//! 3. merge the fetched data over the parent's context
//! 4. interpolate content fields with the merged context
//! 5. evaluate the condition
//! 6. recurse into children on pass; keep an empty debug shell on fail when
//!    the node has `debug` set; otherwise drop the subtree
//!
//! Children see the merged context of their parent, which is how a child
//! filter such as `record_id={{parent.record_id}}` resolves.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use folio_core_types::schema::EVENT_DEGRADED;
use folio_core_types::{LanguageId, UserId};
use serde_json::{Map, Value};

use super::collaborators::{ConditionEvaluator, DataSourceGateway, InterpolationEngine};
use super::conditions::JsonLogicEvaluator;
use super::interpolate::PlaceholderInterpolator;
use crate::errors::{ExError, HydrationError};
use crate::model::{
    ConditionDebug, ContentField, DataContext, DataSourceConfig, Document, HydratedDocument,
    HydratedSection, SectionNode,
};
use crate::{log_op_end, log_op_start};

pub const CONTEXT_KEYWORD: &str = "__keyword__";
pub const CONTEXT_LANGUAGE_ID: &str = "__language_id__";
pub const CONTEXT_USER_ID: &str = "__user_id__";

/// Where the tree being hydrated came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeSource {
    /// Live draft; content fields are already in the target language
    Draft,
    /// Version snapshot; `translations` are collapsed for the target language
    Stored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HydrationRequest {
    pub language_id: LanguageId,
    pub user_id: Option<UserId>,
    pub source: TreeSource,
}

/// A per-node failure that was absorbed during hydration
#[derive(Debug, Clone, PartialEq)]
pub struct DegradedNode {
    pub section_id: i64,
    pub error: HydrationError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HydrationOutput {
    pub document: HydratedDocument,
    /// Sections whose condition passed, pre-order
    pub passed_sections: Vec<i64>,
    pub degraded: Vec<DegradedNode>,
    /// Interpolated table names that were queried, including failed fetches
    pub tables: BTreeSet<String>,
}

/// Walks a [`Document`] and produces a [`HydratedDocument`].
///
/// Request-scoped: it borrows its collaborators, so a gateway holding a
/// connection can be plugged in without sharing it across workers.
#[derive(Clone, Copy)]
pub struct HydrationPipeline<'a> {
    conditions: &'a dyn ConditionEvaluator,
    data: &'a dyn DataSourceGateway,
    interpolator: &'a dyn InterpolationEngine,
}

impl std::fmt::Debug for HydrationPipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HydrationPipeline").finish_non_exhaustive()
    }
}

/// Mutable state shared across one walk
struct Walk<'r> {
    request: &'r HydrationRequest,
    page_id: i64,
    passed: Vec<i64>,
    degraded: Vec<DegradedNode>,
    tables: BTreeSet<String>,
}

impl Walk<'_> {
    fn degrade(&mut self, section_id: i64, error: HydrationError) {
        let ex: ExError = error.clone().into();
        tracing::warn!(
            event = EVENT_DEGRADED,
            page_id = self.page_id,
            section_id,
            err_code = ex.code(),
            "{}",
            error
        );
        self.degraded.push(DegradedNode { section_id, error });
    }
}

impl<'a> HydrationPipeline<'a> {
    /// Pipeline with the default JSON-Logic evaluator and placeholder engine
    pub fn new(data: &'a dyn DataSourceGateway) -> Self {
        Self {
            conditions: &JsonLogicEvaluator,
            data,
            interpolator: &PlaceholderInterpolator,
        }
    }

    pub fn with_conditions(mut self, conditions: &'a dyn ConditionEvaluator) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_interpolator(mut self, interpolator: &'a dyn InterpolationEngine) -> Self {
        self.interpolator = interpolator;
        self
    }

    /// Hydrate `document` for one language and user.
    ///
    /// Never fails: per-node problems are logged and listed in
    /// [`HydrationOutput::degraded`].
    pub fn hydrate(&self, document: &Document, request: &HydrationRequest) -> HydrationOutput {
        let start = Instant::now();
        let page_id = document.page_id().get();
        log_op_start!("hydrate", page_id = page_id, language_id = request.language_id.get());

        let mut root = DataContext::new();
        root.insert(
            CONTEXT_KEYWORD.to_string(),
            Value::String(document.metadata.keyword.clone()),
        );
        root.insert(
            CONTEXT_LANGUAGE_ID.to_string(),
            Value::from(request.language_id.get()),
        );
        root.insert(
            CONTEXT_USER_ID.to_string(),
            request
                .user_id
                .map(|u| Value::from(u.get()))
                .unwrap_or(Value::Null),
        );

        let mut walk = Walk {
            request,
            page_id,
            passed: Vec::new(),
            degraded: Vec::new(),
            tables: BTreeSet::new(),
        };
        let sections = self.hydrate_nodes(&document.sections, &root, &mut walk);

        log_op_end!(
            "hydrate",
            duration_ms = start.elapsed().as_millis() as u64,
            page_id = page_id,
            degraded = walk.degraded.len()
        );

        HydrationOutput {
            document: HydratedDocument {
                metadata: document.metadata.clone(),
                language_id: request.language_id,
                sections,
            },
            passed_sections: walk.passed,
            degraded: walk.degraded,
            tables: walk.tables,
        }
    }

    fn hydrate_nodes(
        &self,
        nodes: &[SectionNode],
        parent: &DataContext,
        walk: &mut Walk<'_>,
    ) -> Vec<HydratedSection> {
        nodes
            .iter()
            .filter_map(|node| self.hydrate_node(node, parent, walk))
            .collect()
    }

    fn hydrate_node(
        &self,
        node: &SectionNode,
        parent: &DataContext,
        walk: &mut Walk<'_>,
    ) -> Option<HydratedSection> {
        let language_id = walk.request.language_id;

        // 1 + 2: configs see the parent's context, never this node's own data
        let mut data = Map::new();
        for (index, config) in node.data_sources.iter().enumerate() {
            let config = self.interpolate_config(config, parent);
            walk.tables.insert(config.table.clone());
            match self.data.fetch(&config, parent, language_id) {
                Ok(value) => {
                    data.insert(config.context_key(index), value);
                }
                Err(err) => walk.degrade(node.id, err.for_section(node.id)),
            }
        }

        // 3
        let mut merged = parent.clone();
        merged.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));

        // 4
        let content_fields = self.interpolate_fields(node, language_id, walk.request.source, &merged);

        // 5
        let (passed, condition_debug) = match node.condition.as_deref() {
            None => (true, None),
            Some(expression) => {
                match self
                    .conditions
                    .evaluate(expression, walk.request.user_id, &node.keyword, &merged)
                {
                    Ok(outcome) => {
                        let result = outcome.result;
                        // captured for every evaluation, attached to debug nodes only
                        let debug = ConditionDebug {
                            result,
                            expression: Some(self.interpolator.substitute(expression, &merged)),
                            variables: outcome.variables,
                            fields: outcome.fields,
                            error: None,
                        };
                        (result, node.debug.then_some(debug))
                    }
                    Err(err) => {
                        walk.degrade(node.id, err.for_section(node.id));
                        return None;
                    }
                }
            }
        };

        // 6
        let children = if passed {
            walk.passed.push(node.id);
            self.hydrate_nodes(&node.children, &merged, walk)
        } else if node.debug {
            Vec::new()
        } else {
            return None;
        };

        Some(HydratedSection {
            id: node.id,
            keyword: node.keyword.clone(),
            style_kind: node.style_kind.clone(),
            position: node.position,
            content_fields,
            data,
            condition_debug,
            children,
        })
    }

    fn interpolate_config(&self, config: &DataSourceConfig, context: &DataContext) -> DataSourceConfig {
        DataSourceConfig {
            table: self.interpolator.substitute(&config.table, context),
            scope: config.scope.clone(),
            retrieve: config.retrieve,
            filter: config
                .filter
                .as_deref()
                .map(|f| self.interpolator.substitute(f, context)),
            params: config
                .params
                .iter()
                .map(|(k, v)| (k.clone(), self.interpolate_value(v, context)))
                .collect(),
        }
    }

    fn interpolate_value(&self, value: &Value, context: &DataContext) -> Value {
        match value {
            Value::String(s) => Value::String(self.interpolator.substitute(s, context)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.interpolate_value(v, context))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.interpolate_value(v, context)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn interpolate_fields(
        &self,
        node: &SectionNode,
        language_id: LanguageId,
        source: TreeSource,
        context: &DataContext,
    ) -> BTreeMap<String, ContentField> {
        let mut fields = node.content_fields.clone();
        if source == TreeSource::Stored {
            if let Some(overrides) = node.translations.get(&language_id) {
                fields.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        for field in fields.values_mut() {
            field.content = self.interpolator.substitute(&field.content, context);
        }
        fields
    }
}
