//! Default condition evaluator: a JSON-Logic subset.
//!
//! Supported operators: `var`, `==`, `!=`, `===`, `!==`, `<`, `<=`, `>`,
//! `>=`, `and`, `or`, `!`, `!!`, `in`, `if`. The data the expression sees is
//! the merged section context plus `__user_id__` and `__keyword__`.

use folio_core_types::UserId;
use serde_json::{Map, Value};

use super::collaborators::{ConditionEvaluator, ConditionOutcome};
use super::interpolate::lookup_path;
use crate::errors::HydrationError;
use crate::model::DataContext;

pub const USER_ID_VAR: &str = "__user_id__";
pub const KEYWORD_VAR: &str = "__keyword__";

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLogicEvaluator;

impl JsonLogicEvaluator {
    /// Parse expression text into a rule without evaluating it
    ///
    /// # Errors
    ///
    /// `InvalidCondition` when the text is not JSON.
    pub fn parse(expression: &str) -> Result<Value, HydrationError> {
        serde_json::from_str(expression).map_err(|e| HydrationError::InvalidCondition {
            reason: format!("expression is not valid JSON: {}", e),
        })
    }
}

impl ConditionEvaluator for JsonLogicEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        user_id: Option<UserId>,
        section_keyword: &str,
        context: &DataContext,
    ) -> Result<ConditionOutcome, HydrationError> {
        let rule = Self::parse(expression)?;

        let mut data = context.clone();
        data.insert(
            USER_ID_VAR.to_string(),
            user_id.map(|u| Value::from(u.get())).unwrap_or(Value::Null),
        );
        data.insert(
            KEYWORD_VAR.to_string(),
            Value::String(section_keyword.to_string()),
        );

        let mut eval = Evaluation {
            data: &data,
            variables: Map::new(),
        };
        let value = eval
            .apply(&rule)
            .map_err(|reason| HydrationError::InvalidCondition { reason })?;

        let mut fields = Map::new();
        fields.insert("value".to_string(), value.clone());
        Ok(ConditionOutcome {
            result: truthy(&value),
            fields,
            variables: eval.variables,
        })
    }
}

struct Evaluation<'a> {
    data: &'a DataContext,
    variables: Map<String, Value>,
}

impl Evaluation<'_> {
    fn apply(&mut self, rule: &Value) -> Result<Value, String> {
        match rule {
            Value::Array(items) => items
                .iter()
                .map(|item| self.apply(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) if map.len() == 1 => {
                let (op, raw_args) = map.iter().next().ok_or("empty rule")?;
                let args: Vec<&Value> = match raw_args {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                self.operator(op, &args)
            }
            Value::Object(_) => Err("rule objects must have exactly one operator".to_string()),
            literal => Ok(literal.clone()),
        }
    }

    fn arg(&mut self, args: &[&Value], index: usize) -> Result<Value, String> {
        match args.get(index) {
            Some(rule) => self.apply(rule),
            None => Ok(Value::Null),
        }
    }

    fn operator(&mut self, op: &str, args: &[&Value]) -> Result<Value, String> {
        match op {
            "var" => self.var(args),
            "==" | "!=" | "===" | "!==" => {
                let a = self.arg(args, 0)?;
                let b = self.arg(args, 1)?;
                let equal = if op.len() == 3 {
                    a == b
                } else {
                    loose_equals(&a, &b)
                };
                Ok(Value::Bool(equal == op.starts_with('=')))
            }
            "<" | "<=" | ">" | ">=" => {
                let values = args
                    .iter()
                    .map(|a| self.apply(a))
                    .collect::<Result<Vec<_>, _>>()?;
                if values.len() < 2 {
                    return Err(format!("'{}' needs at least two arguments", op));
                }
                // `{"<": [a, b, c]}` is the between form a < b < c
                let holds = values
                    .windows(2)
                    .all(|pair| compare(op, &pair[0], &pair[1]));
                Ok(Value::Bool(holds))
            }
            "and" => {
                let mut last = Value::Bool(true);
                for rule in args {
                    last = self.apply(rule)?;
                    if !truthy(&last) {
                        break;
                    }
                }
                Ok(last)
            }
            "or" => {
                let mut last = Value::Bool(false);
                for rule in args {
                    last = self.apply(rule)?;
                    if truthy(&last) {
                        break;
                    }
                }
                Ok(last)
            }
            "!" => Ok(Value::Bool(!truthy(&self.arg(args, 0)?))),
            "!!" => Ok(Value::Bool(truthy(&self.arg(args, 0)?))),
            "in" => {
                let needle = self.arg(args, 0)?;
                let haystack = self.arg(args, 1)?;
                let found = match (&needle, &haystack) {
                    (Value::String(n), Value::String(h)) => h.contains(n.as_str()),
                    (_, Value::Array(items)) => items.iter().any(|i| i == &needle),
                    _ => false,
                };
                Ok(Value::Bool(found))
            }
            "if" => {
                let mut i = 0;
                while i + 1 < args.len() {
                    if truthy(&self.apply(args[i])?) {
                        return self.apply(args[i + 1]);
                    }
                    i += 2;
                }
                self.arg(args, i)
            }
            other => Err(format!("unsupported operator '{}'", other)),
        }
    }

    fn var(&mut self, args: &[&Value]) -> Result<Value, String> {
        let path = match self.arg(args, 0)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Null => String::new(),
            other => return Err(format!("var path must be a string, got {}", other)),
        };
        let resolved = if path.is_empty() {
            Some(Value::Object(self.data.clone()))
        } else {
            lookup_path(self.data, &path).cloned()
        };
        let value = match resolved {
            Some(v) => v,
            None => self.arg(args, 1)?,
        };
        self.variables.insert(path, value.clone());
        Ok(value)
    }
}

/// JSON-Logic truthiness
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        _ => None,
    }
}

fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => a == b,
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

fn compare(op: &str, a: &Value, b: &Value) -> bool {
    let ordering = match (a, b) {
        (Value::String(x), Value::String(y)) => x.partial_cmp(y),
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    };
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        "<" => ordering.is_lt(),
        "<=" => ordering.is_le(),
        ">" => ordering.is_gt(),
        _ => ordering.is_ge(),
    }
}
