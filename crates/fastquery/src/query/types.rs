//! Query Types - Conditions and ordering understood by every backend

use std::fmt;
use serde_json::Value;

/// Query operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    In,
    IsNull,
    IsNotNull,
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperator::Equal => write!(f, "="),
            QueryOperator::NotEqual => write!(f, "!="),
            QueryOperator::In => write!(f, "IN"),
            QueryOperator::IsNull => write!(f, "IS NULL"),
            QueryOperator::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// Where clause condition
#[derive(Debug, Clone, PartialEq)]
pub struct WhereCondition {
    pub column: String,
    pub operator: QueryOperator,
    pub value: Option<Value>,
    pub values: Vec<Value>, // For IN
}

impl WhereCondition {
    pub fn eq(column: &str, value: Value) -> Self {
        Self {
            column: column.to_string(),
            operator: QueryOperator::Equal,
            value: Some(value),
            values: Vec::new(),
        }
    }

    pub fn ne(column: &str, value: Value) -> Self {
        Self {
            column: column.to_string(),
            operator: QueryOperator::NotEqual,
            value: Some(value),
            values: Vec::new(),
        }
    }

    pub fn is_in(column: &str, values: Vec<Value>) -> Self {
        Self {
            column: column.to_string(),
            operator: QueryOperator::In,
            value: None,
            values,
        }
    }

    pub fn null(column: &str) -> Self {
        Self {
            column: column.to_string(),
            operator: QueryOperator::IsNull,
            value: None,
            values: Vec::new(),
        }
    }

    pub fn not_null(column: &str) -> Self {
        Self {
            column: column.to_string(),
            operator: QueryOperator::IsNotNull,
            value: None,
            values: Vec::new(),
        }
    }

    /// Evaluate the condition against a field value (`None` when absent)
    pub fn matches(&self, field: Option<&Value>) -> bool {
        let field = field.unwrap_or(&Value::Null);
        match self.operator {
            QueryOperator::Equal => !field.is_null() && self.value.as_ref() == Some(field),
            QueryOperator::NotEqual => !field.is_null() && self.value.as_ref() != Some(field),
            QueryOperator::In => !field.is_null() && self.values.contains(field),
            QueryOperator::IsNull => field.is_null(),
            QueryOperator::IsNotNull => !field.is_null(),
        }
    }
}

/// Order by direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}
