//! Query Builder - Backend-neutral description of one fetch

use serde_json::Value;

use super::types::*;

/// A filtered, ordered and optionally bounded read of one entity type
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub(crate) entity: String,
    pub(crate) where_conditions: Vec<WhereCondition>,
    pub(crate) order_by: Vec<(String, OrderDirection)>,
    pub(crate) offset_value: Option<usize>,
    pub(crate) limit_count: Option<usize>,
}

impl QuerySpec {
    /// Every row of `entity`, in the backend's natural order
    pub fn all(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            where_conditions: Vec::new(),
            order_by: Vec::new(),
            offset_value: None,
            limit_count: None,
        }
    }

    /// Add WHERE column = value
    pub fn where_eq<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.where_conditions.push(WhereCondition::eq(column, value.into()));
        self
    }

    /// Add WHERE column != value
    pub fn where_ne<T: Into<Value>>(mut self, column: &str, value: T) -> Self {
        self.where_conditions.push(WhereCondition::ne(column, value.into()));
        self
    }

    /// Add WHERE column IN (values)
    pub fn where_in<T: Into<Value>>(mut self, column: &str, values: Vec<T>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.where_conditions.push(WhereCondition::is_in(column, values));
        self
    }

    /// Add WHERE column IS NULL
    pub fn where_null(mut self, column: &str) -> Self {
        self.where_conditions.push(WhereCondition::null(column));
        self
    }

    /// Add WHERE column IS NOT NULL
    pub fn where_not_null(mut self, column: &str) -> Self {
        self.where_conditions.push(WhereCondition::not_null(column));
        self
    }

    /// Add ORDER BY column ASC
    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by.push((column.to_string(), OrderDirection::Asc));
        self
    }

    /// Add ORDER BY column DESC
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.order_by.push((column.to_string(), OrderDirection::Desc));
        self
    }

    /// Add OFFSET clause
    pub fn offset(mut self, count: usize) -> Self {
        self.offset_value = Some(count);
        self
    }

    /// Add LIMIT clause
    pub fn limit(mut self, count: usize) -> Self {
        self.limit_count = Some(count);
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn conditions(&self) -> &[WhereCondition] {
        &self.where_conditions
    }

    pub fn ordering(&self) -> &[(String, OrderDirection)] {
        &self.order_by
    }

    pub fn offset_value(&self) -> Option<usize> {
        self.offset_value
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit_count
    }

    /// Whether the query can only ever return zero rows
    pub fn is_empty_set(&self) -> bool {
        self.limit_count == Some(0)
            || self
                .where_conditions
                .iter()
                .any(|cond| cond.operator == QueryOperator::In && cond.values.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_spec_building() {
        let query = QuerySpec::all("users")
            .where_eq("active", true)
            .where_in("location_id", vec![1, 2])
            .order_by_desc("id")
            .offset(5)
            .limit(10);

        assert_eq!(query.entity(), "users");
        assert_eq!(query.conditions().len(), 2);
        assert_eq!(query.conditions()[1].values, vec![json!(1), json!(2)]);
        assert_eq!(query.ordering(), &[("id".to_string(), OrderDirection::Desc)]);
        assert_eq!(query.offset_value(), Some(5));
        assert_eq!(query.limit_value(), Some(10));
    }

    #[test]
    fn test_empty_set_detection() {
        assert!(!QuerySpec::all("users").is_empty_set());
        assert!(QuerySpec::all("users").limit(0).is_empty_set());
        assert!(QuerySpec::all("users").where_in::<i64>("id", vec![]).is_empty_set());
    }
}
