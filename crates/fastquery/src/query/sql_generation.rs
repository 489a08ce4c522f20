//! Query SQL generation

use serde_json::Value;

use super::builder::QuerySpec;
use super::types::*;

/// Quote an identifier, doubling any embedded quote characters
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl QuerySpec {
    /// Generate a SELECT with `$n` placeholders and return the bound parameters
    pub fn to_sql_with_params(&self) -> (String, Vec<Value>) {
        let (sql, bindings) = self.to_sql_with_bindings();
        (sql, bindings.into_iter().map(|(_, value)| value).collect())
    }

    /// Like `to_sql_with_params`, pairing each parameter with the column it
    /// is compared against so a backend can bind it with the column's type
    pub fn to_sql_with_bindings(&self) -> (String, Vec<(String, Value)>) {
        let mut sql = String::new();
        let mut bindings = Vec::new();

        sql.push_str("SELECT * FROM ");
        sql.push_str(&quote_identifier(&self.entity));

        self.build_where_clause(&mut sql, &mut bindings);
        self.build_order_limit_clause(&mut sql);

        (sql, bindings)
    }

    /// Generate SQL without returning parameters
    pub fn to_sql(&self) -> String {
        self.to_sql_with_params().0
    }

    fn build_where_clause(&self, sql: &mut String, params: &mut Vec<(String, Value)>) {
        if self.where_conditions.is_empty() {
            return;
        }

        sql.push_str(" WHERE ");
        for (i, condition) in self.where_conditions.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }

            let column = quote_identifier(&condition.column);
            match condition.operator {
                QueryOperator::IsNull | QueryOperator::IsNotNull => {
                    sql.push_str(&format!("{} {}", column, condition.operator));
                }
                QueryOperator::In => {
                    if condition.values.is_empty() {
                        sql.push_str("FALSE");
                        continue;
                    }
                    let placeholders: Vec<String> = condition
                        .values
                        .iter()
                        .map(|value| {
                            params.push((condition.column.clone(), value.clone()));
                            format!("${}", params.len())
                        })
                        .collect();
                    sql.push_str(&format!("{} IN ({})", column, placeholders.join(", ")));
                }
                QueryOperator::Equal | QueryOperator::NotEqual => {
                    let value = condition.value.clone().unwrap_or(Value::Null);
                    params.push((condition.column.clone(), value));
                    sql.push_str(&format!("{} {} ${}", column, condition.operator, params.len()));
                }
            }
        }
    }

    fn build_order_limit_clause(&self, sql: &mut String) {
        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", quote_identifier(column), direction))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if let Some(limit) = self.limit_count {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset_value {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
    }
}
