//! Query Description
//!
//! Backend-neutral filters, ordering and limits, interpreted by each
//! `RemoteStore` implementation.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Column equals value
    Eq(String, Value),
    /// Column is one of the values
    In(String, Vec<Value>),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::In(column, _) => column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

fn to_value(value: impl Serialize) -> Value {
    // Serializing plain ids, strings, numbers and bools cannot fail
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Serialize) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), to_value(value)));
        self
    }

    pub fn is_in<V: Serialize>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(to_value).collect();
        self.filters.push(Filter::In(column.to_string(), values));
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending: true,
        });
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending: false,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query matching a single record id
    pub fn by_id(id: uuid::Uuid) -> Self {
        Self::new().eq("id", id)
    }

    /// An `In` filter with no values can never match
    pub fn matches_nothing(&self) -> bool {
        self.filters
            .iter()
            .any(|filter| matches!(filter, Filter::In(_, values) if values.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let id = uuid::Uuid::nil();
        let query = Query::new()
            .eq("user_id", id)
            .eq("is_active", true)
            .order_desc("created_at")
            .limit(1);

        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[1], Filter::Eq("is_active".to_string(), json!(true)));
        assert!(!query.order[0].ascending);
        assert_eq!(query.limit, Some(1));
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let query = Query::new().is_in("category_id", Vec::<uuid::Uuid>::new());
        assert!(query.matches_nothing());
        assert!(!Query::new().eq("id", 1).matches_nothing());
    }
}
