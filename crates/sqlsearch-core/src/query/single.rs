//! Single-table SELECT.

use super::maker::QueryMaker;
use super::request::SearchRequest;
use crate::error::Result;
use crate::sql::Select;

/// Request builder for a single-table statement.
#[derive(Debug, Clone)]
pub struct DefaultQueryAction {
    select: Select,
}

impl DefaultQueryAction {
    /// Wraps a statement.
    #[must_use]
    pub fn new(select: Select) -> Self {
        Self { select }
    }

    /// The wrapped statement.
    #[must_use]
    pub fn select(&self) -> &Select {
        &self.select
    }

    /// Compiles the statement into one search request.
    ///
    /// Relevance-ordered statements keep a scoring query; everything else
    /// runs in filter mode.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPredicate` if the filter does not compile.
    pub fn to_request(&self) -> Result<SearchRequest> {
        let table = &self.select.table;
        let filter_mode = !self.select.orders_by_score();
        let query = QueryMaker::compile_optional(table.where_clause.as_ref(), filter_mode)?;

        let mut request = SearchRequest::new(&table.index, query)
            .with_source(table.fields.iter().cloned())
            .with_sort(self.select.order_by.clone());
        if let Some(from) = self.select.offset {
            request = request.with_from(from);
        }
        if let Some(size) = self.select.limit {
            request = request.with_size(size);
        }
        Ok(request)
    }

    /// Pretty JSON of the request body.
    ///
    /// # Errors
    ///
    /// See [`DefaultQueryAction::to_request`].
    pub fn explain(&self) -> Result<String> {
        self.to_request()?.explain()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::sql::{Condition, OrderBy, SortOrder, TableRef};

    fn select(order_by: Vec<OrderBy>) -> Select {
        Select {
            table: TableRef::new("accounts", "a").with_where(Condition::eq("gender", "m")),
            offset: None,
            limit: Some(10),
            order_by,
        }
    }

    #[test]
    fn test_unordered_select_uses_filter_mode() {
        let request = DefaultQueryAction::new(select(vec![])).to_request().unwrap();

        assert_eq!(
            request.body(),
            json!({
                "query": { "bool": { "filter": [
                    { "bool": { "must": [ { "term": { "gender": "m" } } ] } }
                ] } },
                "size": 10
            })
        );
    }

    #[test]
    fn test_score_ordered_select_scores() {
        let order = vec![OrderBy {
            field: "_score".to_string(),
            order: SortOrder::Desc,
        }];
        let request = DefaultQueryAction::new(select(order)).to_request().unwrap();

        let body = request.body();
        assert_eq!(body["query"]["bool"]["must"][0], json!({ "term": { "gender": "m" } }));
        assert!(body["query"]["bool"].get("filter").is_none());
        assert_eq!(body["sort"], json!([ { "_score": { "order": "desc" } } ]));
    }

    #[test]
    fn test_explain_is_stable() {
        let action = DefaultQueryAction::new(select(vec![]));
        assert_eq!(action.explain().unwrap(), action.explain().unwrap());
    }
}
