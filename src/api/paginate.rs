use super::retry::Retrier;
use crate::error::{PlaneError, Result};
use crate::model::{Record, into_records};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const PAGE_SIZE: u32 = 100;

/// Query parameters for one page of a cursor-paginated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParams {
    pub per_page: u32,
    pub cursor: Option<String>,
}

impl PageParams {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![("per_page".to_string(), self.per_page.to_string())];
        if let Some(cursor) = &self.cursor {
            query.push(("cursor".to_string(), cursor.clone()));
        }
        query
    }
}

#[derive(Debug, Default, Deserialize)]
struct Page {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    next_page_results: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

impl Page {
    /// Unpaginated endpoints answer with a bare array; treat it as the only page.
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(results) => Ok(Page {
                results,
                ..Page::default()
            }),
            Value::Object(_) => Ok(serde_json::from_value(value)?),
            Value::Null => Ok(Page::default()),
            other => Err(PlaneError::Decode(format!(
                "expected a page of results, got {}",
                other
            ))),
        }
    }
}

/// Drain a paginated list endpoint.
///
/// Each page goes through the retrier on its own, so a transient failure only
/// repeats the page that failed. Any other failure discards what was collected.
pub async fn paginate_all<F>(retrier: &Retrier, list_fn: F) -> Result<Vec<Record>>
where
    F: Fn(&PageParams) -> Result<Value> + Send + Sync + 'static,
{
    let list_fn = Arc::new(list_fn);
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let params = PageParams {
            per_page: PAGE_SIZE,
            cursor: cursor.clone(),
        };
        let fetch = Arc::clone(&list_fn);
        let raw = retrier.call(move || fetch(&params)).await?;
        let page = Page::from_value(raw)?;
        tracing::debug!(results = page.results.len(), cursor = ?cursor, "Fetched page");
        records.extend(into_records(page.results)?);

        match (page.next_page_results, page.next_cursor) {
            (true, Some(next)) => cursor = Some(next),
            _ => break,
        }
    }
    Ok(records)
}
