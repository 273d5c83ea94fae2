use super::paginate::{PAGE_SIZE, PageParams, paginate_all};
use super::retry::Retrier;
use super::transport::{Method, Transport};
use crate::error::{PlaneError, Result};
use crate::model::{Record, into_record, into_records, str_field};
use crate::resolve::WorkItemIdentifier;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Typed access to the Plane REST endpoints.
///
/// Every call is routed through the [`Retrier`]; list endpoints are drained
/// with [`paginate_all`]. Responses leave this type as [`Record`]s.
#[derive(Clone)]
pub struct PlaneClient {
    transport: Arc<dyn Transport>,
    retrier: Retrier,
}

impl PlaneClient {
    pub fn new(transport: Arc<dyn Transport>, retrier: Retrier) -> Self {
        Self { transport, retrier }
    }

    pub async fn call(
        &self,
        method: Method,
        path: String,
        query: Vec<(String, String)>,
        body: Option<Value>,
    ) -> Result<Value> {
        let transport = Arc::clone(&self.transport);
        self.retrier
            .call(move || transport.request(method, &path, &query, body.as_ref()))
            .await
    }

    async fn get_record(&self, path: String, query: Vec<(String, String)>) -> Result<Record> {
        into_record(self.call(Method::Get, path, query, None).await?)
    }

    async fn send_record(&self, method: Method, path: String, body: Value) -> Result<Record> {
        into_record(self.call(method, path, Vec::new(), Some(body)).await?)
    }

    async fn delete(&self, path: String) -> Result<()> {
        self.call(Method::Delete, path, Vec::new(), None).await?;
        Ok(())
    }

    async fn list_all(&self, path: String) -> Result<Vec<Record>> {
        let transport = Arc::clone(&self.transport);
        paginate_all(&self.retrier, move |params: &PageParams| {
            transport.request(Method::Get, &path, &params.to_query(), None)
        })
        .await
    }

    // Projects

    pub async fn list_projects(&self, workspace: &str) -> Result<Vec<Record>> {
        self.list_all(format!("workspaces/{}/projects/", workspace))
            .await
    }

    pub async fn retrieve_project(&self, workspace: &str, project_id: &str) -> Result<Record> {
        self.get_record(
            format!("workspaces/{}/projects/{}/", workspace, project_id),
            Vec::new(),
        )
        .await
    }

    pub async fn create_project(&self, workspace: &str, body: Value) -> Result<Record> {
        self.send_record(
            Method::Post,
            format!("workspaces/{}/projects/", workspace),
            body,
        )
        .await
    }

    pub async fn update_project(
        &self,
        workspace: &str,
        project_id: &str,
        body: Value,
    ) -> Result<Record> {
        self.send_record(
            Method::Patch,
            format!("workspaces/{}/projects/{}/", workspace, project_id),
            body,
        )
        .await
    }

    pub async fn delete_project(&self, workspace: &str, project_id: &str) -> Result<()> {
        self.delete(format!("workspaces/{}/projects/{}/", workspace, project_id))
            .await
    }

    // Users

    pub async fn list_members(&self, workspace: &str) -> Result<Vec<Record>> {
        let raw = self
            .call(
                Method::Get,
                format!("workspaces/{}/members/", workspace),
                Vec::new(),
                None,
            )
            .await?;
        members_from(raw)
    }

    pub async fn me(&self) -> Result<Record> {
        self.get_record("users/me/".to_string(), Vec::new()).await
    }

    // Project-scoped collections: states, labels, modules, cycles

    async fn create_in(
        &self,
        workspace: &str,
        project_id: &str,
        collection: &str,
        body: Value,
    ) -> Result<Record> {
        self.send_record(
            Method::Post,
            project_path(workspace, project_id, collection),
            body,
        )
        .await
    }

    async fn update_in(
        &self,
        workspace: &str,
        project_id: &str,
        collection: &str,
        id: &str,
        body: Value,
    ) -> Result<Record> {
        self.send_record(
            Method::Patch,
            item_path(workspace, project_id, collection, id),
            body,
        )
        .await
    }

    async fn retrieve_in(
        &self,
        workspace: &str,
        project_id: &str,
        collection: &str,
        id: &str,
    ) -> Result<Record> {
        self.get_record(item_path(workspace, project_id, collection, id), Vec::new())
            .await
    }

    async fn delete_in(
        &self,
        workspace: &str,
        project_id: &str,
        collection: &str,
        id: &str,
    ) -> Result<()> {
        self.delete(item_path(workspace, project_id, collection, id))
            .await
    }

    pub async fn list_states(&self, workspace: &str, project_id: &str) -> Result<Vec<Record>> {
        self.list_all(project_path(workspace, project_id, "states"))
            .await
    }

    pub async fn retrieve_state(
        &self,
        workspace: &str,
        project_id: &str,
        id: &str,
    ) -> Result<Record> {
        self.retrieve_in(workspace, project_id, "states", id).await
    }

    pub async fn create_state(
        &self,
        workspace: &str,
        project_id: &str,
        body: Value,
    ) -> Result<Record> {
        self.create_in(workspace, project_id, "states", body).await
    }

    pub async fn update_state(
        &self,
        workspace: &str,
        project_id: &str,
        id: &str,
        body: Value,
    ) -> Result<Record> {
        self.update_in(workspace, project_id, "states", id, body)
            .await
    }

    pub async fn delete_state(&self, workspace: &str, project_id: &str, id: &str) -> Result<()> {
        self.delete_in(workspace, project_id, "states", id).await
    }

    pub async fn list_labels(&self, workspace: &str, project_id: &str) -> Result<Vec<Record>> {
        self.list_all(project_path(workspace, project_id, "labels"))
            .await
    }

    pub async fn retrieve_label(
        &self,
        workspace: &str,
        project_id: &str,
        id: &str,
    ) -> Result<Record> {
        self.retrieve_in(workspace, project_id, "labels", id).await
    }

    pub async fn create_label(
        &self,
        workspace: &str,
        project_id: &str,
        body: Value,
    ) -> Result<Record> {
        self.create_in(workspace, project_id, "labels", body).await
    }

    pub async fn update_label(
        &self,
        workspace: &str,
        project_id: &str,
        id: &str,
        body: Value,
    ) -> Result<Record> {
        self.update_in(workspace, project_id, "labels", id, body)
            .await
    }

    pub async fn delete_label(&self, workspace: &str, project_id: &str, id: &str) -> Result<()> {
        self.delete_in(workspace, project_id, "labels", id).await
    }

    pub async fn list_modules(&self, workspace: &str, project_id: &str) -> Result<Vec<Record>> {
        self.list_all(project_path(workspace, project_id, "modules"))
            .await
    }

    pub async fn retrieve_module(
        &self,
        workspace: &str,
        project_id: &str,
        id: &str,
    ) -> Result<Record> {
        self.retrieve_in(workspace, project_id, "modules", id).await
    }

    pub async fn create_module(
        &self,
        workspace: &str,
        project_id: &str,
        body: Value,
    ) -> Result<Record> {
        self.create_in(workspace, project_id, "modules", body).await
    }

    pub async fn update_module(
        &self,
        workspace: &str,
        project_id: &str,
        id: &str,
        body: Value,
    ) -> Result<Record> {
        self.update_in(workspace, project_id, "modules", id, body)
            .await
    }

    pub async fn delete_module(&self, workspace: &str, project_id: &str, id: &str) -> Result<()> {
        self.delete_in(workspace, project_id, "modules", id).await
    }

    pub async fn add_module_work_items(
        &self,
        workspace: &str,
        project_id: &str,
        module_id: &str,
        work_item_ids: &[String],
    ) -> Result<()> {
        self.call(
            Method::Post,
            format!(
                "{}module-issues/",
                item_path(workspace, project_id, "modules", module_id)
            ),
            Vec::new(),
            Some(json!({ "issues": work_item_ids })),
        )
        .await?;
        Ok(())
    }

    pub async fn list_cycles(&self, workspace: &str, project_id: &str) -> Result<Vec<Record>> {
        self.list_all(project_path(workspace, project_id, "cycles"))
            .await
    }

    pub async fn retrieve_cycle(
        &self,
        workspace: &str,
        project_id: &str,
        id: &str,
    ) -> Result<Record> {
        self.retrieve_in(workspace, project_id, "cycles", id).await
    }

    pub async fn create_cycle(
        &self,
        workspace: &str,
        project_id: &str,
        body: Value,
    ) -> Result<Record> {
        self.create_in(workspace, project_id, "cycles", body).await
    }

    pub async fn update_cycle(
        &self,
        workspace: &str,
        project_id: &str,
        id: &str,
        body: Value,
    ) -> Result<Record> {
        self.update_in(workspace, project_id, "cycles", id, body)
            .await
    }

    pub async fn delete_cycle(&self, workspace: &str, project_id: &str, id: &str) -> Result<()> {
        self.delete_in(workspace, project_id, "cycles", id).await
    }

    pub async fn list_cycle_work_items(
        &self,
        workspace: &str,
        project_id: &str,
        cycle_id: &str,
    ) -> Result<Vec<Record>> {
        self.list_all(cycle_items_path(workspace, project_id, cycle_id))
            .await
    }

    pub async fn add_cycle_work_items(
        &self,
        workspace: &str,
        project_id: &str,
        cycle_id: &str,
        work_item_ids: &[String],
    ) -> Result<()> {
        self.call(
            Method::Post,
            cycle_items_path(workspace, project_id, cycle_id),
            Vec::new(),
            Some(json!({ "issues": work_item_ids })),
        )
        .await?;
        Ok(())
    }

    pub async fn remove_cycle_work_item(
        &self,
        workspace: &str,
        project_id: &str,
        cycle_id: &str,
        work_item_id: &str,
    ) -> Result<()> {
        self.delete(format!(
            "{}{}/",
            cycle_items_path(workspace, project_id, cycle_id),
            work_item_id
        ))
        .await
    }

    // Work items

    pub async fn list_work_items(
        &self,
        workspace: &str,
        project_id: &str,
    ) -> Result<Vec<Record>> {
        self.list_all(project_path(workspace, project_id, "work-items"))
            .await
    }

    /// Fetch one work item; `expand` asks the API to inline related objects.
    pub async fn retrieve_work_item(
        &self,
        workspace: &str,
        project_id: &str,
        id: &str,
        expand: &[&str],
    ) -> Result<Record> {
        let query = if expand.is_empty() {
            Vec::new()
        } else {
            vec![("expand".to_string(), expand.join(","))]
        };
        self.get_record(item_path(workspace, project_id, "work-items", id), query)
            .await
    }

    /// Look up `ABC-123` without knowing the project.
    pub async fn retrieve_work_item_by_identifier(
        &self,
        workspace: &str,
        identifier: &WorkItemIdentifier,
    ) -> Result<Record> {
        self.get_record(
            format!("workspaces/{}/work-items/{}/", workspace, identifier),
            Vec::new(),
        )
        .await
    }

    pub async fn create_work_item(
        &self,
        workspace: &str,
        project_id: &str,
        body: Value,
    ) -> Result<Record> {
        self.create_in(workspace, project_id, "work-items", body)
            .await
    }

    pub async fn update_work_item(
        &self,
        workspace: &str,
        project_id: &str,
        id: &str,
        body: Value,
    ) -> Result<Record> {
        self.update_in(workspace, project_id, "work-items", id, body)
            .await
    }

    pub async fn delete_work_item(
        &self,
        workspace: &str,
        project_id: &str,
        id: &str,
    ) -> Result<()> {
        self.delete_in(workspace, project_id, "work-items", id)
            .await
    }

    /// Workspace-wide text search over work items.
    pub async fn search_work_items(&self, workspace: &str, query: &str) -> Result<Vec<Record>> {
        let raw = self
            .call(
                Method::Get,
                format!("workspaces/{}/work-items/search/", workspace),
                vec![("search".to_string(), query.to_string())],
                None,
            )
            .await?;
        search_results_from(raw)
    }

    /// Estimate points in use, read off one page of work items with the
    /// estimate expanded. There is no dedicated endpoint for them.
    pub async fn estimate_points(&self, workspace: &str, project_id: &str) -> Result<Vec<Record>> {
        let raw = self
            .call(
                Method::Get,
                project_path(workspace, project_id, "work-items"),
                vec![
                    ("expand".to_string(), "estimate_point".to_string()),
                    ("per_page".to_string(), PAGE_SIZE.to_string()),
                ],
                None,
            )
            .await?;
        estimate_points_from(&raw)
    }

    // Comments

    pub async fn list_comments(
        &self,
        workspace: &str,
        project_id: &str,
        work_item_id: &str,
    ) -> Result<Vec<Record>> {
        self.list_all(comments_path(workspace, project_id, work_item_id))
            .await
    }

    pub async fn create_comment(
        &self,
        workspace: &str,
        project_id: &str,
        work_item_id: &str,
        body: Value,
    ) -> Result<Record> {
        self.send_record(
            Method::Post,
            comments_path(workspace, project_id, work_item_id),
            body,
        )
        .await
    }

    pub async fn update_comment(
        &self,
        workspace: &str,
        project_id: &str,
        work_item_id: &str,
        comment_id: &str,
        body: Value,
    ) -> Result<Record> {
        self.send_record(
            Method::Patch,
            format!(
                "{}{}/",
                comments_path(workspace, project_id, work_item_id),
                comment_id
            ),
            body,
        )
        .await
    }

    pub async fn delete_comment(
        &self,
        workspace: &str,
        project_id: &str,
        work_item_id: &str,
        comment_id: &str,
    ) -> Result<()> {
        self.delete(format!(
            "{}{}/",
            comments_path(workspace, project_id, work_item_id),
            comment_id
        ))
        .await
    }

    // Documents (pages), in a project or at workspace level

    pub async fn list_pages(&self, workspace: &str, project_id: &str) -> Result<Vec<Record>> {
        self.list_all(project_path(workspace, project_id, "pages"))
            .await
    }

    pub async fn retrieve_page(
        &self,
        workspace: &str,
        project_id: Option<&str>,
        id: &str,
    ) -> Result<Record> {
        self.get_record(
            format!("{}{}/", pages_path(workspace, project_id), id),
            Vec::new(),
        )
        .await
    }

    pub async fn create_page(
        &self,
        workspace: &str,
        project_id: Option<&str>,
        body: Value,
    ) -> Result<Record> {
        self.send_record(Method::Post, pages_path(workspace, project_id), body)
            .await
    }

    pub async fn update_page(
        &self,
        workspace: &str,
        project_id: Option<&str>,
        id: &str,
        body: Value,
    ) -> Result<Record> {
        self.send_record(
            Method::Patch,
            format!("{}{}/", pages_path(workspace, project_id), id),
            body,
        )
        .await
    }

    pub async fn delete_page(
        &self,
        workspace: &str,
        project_id: Option<&str>,
        id: &str,
    ) -> Result<()> {
        self.delete(format!("{}{}/", pages_path(workspace, project_id), id))
            .await
    }
}

fn project_path(workspace: &str, project_id: &str, collection: &str) -> String {
    format!(
        "workspaces/{}/projects/{}/{}/",
        workspace, project_id, collection
    )
}

fn item_path(workspace: &str, project_id: &str, collection: &str, id: &str) -> String {
    format!(
        "workspaces/{}/projects/{}/{}/{}/",
        workspace, project_id, collection, id
    )
}

fn comments_path(workspace: &str, project_id: &str, work_item_id: &str) -> String {
    format!(
        "{}comments/",
        item_path(workspace, project_id, "work-items", work_item_id)
    )
}

fn cycle_items_path(workspace: &str, project_id: &str, cycle_id: &str) -> String {
    format!(
        "{}cycle-issues/",
        item_path(workspace, project_id, "cycles", cycle_id)
    )
}

fn pages_path(workspace: &str, project_id: Option<&str>) -> String {
    match project_id {
        Some(project_id) => project_path(workspace, project_id, "pages"),
        None => format!("workspaces/{}/pages/", workspace),
    }
}

/// Members come back as a bare array, or as a page on some deployments.
fn members_from(raw: Value) -> Result<Vec<Record>> {
    match raw {
        Value::Array(items) => into_records(items),
        Value::Object(mut page) => match page.remove("results") {
            Some(Value::Array(items)) => into_records(items),
            _ => Err(PlaneError::Decode(
                "member listing has no results array".to_string(),
            )),
        },
        other => Err(PlaneError::Decode(format!(
            "expected a member listing, got {}",
            other
        ))),
    }
}

/// Search answers `{"issues": [...]}`; older servers use `results` or a bare array.
fn search_results_from(raw: Value) -> Result<Vec<Record>> {
    match raw {
        Value::Array(items) => into_records(items),
        Value::Object(mut body) => {
            match body.remove("issues").or_else(|| body.remove("results")) {
                Some(Value::Array(items)) => into_records(items),
                _ => Err(PlaneError::Decode(
                    "search response has no results".to_string(),
                )),
            }
        }
        other => Err(PlaneError::Decode(format!(
            "expected search results, got {}",
            other
        ))),
    }
}

/// Distinct `{id, value}` pairs from work items whose `estimate_point` is expanded.
fn estimate_points_from(raw: &Value) -> Result<Vec<Record>> {
    let items = match raw {
        Value::Array(items) => items,
        Value::Object(page) => match page.get("results") {
            Some(Value::Array(items)) => items,
            _ => return Ok(Vec::new()),
        },
        other => {
            return Err(PlaneError::Decode(format!(
                "expected a page of work items, got {}",
                other
            )));
        }
    };

    let mut points: Vec<Record> = Vec::new();
    for estimate in items.iter().filter_map(|item| item.get("estimate_point")) {
        let Value::Object(estimate) = estimate else {
            continue;
        };
        let Some(id) = str_field(estimate, "id") else {
            continue;
        };
        let value = match estimate.get("value") {
            Some(Value::String(value)) if !value.is_empty() => value.clone(),
            Some(Value::Number(value)) => value.to_string(),
            _ => continue,
        };
        if points.iter().any(|p| str_field(p, "id") == Some(id)) {
            continue;
        }
        let mut point = Map::new();
        point.insert("id".to_string(), json!(id));
        point.insert("value".to_string(), json!(value));
        points.push(point);
    }
    Ok(points)
}
