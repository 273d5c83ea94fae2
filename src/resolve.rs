//! Turn user-supplied queries into remote records.
//!
//! Every resource kind is resolved with the same tiers, tried in order:
//!
//! 1. a canonical UUID is fetched directly by ID
//! 2. for work items, an `ABC-123` identifier is fetched without project context
//! 3. anything else is fuzzy-matched against the (cached) listing
//!
//! Projects additionally accept their short identifier, and report "did you
//! mean" suggestions when nothing matches.

use crate::api::PlaneClient;
use crate::error::{PlaneError, Result};
use crate::fuzzy::{MIN_MATCH_SCORE, SUGGESTION_SCORE, find_best_match, find_matches};
use crate::model::{Record, ResourceKind, record_id, related_id, str_field, user_display_name};
use crate::session::Session;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Related objects inlined when fetching a single work item.
pub const WORK_ITEM_EXPAND: &[&str] = &["state", "labels", "assignees", "project"];

const MAX_SUGGESTIONS: usize = 3;

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([A-Z]{1,10})-(\d+)$").unwrap());

pub fn is_uuid(value: &str) -> bool {
    UUID_PATTERN.is_match(value)
}

/// A work item reference such as `FE-42`: project short code plus sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItemIdentifier {
    /// Upper-cased project identifier.
    pub project: String,
    pub sequence: u64,
}

impl fmt::Display for WorkItemIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.project, self.sequence)
    }
}

pub fn parse_identifier(value: &str) -> Option<WorkItemIdentifier> {
    let captures = IDENTIFIER_PATTERN.captures(value.trim())?;
    Some(WorkItemIdentifier {
        project: captures[1].to_uppercase(),
        sequence: captures[2].parse().ok()?,
    })
}

/// Map a 404 from a direct lookup to a typed not-found error; anything else passes through.
fn not_found_on_404(kind: ResourceKind, query: &str) -> impl FnOnce(PlaneError) -> PlaneError {
    move |err| match err.status() {
        Some(404) => PlaneError::not_found(kind, query),
        _ => err,
    }
}

fn name_of(record: &Record) -> String {
    str_field(record, "name").unwrap_or_default().to_string()
}

fn best_by_name(kind: ResourceKind, query: &str, candidates: &[Record]) -> Result<Record> {
    find_best_match(query, candidates, name_of, MIN_MATCH_SCORE)
        .map(|m| m.item.clone())
        .ok_or_else(|| PlaneError::not_found(kind, query))
}

/// Resolves queries against one [`Session`].
pub struct Resolver<'a> {
    session: &'a Session,
}

impl<'a> Resolver<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    fn client(&self) -> PlaneClient {
        self.session.client()
    }

    pub async fn project(&self, query: &str, workspace: &str) -> Result<Record> {
        if is_uuid(query) {
            return self
                .client()
                .retrieve_project(workspace, query)
                .await
                .map_err(not_found_on_404(ResourceKind::Project, query));
        }

        let projects = self.session.cached_projects(workspace).await?;

        if let Some(project) = projects.iter().find(|p| {
            str_field(p, "identifier").is_some_and(|ident| ident.eq_ignore_ascii_case(query))
        }) {
            return Ok(project.clone());
        }

        if let Some(found) = find_best_match(query, &projects, name_of, MIN_MATCH_SCORE) {
            tracing::debug!(
                query,
                matched = %found.matched_value,
                score = found.score,
                "Fuzzy project match"
            );
            return Ok(found.item.clone());
        }

        let suggestions = find_matches(query, &projects, name_of, MAX_SUGGESTIONS, SUGGESTION_SCORE)
            .into_iter()
            .map(|m| m.matched_value)
            .collect();
        Err(PlaneError::NotFound {
            kind: ResourceKind::Project,
            query: query.to_string(),
            suggestions,
        })
    }

    /// Resolve a work item, scoped to `project_id` when one is known.
    pub async fn work_item(
        &self,
        query: &str,
        workspace: &str,
        project_id: Option<&str>,
    ) -> Result<Record> {
        if let Some(identifier) = parse_identifier(query) {
            return self
                .client()
                .retrieve_work_item_by_identifier(workspace, &identifier)
                .await
                .map_err(not_found_on_404(ResourceKind::WorkItem, query));
        }

        let Some(project_id) = project_id else {
            return self
                .work_item_across_projects(query, workspace)
                .await
                .map(|(record, _)| record);
        };

        if is_uuid(query) {
            return self
                .client()
                .retrieve_work_item(workspace, project_id, query, WORK_ITEM_EXPAND)
                .await
                .map_err(not_found_on_404(ResourceKind::WorkItem, query));
        }

        let items = self.session.cached_work_items(workspace, project_id).await?;
        best_by_name(ResourceKind::WorkItem, query, &items)
    }

    /// Resolve a work item with no project context, returning it with its project ID.
    ///
    /// Identifiers are looked up directly. A UUID is tried against every project
    /// concurrently and the first hit wins. Names are rejected as ambiguous.
    pub async fn work_item_across_projects(
        &self,
        query: &str,
        workspace: &str,
    ) -> Result<(Record, String)> {
        if let Some(identifier) = parse_identifier(query) {
            let record = self
                .client()
                .retrieve_work_item_by_identifier(workspace, &identifier)
                .await
                .map_err(not_found_on_404(ResourceKind::WorkItem, query))?;
            let project_id = related_id(&record, "project").ok_or_else(|| {
                PlaneError::Decode(format!("work item {} has no project", identifier))
            })?;
            return Ok((record, project_id));
        }

        if !is_uuid(query) {
            return Err(PlaneError::validation(
                format!("Cannot search work items by name across all projects: {}", query),
                "Specify --project, or use an identifier like ABC-123.",
            ));
        }

        let projects = self.session.cached_projects(workspace).await?;
        let mut tasks = tokio::task::JoinSet::new();
        for project_id in projects.iter().filter_map(record_id) {
            let client = self.session.client();
            let workspace = workspace.to_string();
            let project_id = project_id.to_string();
            let id = query.to_string();
            tasks.spawn(async move {
                let result = client
                    .retrieve_work_item(&workspace, &project_id, &id, WORK_ITEM_EXPAND)
                    .await;
                (project_id, result)
            });
        }

        let mut transient = None;
        while let Some(joined) = tasks.join_next().await {
            let (project_id, result) =
                joined.map_err(|e| PlaneError::Transport(format!("lookup task failed: {}", e)))?;
            match result {
                Ok(record) => {
                    tasks.abort_all();
                    return Ok((record, project_id));
                }
                Err(err) if err.is_retryable() => {
                    tracing::warn!(project = %project_id, error = %err, "Work item lookup gave up");
                    transient.get_or_insert(err);
                }
                Err(err) => {
                    tracing::debug!(
                        project = %project_id,
                        error = %err,
                        "Work item not in project"
                    );
                }
            }
        }

        Err(transient.unwrap_or_else(|| PlaneError::not_found(ResourceKind::WorkItem, query)))
    }

    /// `me`, a member UUID, an email address, or a display name.
    pub async fn user(&self, query: &str, workspace: &str) -> Result<Record> {
        if query.eq_ignore_ascii_case("me") {
            return self.session.cached_me(workspace).await;
        }

        let members = self.session.cached_members(workspace).await?;

        if is_uuid(query) {
            return members
                .iter()
                .find(|m| record_id(m).is_some_and(|id| id.eq_ignore_ascii_case(query)))
                .cloned()
                .ok_or_else(|| PlaneError::not_found(ResourceKind::User, query));
        }

        if let Some(member) = members.iter().find(|m| {
            str_field(m, "email").is_some_and(|email| email.eq_ignore_ascii_case(query))
        }) {
            return Ok(member.clone());
        }

        find_best_match(query, &members, user_display_name, MIN_MATCH_SCORE)
            .map(|m| m.item.clone())
            .ok_or_else(|| PlaneError::not_found(ResourceKind::User, query))
    }

    pub async fn state(&self, query: &str, workspace: &str, project_id: &str) -> Result<Record> {
        if is_uuid(query) {
            return self
                .client()
                .retrieve_state(workspace, project_id, query)
                .await
                .map_err(not_found_on_404(ResourceKind::State, query));
        }
        let states = self.session.cached_states(workspace, project_id).await?;
        best_by_name(ResourceKind::State, query, &states)
    }

    pub async fn label(&self, query: &str, workspace: &str, project_id: &str) -> Result<Record> {
        if is_uuid(query) {
            return self
                .client()
                .retrieve_label(workspace, project_id, query)
                .await
                .map_err(not_found_on_404(ResourceKind::Label, query));
        }
        let labels = self.session.cached_labels(workspace, project_id).await?;
        best_by_name(ResourceKind::Label, query, &labels)
    }

    pub async fn module(&self, query: &str, workspace: &str, project_id: &str) -> Result<Record> {
        if is_uuid(query) {
            return self
                .client()
                .retrieve_module(workspace, project_id, query)
                .await
                .map_err(not_found_on_404(ResourceKind::Module, query));
        }
        let modules = self.session.cached_modules(workspace, project_id).await?;
        best_by_name(ResourceKind::Module, query, &modules)
    }

    pub async fn cycle(&self, query: &str, workspace: &str, project_id: &str) -> Result<Record> {
        if is_uuid(query) {
            return self
                .client()
                .retrieve_cycle(workspace, project_id, query)
                .await
                .map_err(not_found_on_404(ResourceKind::Cycle, query));
        }
        let cycles = self.session.cached_cycles(workspace, project_id).await?;
        best_by_name(ResourceKind::Cycle, query, &cycles)
    }

    /// A document (page) by UUID, or by title among the project's pages.
    ///
    /// Without a project, the UUID is looked up among workspace pages.
    pub async fn document(
        &self,
        query: &str,
        workspace: &str,
        project_id: Option<&str>,
    ) -> Result<Record> {
        if is_uuid(query) {
            return self
                .client()
                .retrieve_page(workspace, project_id, query)
                .await
                .map_err(not_found_on_404(ResourceKind::Document, query));
        }
        let Some(project_id) = project_id else {
            return Err(PlaneError::validation(
                format!("Workspace documents can only be addressed by UUID: {}", query),
                "Specify --project to find a project document by title.",
            ));
        };
        let pages = self.client().list_pages(workspace, project_id).await?;
        best_by_name(ResourceKind::Document, query, &pages)
    }

    /// ID of an estimate point given as a UUID or as its value, e.g. `3`.
    pub async fn estimate_point(
        &self,
        query: &str,
        workspace: &str,
        project_id: &str,
    ) -> Result<String> {
        if is_uuid(query) {
            return Ok(query.to_string());
        }
        let points = self
            .session
            .cached_estimate_points(workspace, project_id)
            .await?;
        let wanted = query.trim();
        if let Some(id) = points
            .iter()
            .find(|p| str_field(p, "value").is_some_and(|v| v.eq_ignore_ascii_case(wanted)))
            .and_then(record_id)
        {
            return Ok(id.to_string());
        }

        let known: Vec<&str> = points.iter().filter_map(|p| str_field(p, "value")).collect();
        let hint = if known.is_empty() {
            "No estimates are in use in this project yet; pass the estimate point UUID.".to_string()
        } else {
            format!("Known estimates: {}.", known.join(", "))
        };
        Err(PlaneError::validation(format!("Unknown estimate: {}", query), hint))
    }
}
