use crate::api::{Connector, HttpConnector, PlaneClient, Retrier};
use crate::cache::{ApiCache, CachedResource};
use crate::config::Credentials;
use crate::error::{PlaneError, Result};
use crate::model::{Record, record_id, str_field};
use crate::resolve::Resolver;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// Long-lived context built once per process and handed to every command.
///
/// Clones share the connector, the permit pool, and the cache store.
#[derive(Clone)]
pub struct Session {
    connector: Arc<dyn Connector>,
    retrier: Retrier,
    cache: ApiCache,
}

/// Work items of one project, gathered by [`Session::work_items_across_projects`].
#[derive(Debug, Clone)]
pub struct ProjectItems {
    pub project: Record,
    pub items: Vec<Record>,
}

/// Result of a workspace-wide listing: whatever succeeded plus one warning per failed project.
#[derive(Debug, Clone, Default)]
pub struct CrossProjectItems {
    pub projects: Vec<ProjectItems>,
    pub warnings: Vec<String>,
}

impl Session {
    pub fn new(connector: Arc<dyn Connector>, retrier: Retrier, cache: ApiCache) -> Self {
        Self {
            connector,
            retrier,
            cache,
        }
    }

    /// HTTP session for `credentials`, caching under `cache_dir` when given.
    pub fn connect(credentials: &Credentials, cache_dir: Option<&Path>, no_cache: bool) -> Self {
        let cache = match cache_dir {
            Some(dir) => ApiCache::open(dir, &credentials.base_url, no_cache),
            None => ApiCache::disabled(&credentials.base_url),
        };
        Self::new(
            Arc::new(HttpConnector::new(&credentials.base_url, &credentials.api_key)),
            Retrier::default(),
            cache,
        )
    }

    /// Client with its own transport; use one per independent batch of calls.
    pub fn client(&self) -> PlaneClient {
        PlaneClient::new(self.connector.connect(), self.retrier.clone())
    }

    pub fn cache(&self) -> &ApiCache {
        &self.cache
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self)
    }

    async fn cached<F, Fut>(
        &self,
        resource: CachedResource,
        workspace: &str,
        project_id: Option<&str>,
        fetch: F,
    ) -> Result<Vec<Record>>
    where
        F: FnOnce(PlaneClient) -> Fut,
        Fut: Future<Output = Result<Vec<Record>>>,
    {
        let key = self.cache.key(resource, workspace, project_id);
        let client = self.client();
        self.cache
            .cached_list(&key, resource.ttl(), || fetch(client))
            .await
    }

    pub async fn cached_projects(&self, workspace: &str) -> Result<Vec<Record>> {
        self.cached(CachedResource::Projects, workspace, None, |client| async move {
            client.list_projects(workspace).await
        })
        .await
    }

    pub async fn cached_members(&self, workspace: &str) -> Result<Vec<Record>> {
        self.cached(CachedResource::Members, workspace, None, |client| async move {
            client.list_members(workspace).await
        })
        .await
    }

    /// The authenticated user.
    pub async fn cached_me(&self, workspace: &str) -> Result<Record> {
        let me = self
            .cached(CachedResource::Me, workspace, None, |client| async move {
                Ok(vec![client.me().await?])
            })
            .await?;
        me.into_iter()
            .next()
            .ok_or_else(|| PlaneError::Decode("empty identity response".to_string()))
    }

    pub async fn cached_states(&self, workspace: &str, project_id: &str) -> Result<Vec<Record>> {
        self.cached(CachedResource::States, workspace, Some(project_id), |client| async move {
            client.list_states(workspace, project_id).await
        })
        .await
    }

    pub async fn cached_labels(&self, workspace: &str, project_id: &str) -> Result<Vec<Record>> {
        self.cached(CachedResource::Labels, workspace, Some(project_id), |client| async move {
            client.list_labels(workspace, project_id).await
        })
        .await
    }

    pub async fn cached_modules(&self, workspace: &str, project_id: &str) -> Result<Vec<Record>> {
        self.cached(CachedResource::Modules, workspace, Some(project_id), |client| async move {
            client.list_modules(workspace, project_id).await
        })
        .await
    }

    pub async fn cached_cycles(&self, workspace: &str, project_id: &str) -> Result<Vec<Record>> {
        self.cached(CachedResource::Cycles, workspace, Some(project_id), |client| async move {
            client.list_cycles(workspace, project_id).await
        })
        .await
    }

    pub async fn cached_work_items(
        &self,
        workspace: &str,
        project_id: &str,
    ) -> Result<Vec<Record>> {
        self.cached(
            CachedResource::WorkItems,
            workspace,
            Some(project_id),
            |client| async move { client.list_work_items(workspace, project_id).await },
        )
        .await
    }

    /// Estimate points seen on the project's work items, as `{id, value}` records.
    pub async fn cached_estimate_points(
        &self,
        workspace: &str,
        project_id: &str,
    ) -> Result<Vec<Record>> {
        self.cached(
            CachedResource::EstimatePoints,
            workspace,
            Some(project_id),
            |client| async move { client.estimate_points(workspace, project_id).await },
        )
        .await
    }

    /// Work items of every project, fetched concurrently with one transport per project.
    ///
    /// A project that fails becomes a warning; the rest are still returned, in
    /// project listing order.
    pub async fn work_items_across_projects(&self, workspace: &str) -> Result<CrossProjectItems> {
        let projects = self.cached_projects(workspace).await?;

        let mut tasks = tokio::task::JoinSet::new();
        for (index, project) in projects.iter().enumerate() {
            let Some(project_id) = record_id(project).map(str::to_string) else {
                continue;
            };
            let session = self.clone();
            let workspace = workspace.to_string();
            tasks.spawn(async move {
                let result = session.cached_work_items(&workspace, &project_id).await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<Vec<Record>>>> = projects.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, result) =
                joined.map_err(|e| PlaneError::Transport(format!("listing task failed: {}", e)))?;
            slots[index] = Some(result);
        }

        let mut gathered = CrossProjectItems::default();
        for (project, slot) in projects.into_iter().zip(slots) {
            match slot {
                Some(Ok(items)) => gathered.projects.push(ProjectItems { project, items }),
                Some(Err(err)) => {
                    let name = str_field(&project, "name").unwrap_or("unknown project");
                    tracing::warn!(project = name, error = %err, "Failed to list work items");
                    gathered.warnings.push(format!("{}: {}", name, err));
                }
                None => {}
            }
        }
        Ok(gathered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RetryPolicy;
    use crate::api::testing::{FakeConnector, FakeTransport};
    use crate::cache::{DEFAULT_SIZE_LIMIT, DiskStore};
    use serde_json::json;
    use tempfile::TempDir;

    const BASE_URL: &str = "https://api.plane.so";

    fn session_with(fake: &Arc<FakeTransport>, cache: ApiCache) -> Session {
        counted_session(fake, cache).0
    }

    fn counted_session(
        fake: &Arc<FakeTransport>,
        cache: ApiCache,
    ) -> (Session, Arc<FakeConnector>) {
        let connector = FakeConnector::new(fake);
        let session = Session::new(
            connector.clone(),
            Retrier::new(RetryPolicy::immediate()),
            cache,
        );
        (session, connector)
    }

    fn disk_cache(dir: &TempDir, no_cache: bool) -> ApiCache {
        let store = DiskStore::open(dir.path(), DEFAULT_SIZE_LIMIT).unwrap();
        ApiCache::new(Arc::new(store), BASE_URL, no_cache)
    }

    #[tokio::test]
    async fn test_listings_are_cached() {
        let dir = TempDir::new().unwrap();
        let fake = FakeTransport::new();
        fake.list("workspaces/acme/projects/", json!([{"id": "p-1", "name": "Frontend"}]));
        let session = session_with(&fake, disk_cache(&dir, false));

        session.cached_projects("acme").await.unwrap();
        let again = session.cached_projects("acme").await.unwrap();

        assert_eq!(again[0]["name"], "Frontend");
        assert_eq!(fake.calls_to("workspaces/acme/projects/"), 1);
    }

    #[tokio::test]
    async fn test_no_cache_refetches_and_rewarms() {
        let dir = TempDir::new().unwrap();
        let fake = FakeTransport::new();
        fake.list("workspaces/acme/projects/p-1/states/", json!([{"id": "s-1"}]));

        let bypass = session_with(&fake, disk_cache(&dir, true));
        bypass.cached_states("acme", "p-1").await.unwrap();
        bypass.cached_states("acme", "p-1").await.unwrap();
        assert_eq!(fake.calls_to("workspaces/acme/projects/p-1/states/"), 2);

        let normal = session_with(&fake, disk_cache(&dir, false));
        normal.cached_states("acme", "p-1").await.unwrap();
        assert_eq!(fake.calls_to("workspaces/acme/projects/p-1/states/"), 2);
    }

    #[tokio::test]
    async fn test_cached_me() {
        let fake = FakeTransport::new();
        fake.route("users/me/", json!({"id": "u-1", "email": "me@example.com"}));
        let session = session_with(&fake, ApiCache::disabled(BASE_URL));
        let me = session.cached_me("acme").await.unwrap();
        assert_eq!(me["email"], "me@example.com");
    }

    #[tokio::test]
    async fn test_cross_project_listing_keeps_partial_results() {
        let fake = FakeTransport::new();
        fake.list(
            "workspaces/acme/projects/",
            json!([
                {"id": "p-1", "name": "Frontend"},
                {"id": "p-2", "name": "Backend"},
                {"id": "p-3", "name": "Mobile"},
            ]),
        );
        fake.list("workspaces/acme/projects/p-1/work-items/", json!([{"id": "wi-1"}]));
        fake.fail("workspaces/acme/projects/p-2/work-items/", 403);
        fake.list(
            "workspaces/acme/projects/p-3/work-items/",
            json!([{"id": "wi-3"}, {"id": "wi-4"}]),
        );
        let session = session_with(&fake, ApiCache::disabled(BASE_URL));

        let gathered = session.work_items_across_projects("acme").await.unwrap();

        let names: Vec<&str> = gathered
            .projects
            .iter()
            .map(|p| str_field(&p.project, "name").unwrap())
            .collect();
        assert_eq!(names, vec!["Frontend", "Mobile"]);
        assert_eq!(gathered.projects[1].items.len(), 2);
        assert_eq!(gathered.warnings.len(), 1);
        assert!(gathered.warnings[0].starts_with("Backend:"));
    }

    #[tokio::test]
    async fn test_cross_project_listing_connects_once_per_project() {
        let fake = FakeTransport::new();
        fake.list(
            "workspaces/acme/projects/",
            json!([{"id": "p-1"}, {"id": "p-2"}, {"id": "p-3"}]),
        );
        for project in ["p-1", "p-2", "p-3"] {
            fake.list(
                &format!("workspaces/acme/projects/{}/work-items/", project),
                json!([]),
            );
        }
        let (session, connector) = counted_session(&fake, ApiCache::disabled(BASE_URL));

        session.work_items_across_projects("acme").await.unwrap();

        // one for the project listing, then one per project
        assert_eq!(connector.connects(), 1 + 3);
    }

    #[tokio::test]
    async fn test_estimate_points_are_cached() {
        let dir = TempDir::new().unwrap();
        let fake = FakeTransport::new();
        fake.list(
            "workspaces/acme/projects/p-1/work-items/",
            json!([{"id": "wi-1", "estimate_point": {"id": "e-1", "value": "2"}}]),
        );
        let session = session_with(&fake, disk_cache(&dir, false));

        let points = session.cached_estimate_points("acme", "p-1").await.unwrap();
        session.cached_estimate_points("acme", "p-1").await.unwrap();

        assert_eq!(points[0]["value"], "2");
        assert_eq!(fake.calls_to("workspaces/acme/projects/p-1/work-items/"), 1);
    }
}
