//! End-to-end runs of the binary against a mocked Plane API.

use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{API_KEY, TestEnv};

const PROJECTS: &str = "/api/v1/workspaces/acme/projects/";

fn page(results: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "results": results,
        "next_page_results": false,
        "next_cursor": null,
    }))
}

fn projects() -> Value {
    json!([
        {"id": "p-1", "name": "Frontend", "identifier": "FE"},
        {"id": "p-2", "name": "Backend API", "identifier": "BE"},
    ])
}

async fn setup() -> (MockServer, TestEnv) {
    let server = MockServer::start().await;
    let env = TestEnv::new();
    env.write_config(&server.uri());
    (server, env)
}

async fn mount_projects(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(PROJECTS))
        .and(header("X-API-Key", API_KEY))
        .respond_with(page(projects()))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_project_list_json() {
    let (server, env) = setup().await;
    mount_projects(&server).await;

    env.cmd()
        .args(["--json", "project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Frontend\""))
        .stdout(predicate::str::contains("\"Backend API\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_project_show_fuzzy() {
    let (server, env) = setup().await;
    mount_projects(&server).await;

    env.cmd()
        .args(["project", "show", "backend"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backend API"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_project_not_found_suggests() {
    let (server, env) = setup().await;
    mount_projects(&server).await;

    env.cmd()
        .args(["project", "show", "xyz front"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Project not found: xyz front"))
        .stderr(predicate::str::contains("did you mean: \"Frontend\""))
        .stderr(predicate::str::contains("planecli project list"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_listing_is_cached_between_runs() {
    let (server, env) = setup().await;
    Mock::given(method("GET"))
        .and(path(PROJECTS))
        .respond_with(page(projects()))
        .expect(1)
        .mount(&server)
        .await;

    for _ in 0..2 {
        env.cmd()
            .args(["project", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Frontend"));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_cache_refetches() {
    let (server, env) = setup().await;
    Mock::given(method("GET"))
        .and(path(PROJECTS))
        .respond_with(page(projects()))
        .expect(3)
        .mount(&server)
        .await;

    env.cmd().args(["project", "list"]).assert().success();
    env.cmd().args(["--no-cache", "project", "list"]).assert().success();
    env.cmd()
        .env("PLANECLI_NO_CACHE", "yes")
        .args(["project", "list"])
        .assert()
        .success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rate_limit_is_retried() {
    let (server, env) = setup().await;
    Mock::given(method("GET"))
        .and(path(PROJECTS))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"detail": "slow down"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_projects(&server).await;

    env.cmd()
        .args(["project", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Frontend"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unauthorized_is_not_retried() {
    let (server, env) = setup().await;
    Mock::given(method("GET"))
        .and(path(PROJECTS))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Given API token is not valid"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    env.cmd()
        .args(["project", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Given API token is not valid"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_work_item_by_identifier() {
    let (server, env) = setup().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/work-items/FE-42/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "wi-42",
            "name": "Fix login redirect",
            "project": "p-1",
            "sequence_id": 42,
            "state": "s-1",
            "priority": "high",
            "assignees": [],
            "labels": [],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/states/"))
        .respond_with(page(json!([
            {"id": "s-1", "name": "In Progress", "group": "started"}
        ])))
        .mount(&server)
        .await;

    env.cmd()
        .args(["wi", "show", "fe-42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FE-42"))
        .stdout(predicate::str::contains("Fix login redirect"))
        .stdout(predicate::str::contains("In Progress"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_work_item_identifier_not_found() {
    let (server, env) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/work-items/FE-999/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Not found"})))
        .mount(&server)
        .await;

    env.cmd()
        .args(["wi", "show", "FE-999"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Work item not found: FE-999"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_work_item_list_across_projects_keeps_partial_results() {
    let (server, env) = setup().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/work-items/"))
        .respond_with(page(json!([
            {"id": "wi-1", "name": "Fix login redirect", "sequence_id": 1, "priority": "high"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/projects/p-2/work-items/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Forbidden"})))
        .mount(&server)
        .await;

    env.cmd()
        .args(["wi", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FE-1"))
        .stdout(predicate::str::contains("Fix login redirect"))
        .stderr(predicate::str::contains("Warning:"))
        .stderr(predicate::str::contains("Backend API"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_module_create_invalidates_listing() {
    let (server, env) = setup().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/modules/"))
        .respond_with(page(json!([{"id": "m-1", "name": "Auth"}])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/modules/"))
        .and(body_partial_json(json!({"name": "Billing"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": "m-2", "name": "Billing"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    env.cmd().args(["module", "list", "-p", "FE"]).assert().success();
    env.cmd()
        .args(["module", "create", "Billing", "-p", "FE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    env.cmd().args(["module", "list", "-p", "FE"]).assert().success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_project_list_state_sort_and_limit() {
    let (server, env) = setup().await;
    Mock::given(method("GET"))
        .and(path(PROJECTS))
        .respond_with(page(json!([
            {"id": "p-1", "name": "Alpha", "network": 1, "created_at": "2024-01-01T00:00:00Z"},
            {"id": "p-2", "name": "Bravo", "network": 1, "created_at": "2024-06-01T00:00:00Z"},
            {"id": "p-3", "name": "Charlie", "network": 0, "created_at": "2024-09-01T00:00:00Z"},
        ])))
        .mount(&server)
        .await;

    env.cmd()
        .args(["--json", "project", "list", "--state", "started", "--sort", "created", "-n", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bravo"))
        .stdout(predicate::str::contains("Alpha").not())
        .stdout(predicate::str::contains("Charlie").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_work_item_list_label_filter() {
    let (server, env) = setup().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/labels/"))
        .respond_with(page(json!([{"id": "l-1", "name": "bug"}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/work-items/"))
        .respond_with(page(json!([
            {"id": "wi-1", "name": "Crash on save", "sequence_id": 1, "labels": ["l-1"]},
            {"id": "wi-2", "name": "Polish footer", "sequence_id": 2, "labels": []},
        ])))
        .mount(&server)
        .await;

    env.cmd()
        .args(["wi", "list", "-p", "FE", "--labels", "bug"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Crash on save"))
        .stdout(predicate::str::contains("Polish footer").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_work_item_delete_invalidates_listing() {
    let (server, env) = setup().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/work-items/"))
        .respond_with(page(json!([{"id": "wi-1", "name": "Stale item", "sequence_id": 1}])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/work-items/FE-1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "wi-1",
            "name": "Stale item",
            "project": "p-1",
            "sequence_id": 1,
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/work-items/wi-1/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    env.cmd().args(["wi", "list", "-p", "FE"]).assert().success();
    env.cmd()
        .args(["wi", "delete", "FE-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted"));
    env.cmd().args(["wi", "list", "-p", "FE"]).assert().success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_work_item_search_within_project() {
    let (server, env) = setup().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/work-items/search/"))
        .and(query_param("search", "login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [
                {
                    "id": "wi-7",
                    "name": "Fix login redirect",
                    "project_id": "p-1",
                    "project__identifier": "FE",
                    "sequence_id": 7,
                },
                {
                    "id": "wi-3",
                    "name": "Login rate limit",
                    "project_id": "p-2",
                    "project__identifier": "BE",
                    "sequence_id": 3,
                },
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    env.cmd()
        .args(["wi", "search", "login", "-p", "FE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FE-7"))
        .stdout(predicate::str::contains("BE-3").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_work_item_create_with_estimate_and_module() {
    let (server, env) = setup().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/work-items/"))
        .respond_with(page(json!([
            {"id": "wi-1", "estimate_point": {"id": "e-3", "value": "3"}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/modules/"))
        .respond_with(page(json!([{"id": "m-1", "name": "Auth"}])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/work-items/"))
        .and(body_partial_json(json!({"name": "Add cache", "estimate_point": "e-3"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "wi-9",
            "name": "Add cache",
            "sequence_id": 9,
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/modules/m-1/module-issues/"))
        .and(body_partial_json(json!({"issues": ["wi-9"]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    env.cmd()
        .args(["wi", "create", "Add cache", "-p", "FE", "--estimate", "3", "--module", "auth"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FE-9"))
        .stdout(predicate::str::contains("Auth"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cycle_add_item_invalidates_cycles() {
    let (server, env) = setup().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/cycles/"))
        .respond_with(page(json!([{"id": "c-1", "name": "Sprint 1"}])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/work-items/FE-7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "wi-7",
            "name": "Fix login redirect",
            "project": "p-1",
            "sequence_id": 7,
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/cycles/c-1/cycle-issues/"))
        .and(body_partial_json(json!({"issues": ["wi-7"]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    env.cmd().args(["cycle", "list", "-p", "FE"]).assert().success();
    env.cmd()
        .args(["cycle", "add-item", "sprint 1", "FE-7", "-p", "FE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sprint 1"));
    env.cmd().args(["cycle", "list", "-p", "FE"]).assert().success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_state_create_invalidates_listing() {
    let (server, env) = setup().await;
    mount_projects(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/states/"))
        .respond_with(page(json!([{"id": "s-1", "name": "Todo", "group": "unstarted"}])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workspaces/acme/projects/p-1/states/"))
        .and(body_partial_json(json!({"name": "QA", "group": "started", "color": "#000000"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "s-9",
            "name": "QA",
            "group": "started",
        })))
        .expect(1)
        .mount(&server)
        .await;

    env.cmd().args(["state", "list", "-p", "FE"]).assert().success();
    env.cmd()
        .args(["state", "create", "QA", "-p", "FE", "--group", "started"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));
    env.cmd().args(["state", "list", "-p", "FE"]).assert().success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_doc_create_workspace_page() {
    let (server, env) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/workspaces/acme/pages/"))
        .and(body_partial_json(json!({"name": "Handbook", "description_html": "<p>hello</p>"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": "pg-1", "name": "Handbook"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    env.cmd()
        .args(["doc", "create", "Handbook", "-c", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created document Handbook"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_comment_delete_needs_comment_uuid() {
    let (server, env) = setup().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    env.cmd()
        .args(["comment", "delete", "FE-1", "first one"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Not a comment UUID: first one"));
}
