use std::time::Duration;

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use super::cache::RunCache;
use super::client::GitHubClient;
use super::provider::GitHubProvider;
use super::run_url::RunUrl;
use crate::auth::Token;
use crate::config::ApiKind;
use crate::error::TraceError;

fn provider(server: &ServerGuard, api: ApiKind, token: Option<&str>) -> GitHubProvider {
    let client = GitHubClient::new(
        &server.url(),
        &format!("{}/graphql", server.url()),
        token.map(Token::from),
    )
    .unwrap()
    .with_retry_policy(1, Duration::ZERO);

    GitHubProvider::with_parts(client, api, 2, RunCache::disabled())
}

fn run_url(attempt: Option<u32>) -> RunUrl {
    RunUrl {
        owner: "owner".to_string(),
        repo: "repo".to_string(),
        run_id: 42,
        attempt,
    }
}

fn run_body(attempt: u32) -> String {
    json!({
        "id": 42,
        "name": "CI",
        "run_attempt": attempt,
        "run_number": 314,
        "display_title": "Fix flaky test",
        "status": "completed",
        "conclusion": "success",
        "check_suite_node_id": "CS_kwDOAbc"
    })
    .to_string()
}

fn job_json(id: u64, created_at: &str) -> serde_json::Value {
    json!({
        "id": id,
        "run_id": 42,
        "name": format!("job-{id}"),
        "status": "completed",
        "conclusion": "success",
        "created_at": created_at,
        "started_at": "2024-10-06T00:00:10Z",
        "completed_at": "2024-10-06T00:01:00Z",
        "runner_name": format!("runner-{id}"),
        "runner_id": id,
        "steps": [
            {
                "name": "build",
                "status": "completed",
                "conclusion": "success",
                "number": 1,
                "started_at": "2024-10-06T00:00:10Z",
                "completed_at": "2024-10-06T00:00:50Z"
            }
        ]
    })
}

fn jobs_page_query(page: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("per_page".into(), "2".into()),
        Matcher::UrlEncoded("page".into(), page.into()),
    ])
}

#[tokio::test]
async fn test_rest_fetches_latest_attempt_and_all_job_pages() {
    let mut server = Server::new_async().await;

    let run_mock = server
        .mock("GET", "/repos/owner/repo/actions/runs/42")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(run_body(2))
        .create_async()
        .await;

    let page_1 = server
        .mock("GET", "/repos/owner/repo/actions/runs/42/attempts/2/jobs")
        .match_query(jobs_page_query("1"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "total_count": 3,
                "jobs": [job_json(1, "2024-10-06T00:00:00Z"), job_json(2, "2024-10-06T00:00:01Z")]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let page_2 = server
        .mock("GET", "/repos/owner/repo/actions/runs/42/attempts/2/jobs")
        .match_query(jobs_page_query("2"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "total_count": 3, "jobs": [job_json(3, "2024-10-06T00:00:02Z")] }).to_string())
        .create_async()
        .await;

    let data = provider(&server, ApiKind::Rest, None)
        .fetch_run_data(&run_url(None))
        .await
        .unwrap();

    run_mock.assert_async().await;
    page_1.assert_async().await;
    page_2.assert_async().await;

    assert_eq!(data.run.run_attempt, 2);
    assert_eq!(data.run.run_number, 314);
    let ids: Vec<u64> = data.jobs.iter().map(|job| job.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(data.jobs[0].runner_name.as_deref(), Some("runner-1"));

    let conversion = crate::timeline::convert(&data).unwrap();
    assert_eq!(conversion.trace.tracks().count(), 4);
}

#[tokio::test]
async fn test_rest_fetches_explicit_attempt() {
    let mut server = Server::new_async().await;

    let run_mock = server
        .mock("GET", "/repos/owner/repo/actions/runs/42/attempts/1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(run_body(1))
        .create_async()
        .await;

    let jobs_mock = server
        .mock("GET", "/repos/owner/repo/actions/runs/42/attempts/1/jobs")
        .match_query(jobs_page_query("1"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "total_count": 1, "jobs": [job_json(9, "2024-10-06T00:00:00Z")] }).to_string())
        .create_async()
        .await;

    let data = provider(&server, ApiKind::Rest, Some("ghp_token"))
        .fetch_run_data(&run_url(Some(1)))
        .await
        .unwrap();

    run_mock.assert_async().await;
    jobs_mock.assert_async().await;
    assert_eq!(data.run.run_attempt, 1);
    assert_eq!(data.jobs.len(), 1);
}

#[tokio::test]
async fn test_rest_sends_bearer_token() {
    let mut server = Server::new_async().await;

    let run_mock = server
        .mock("GET", "/repos/owner/repo/actions/runs/42/attempts/1")
        .match_header("authorization", "Bearer ghp_token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(run_body(1))
        .create_async()
        .await;

    server
        .mock("GET", "/repos/owner/repo/actions/runs/42/attempts/1/jobs")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "total_count": 1, "jobs": [job_json(9, "2024-10-06T00:00:00Z")] }).to_string())
        .create_async()
        .await;

    provider(&server, ApiKind::Rest, Some("ghp_token"))
        .fetch_run_data(&run_url(Some(1)))
        .await
        .unwrap();

    run_mock.assert_async().await;
}

#[tokio::test]
async fn test_rest_reports_not_found() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/repos/owner/repo/actions/runs/42")
        .with_status(404)
        .with_body(r#"{"message":"Not Found"}"#)
        .create_async()
        .await;

    let err = provider(&server, ApiKind::Rest, None)
        .fetch_run_data(&run_url(None))
        .await
        .unwrap_err();

    assert!(matches!(err, TraceError::ApiError { status: 404, .. }));
    assert!(err.to_string().contains("Not Found"));
}

#[tokio::test]
async fn test_rest_gives_up_after_retries() {
    let mut server = Server::new_async().await;

    let run_mock = server
        .mock("GET", "/repos/owner/repo/actions/runs/42")
        .with_status(503)
        .expect(2)
        .create_async()
        .await;

    let err = provider(&server, ApiKind::Rest, None)
        .fetch_run_data(&run_url(None))
        .await
        .unwrap_err();

    run_mock.assert_async().await;
    assert!(matches!(
        err,
        TraceError::ApiErrorAfterRetries {
            status: 503,
            retries: 1
        }
    ));
}

#[tokio::test]
async fn test_rest_rejects_runs_without_jobs() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/repos/owner/repo/actions/runs/42")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(run_body(1))
        .create_async()
        .await;

    server
        .mock("GET", "/repos/owner/repo/actions/runs/42/attempts/1/jobs")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "total_count": 0, "jobs": [] }).to_string())
        .create_async()
        .await;

    let err = provider(&server, ApiKind::Rest, None)
        .fetch_run_data(&run_url(None))
        .await
        .unwrap_err();

    assert!(matches!(err, TraceError::Api(_)));
}

#[tokio::test]
async fn test_graphql_pages_through_check_runs() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/repos/owner/repo/actions/runs/42")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(run_body(1))
        .create_async()
        .await;

    let check_run = |id: u64, conclusion: &str| {
        json!({
            "databaseId": id,
            "name": format!("job-{id}"),
            "status": "COMPLETED",
            "conclusion": conclusion,
            "startedAt": "2024-10-06T00:00:10Z",
            "completedAt": "2024-10-06T00:01:00Z",
            "steps": {
                "nodes": [
                    {
                        "name": "build",
                        "number": 1,
                        "startedAt": "2024-10-06T00:00:10Z",
                        "completedAt": "2024-10-06T00:00:50Z"
                    }
                ]
            }
        })
    };

    let page_1 = server
        .mock("POST", "/graphql")
        .match_header("authorization", "Bearer ghp_token")
        .match_body(Matcher::PartialJson(json!({
            "operationName": "CheckSuiteRuns",
            "variables": { "id": "CS_kwDOAbc", "after": null }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "data": {
                    "node": {
                        "checkRuns": {
                            "pageInfo": { "hasNextPage": true, "endCursor": "cursor-1" },
                            "nodes": [check_run(1, "SUCCESS")]
                        }
                    }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let page_2 = server
        .mock("POST", "/graphql")
        .match_body(Matcher::PartialJson(json!({
            "variables": { "after": "cursor-1" }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "data": {
                    "node": {
                        "checkRuns": {
                            "pageInfo": { "hasNextPage": false, "endCursor": null },
                            "nodes": [check_run(2, "SKIPPED"), null]
                        }
                    }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let data = provider(&server, ApiKind::Graphql, Some("ghp_token"))
        .fetch_run_data(&run_url(None))
        .await
        .unwrap();

    page_1.assert_async().await;
    page_2.assert_async().await;

    assert_eq!(data.jobs.len(), 2);
    let first = &data.jobs[0];
    assert_eq!(first.id, 1);
    assert_eq!(first.status, "completed");
    assert_eq!(first.conclusion.as_deref(), Some("success"));
    assert_eq!(first.created_at, first.started_at);
    assert_eq!(first.runner_name, None);
    assert_eq!(first.steps.len(), 1);
    assert!(data.jobs[1].is_skipped());

    let conversion = crate::timeline::convert(&data).unwrap();
    assert_eq!(conversion.timings.len(), 1);
    assert_eq!(conversion.timings[0].waiting_ns, 0);
}

#[tokio::test]
async fn test_graphql_requires_token() {
    let server = Server::new_async().await;

    let err = provider(&server, ApiKind::Graphql, None)
        .fetch_run_data(&run_url(None))
        .await
        .unwrap_err();

    assert!(matches!(err, TraceError::Config(_)));
}

#[tokio::test]
async fn test_graphql_surfaces_query_errors() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/repos/owner/repo/actions/runs/42")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(run_body(1))
        .create_async()
        .await;

    server
        .mock("POST", "/graphql")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "data": null,
                "errors": [{ "message": "Could not resolve to a node with the global id" }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = provider(&server, ApiKind::Graphql, Some("ghp_token"))
        .fetch_run_data(&run_url(None))
        .await
        .unwrap_err();

    assert!(matches!(err, TraceError::GraphQl { .. }));
    assert!(err.to_string().contains("Could not resolve"));
}
