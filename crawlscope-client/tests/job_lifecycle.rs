// Create -> start -> observe scenario against a mock backend

use crawlscope_client::{ApiClient, JobStatus, NewJob, RetryPolicy};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn job(status: &str) -> serde_json::Value {
    json!({
        "id": 1,
        "startUrl": "https://example.com",
        "maxDepth": 2,
        "crawlScope": "DOMAIN",
        "respectRobotsTxt": true,
        "status": status,
        "totalPagesFound": 0,
        "totalPagesCrawled": 0,
        "createdAt": "2024-03-05T14:30:00"
    })
}

#[tokio::test]
async fn test_create_start_then_running() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/crawl-jobs"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "startUrl": "https://example.com",
            "maxDepth": 2,
            "crawlScope": "DOMAIN",
            "respectRobotsTxt": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(job("PENDING")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/crawl-jobs/1/start"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/crawl-jobs/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job("RUNNING")))
        .mount(&server)
        .await;

    let client = ApiClient::new(&format!("{}/api", server.uri()))
        .unwrap()
        .with_retry(RetryPolicy::none());

    let created = client
        .create_job(&NewJob {
            start_url: "https://example.com".to_string(),
            max_depth: 2,
            crawl_scope: "DOMAIN".to_string(),
            respect_robots_txt: true,
        })
        .await
        .unwrap();
    assert_eq!(created.status, JobStatus::Pending);
    assert!(!created.has_results());

    client.start_job(created.id).await.unwrap();

    let observed = client.get_job(created.id).await.unwrap();
    assert_eq!(observed.status, JobStatus::Running);
}

#[tokio::test]
async fn test_list_jobs_with_status_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/crawl-jobs"))
        .and(wiremock::matchers::query_param("status", "COMPLETED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([job("COMPLETED")])))
        .mount(&server)
        .await;

    let client = ApiClient::new(&format!("{}/api/", server.uri())).unwrap();
    let jobs = client.list_jobs(Some(JobStatus::Completed)).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].has_results());
}

#[tokio::test]
async fn test_root_pages_of_completed_job() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/crawl-jobs/1/results/root-pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 10, "url": "https://example.com/", "title": "Home", "hierarchyLevel": 0,
             "outgoingLinksCount": 3, "isSuccessful": true}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&format!("{}/api", server.uri())).unwrap();
    let roots = client.get_root_pages(1).await.unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].hierarchy_level, 0);
    assert_eq!(roots[0].title.as_deref(), Some("Home"));
}
