// Session flows against a mock backend

use crawlscope_client::{ApiClient, RetryPolicy};
use crawlscope_core::layout::LayoutConfig;
use crawlscope_core::session::{SessionState, fetch_detail, fetch_filtered};
use crawlscope_core::view::PageList;
use crawlscope_core::{CategoryTable, ExportFormat, RenderedGraph, Session, ViewMode};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn job_json(id: i64, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "startUrl": "https://example.com",
        "maxDepth": 2,
        "crawlScope": "DOMAIN",
        "respectRobotsTxt": true,
        "status": status,
        "totalPagesFound": 3,
        "totalPagesCrawled": 3,
        "createdAt": "2024-03-05T14:30:00"
    })
}

fn pages_json() -> serde_json::Value {
    json!([
        {"id": 1, "url": "https://example.com/", "title": "Home", "httpStatusCode": 200,
         "hierarchyLevel": 0, "outgoingLinksCount": 2, "isSuccessful": true, "category": "HOME"},
        {"id": 2, "url": "https://example.com/blog", "title": "Blog", "httpStatusCode": 200,
         "hierarchyLevel": 1, "outgoingLinksCount": 0, "isSuccessful": true, "category": "BLOG"},
        {"id": 3, "url": "https://example.com/shop", "title": "Shop", "httpStatusCode": 404,
         "hierarchyLevel": 1, "outgoingLinksCount": 0, "isSuccessful": false, "category": "PRODUCT",
         "errorMessage": "Not Found"}
    ])
}

async fn mock_completed_job(server: &MockServer, id: i64) {
    let base = format!("/api/crawl-jobs/{}", id);
    Mock::given(method("GET"))
        .and(path(base.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json(id, "COMPLETED")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/results/pages", base)))
        .respond_with(ResponseTemplate::new(200).set_body_json(pages_json()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/results/stats", base)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalPages": 3, "successfulPages": 2, "failedPages": 1
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/results/graph-data", base)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nodes": [
                {"id": 1, "url": "https://example.com/", "title": "Home", "category": "HOME", "level": 0, "value": 3},
                {"id": 2, "url": "https://example.com/blog", "title": "Blog", "category": "BLOG", "level": 1, "value": 1},
                {"id": 3, "url": "https://example.com/shop", "title": "Shop", "category": "PRODUCT", "level": 1, "value": 1}
            ],
            "links": [
                {"source": 1, "target": 2},
                {"source": 1, "target": 3},
                {"source": 1, "target": 99}
            ]
        })))
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(&format!("{}/api", server.uri()))
        .unwrap()
        .with_retry(RetryPolicy::none())
}

fn session() -> Session {
    Session::new(CategoryTable::default(), LayoutConfig::default())
}

// ============================================================================
// Detail loading
// ============================================================================

#[tokio::test]
async fn test_load_completed_job_builds_network_scene() {
    let server = MockServer::start().await;
    mock_completed_job(&server, 7).await;
    Mock::given(method("GET"))
        .and(path("/api/crawl-jobs/7/results/classification-stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"HOME": 1, "BLOG": 1, "PRODUCT": 1})))
        .mount(&server)
        .await;

    let client = client(&server);
    let mut session = session();
    assert!(session.load(&client, 7).await);

    assert_eq!(session.state(), &SessionState::Loaded);
    match session.rendered() {
        Some(RenderedGraph::Network(scene)) => {
            assert_eq!(scene.nodes().len(), 3);
            assert_eq!(scene.links().len(), 2);
            assert_eq!(scene.clusters().len(), 3);
        }
        _ => panic!("expected network scene"),
    }

    let view = session.detail_view().unwrap();
    assert_eq!(view.title, "Job #7 Results");
    assert_eq!(view.stats[1].value, 2);
    assert_eq!(view.categories.as_ref().map(Vec::len), Some(3));
    match view.pages {
        PageList::Pages(items) => assert_eq!(items.len(), 3),
        other => panic!("unexpected page list {:?}", other),
    }
}

#[tokio::test]
async fn test_classification_stats_are_best_effort() {
    let server = MockServer::start().await;
    mock_completed_job(&server, 8).await;
    Mock::given(method("GET"))
        .and(path("/api/crawl-jobs/8/results/classification-stats"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let detail = fetch_detail(&client(&server), 8).await.unwrap();
    assert!(detail.classification.is_none());
    assert!(detail.tree.is_none());
    assert_eq!(detail.pages.len(), 3);
}

#[tokio::test]
async fn test_unfinished_job_has_no_results_yet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/crawl-jobs/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_json(9, "RUNNING")))
        .mount(&server)
        .await;
    // Every results endpoint is missing for a running job.

    let client = client(&server);
    let mut session = session();
    assert!(session.load(&client, 9).await);
    assert_eq!(session.state(), &SessionState::Loaded);
    assert!(session.rendered().is_none());
    assert_eq!(session.detail_view().unwrap().pages, PageList::NoResultsYet);
}

#[tokio::test]
async fn test_missing_job_closes_with_error_notice() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/crawl-jobs/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut session = session();
    session.load(&client(&server), 404).await;
    assert_eq!(session.state(), &SessionState::Closed);
    let notices = session.take_notices();
    assert!(notices[0].message.contains("HTTP 404"));
}

#[tokio::test]
async fn test_late_result_for_superseded_job_is_dropped() {
    let server = MockServer::start().await;
    mock_completed_job(&server, 1).await;
    mock_completed_job(&server, 2).await;
    let client = client(&server);

    let mut session = session();
    let first = session.begin_load(1);
    let second = session.begin_load(2);
    let first_result = fetch_detail(&client, 1).await;
    let second_result = fetch_detail(&client, 2).await;

    assert!(session.apply_detail(second, second_result));
    assert!(!session.apply_detail(first, first_result));
    assert_eq!(session.current_job_id(), Some(2));
}

// ============================================================================
// Filtering and views
// ============================================================================

#[tokio::test]
async fn test_category_filter_replaces_only_page_list() {
    let server = MockServer::start().await;
    mock_completed_job(&server, 5).await;
    Mock::given(method("GET"))
        .and(path("/api/crawl-jobs/5/results/pages"))
        .and(query_param("category", "BLOG"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "url": "https://example.com/blog", "hierarchyLevel": 1, "category": "BLOG"}
        ])))
        .with_priority(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let mut session = session();
    session.load(&client, 5).await;
    let nodes_before = session.rendered().map(RenderedGraph::node_count);

    assert!(session.select_category(&client, "BLOG").await);
    assert_eq!(session.active_category(), Some("BLOG"));
    assert_eq!(session.displayed_pages().len(), 1);
    assert_eq!(session.rendered().map(RenderedGraph::node_count), nodes_before);

    session.clear_filter();
    assert_eq!(session.displayed_pages().len(), 3);
    assert_eq!(session.state(), &SessionState::Loaded);
}

#[tokio::test]
async fn test_filter_result_after_close_is_dropped() {
    let server = MockServer::start().await;
    mock_completed_job(&server, 5).await;
    let client = client(&server);

    let mut session = session();
    session.load(&client, 5).await;
    let ticket = session.begin_filter("BLOG").unwrap();
    let pages = fetch_filtered(&client, 5, "BLOG").await;
    session.close();
    assert!(!session.apply_filter(ticket, pages));
    assert_eq!(session.state(), &SessionState::Closed);
}

#[tokio::test]
async fn test_tree_view_falls_back_to_page_hierarchy() {
    let server = MockServer::start().await;
    mock_completed_job(&server, 3).await;
    let client = client(&server);

    let mut session = session();
    session.load(&client, 3).await;
    session.set_view_mode(ViewMode::Tree);

    match session.rendered() {
        Some(RenderedGraph::Tree(scene)) => {
            assert_eq!(scene.nodes().len(), 3);
            assert_eq!(scene.nodes()[0].name, "Home");
            assert_eq!(scene.nodes()[0].children, 2);
        }
        _ => panic!("expected tree scene"),
    }

    let artifact = session.export_current(ExportFormat::Svg).unwrap().unwrap();
    let svg = String::from_utf8(artifact.bytes).unwrap();
    assert!(svg.contains("id=\"tree-graph\""));
}
