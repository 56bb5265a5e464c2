use chrono::{TimeZone, Utc};
use mockito::Matcher;
use serde_json::json;
use taskkeep::config::Credentials;
use taskkeep::error::Error;
use taskkeep::model::TaskStatus;
use taskkeep::remote::{fetch_snapshot, GoogleTasksSource, NewTask, RemoteTaskSource};

fn credentials() -> Credentials {
    Credentials {
        id: "client-1".to_string(),
        key: "token-abc".to_string(),
    }
}

fn client(server: &mockito::Server) -> GoogleTasksSource {
    GoogleTasksSource::new(credentials())
        .unwrap()
        .with_base_url(server.url())
}

const FIRST_PAGE: &str = "showCompleted=true&showHidden=true&maxResults=100";
const SECOND_PAGE: &str = "showCompleted=true&showHidden=true&maxResults=100&pageToken=p2";

#[tokio::test]
async fn fetch_drains_lists_and_task_pages() {
    let mut server = mockito::Server::new_async().await;
    let lists = server
        .mock("GET", "/users/@me/lists")
        .match_header("authorization", "Bearer token-abc")
        .match_query(Matcher::Exact("maxResults=100".to_string()))
        .with_header("content-type", "application/json")
        .with_body(json!({ "items": [{ "id": "l1", "title": "Chores" }] }).to_string())
        .create_async()
        .await;
    let page_one = server
        .mock("GET", "/lists/l1/tasks")
        .match_query(Matcher::Exact(FIRST_PAGE.to_string()))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    {
                        "id": "t1",
                        "title": "Pay rent",
                        "status": "completed",
                        "updated": "2024-05-01T09:00:00.000Z",
                        "completed": "2024-05-01T08:59:00.000Z"
                    },
                    {
                        "id": "t-gone",
                        "title": "Deleted",
                        "status": "needsAction",
                        "updated": "2024-05-01T09:00:00.000Z",
                        "deleted": true
                    }
                ],
                "nextPageToken": "p2"
            })
            .to_string(),
        )
        .create_async()
        .await;
    let page_two = server
        .mock("GET", "/lists/l1/tasks")
        .match_query(Matcher::Exact(SECOND_PAGE.to_string()))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [{
                    "id": "t2",
                    "title": "Water plants",
                    "status": "needsAction",
                    "updated": "2024-05-02T07:00:00.000Z",
                    "notes": "balcony"
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let source = client(&server);
    let snapshot = fetch_snapshot(&source).await.unwrap();

    lists.assert_async().await;
    page_one.assert_async().await;
    page_two.assert_async().await;

    assert_eq!(snapshot.len(), 2);
    assert!(!snapshot.contains("t-gone"));
    let paid = snapshot.get("t1").unwrap();
    assert_eq!(paid.status, TaskStatus::Completed);
    assert_eq!(paid.list_name, "Chores");
    assert_eq!(
        paid.completed_at,
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 59, 0).unwrap())
    );
    let plants = snapshot.get("t2").unwrap();
    assert_eq!(plants.notes.as_deref(), Some("balcony"));
    assert!(plants.completed_at.is_none());
}

#[tokio::test]
async fn error_status_fails_the_fetch() {
    let mut server = mockito::Server::new_async().await;
    let _lists = server
        .mock("GET", "/users/@me/lists")
        .match_query(Matcher::Any)
        .with_status(401)
        .create_async()
        .await;

    let source = client(&server);
    let err = fetch_snapshot(&source).await.expect_err("401 should fail");

    match err {
        Error::Fetch(inner) => assert!(matches!(
            *inner,
            Error::RemoteStatus { status: 401, .. }
        )),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn insert_posts_completed_task() {
    let mut server = mockito::Server::new_async().await;
    let insert = server
        .mock("POST", "/lists/l1/tasks")
        .match_header("authorization", "Bearer token-abc")
        .match_body(Matcher::PartialJson(json!({
            "title": "Pay rent",
            "status": "completed",
            "notes": "#taskkeep-archived"
        })))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "new-1",
                "title": "Pay rent",
                "status": "completed",
                "updated": "2024-05-03T10:00:00.000Z",
                "completed": "2024-05-01T08:59:00.000Z",
                "notes": "#taskkeep-archived"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let source = client(&server);
    let task = NewTask {
        title: "Pay rent".to_string(),
        status: TaskStatus::Completed,
        completed_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 59, 0).unwrap()),
        notes: Some("#taskkeep-archived".to_string()),
    };
    let created = source.insert_task("l1", &task).await.unwrap();

    insert.assert_async().await;
    assert_eq!(created.id, "new-1");
    assert!(created.is_completed());
    assert_eq!(created.list_id, "l1");
}

#[tokio::test]
async fn rejected_insert_reports_status() {
    let mut server = mockito::Server::new_async().await;
    let _insert = server
        .mock("POST", "/lists/l1/tasks")
        .with_status(503)
        .create_async()
        .await;

    let source = client(&server);
    let task = NewTask {
        title: "Pay rent".to_string(),
        status: TaskStatus::Completed,
        completed_at: None,
        notes: None,
    };
    let err = source.insert_task("l1", &task).await.expect_err("503");
    assert!(matches!(err, Error::RemoteStatus { status: 503, .. }));
    assert_eq!(err.exit_code(), 4);
}
