use crate::test_utils::shared::{app_path, book, books, page_body, setup_client};
use serde_json::Value;
use std::time::Duration;
use usergrid_rs::{UsergridError, UsergridQuery};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};


#[cfg(test)]
mod iterator_tests {
    use super::*;

    fn titles(entities: &[Value]) -> Vec<String> {
        entities
            .iter()
            .map(|e| e["title"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_drains_two_pages_in_server_order_with_two_requests() {
        let server = MockServer::start().await;
        let first = books(0..20);
        let second = books(20..25);

        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param("limit", "20"))
            .and(query_param_is_missing("cursor"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(first.clone(), Some("c1"))))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param("limit", "20"))
            .and(query_param("cursor", "c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(second.clone(), Some(""))))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_client(&server);
        let mut iterator = client
            .iterate("books", &UsergridQuery::new())
            .await
            .expect("first page should load");

        let mut yielded = Vec::new();
        while iterator.has_next_entity() {
            let entity = iterator.get_next_entity().await.expect("entity");
            yielded.push(entity.get("title").unwrap().as_str().unwrap().to_string());
        }

        let mut expected = titles(&first);
        expected.extend(titles(&second));
        assert_eq!(yielded.len(), 25);
        assert_eq!(yielded, expected);
        assert_eq!(iterator.pages_fetched(), 2);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_single_page_without_cursor_has_exactly_len_entities() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(books(0..3), None)))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_client(&server);
        let mut iterator = client.iterate("books", &UsergridQuery::new()).await.unwrap();

        for _ in 0..3 {
            assert!(iterator.has_next_entity());
            iterator.get_next_entity().await.unwrap();
        }
        assert!(!iterator.has_next_entity());
        assert!(iterator.cursor().is_none());
    }

    #[tokio::test]
    async fn test_exhausted_after_last_page_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![book(0)], Some(""))))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_client(&server);
        let mut iterator = client.iterate("books", &UsergridQuery::new()).await.unwrap();
        iterator.get_next_entity().await.unwrap();

        assert!(!iterator.has_next_entity());
        let err = iterator.get_next_entity().await.unwrap_err();
        assert!(matches!(err, UsergridError::Exhausted));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_collection_is_immediately_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![], None)))
            .mount(&server)
            .await;

        let client = setup_client(&server);
        let mut iterator = client.iterate("books", &UsergridQuery::new()).await.unwrap();
        assert!(!iterator.has_next_entity());
        assert!(matches!(
            iterator.get_next_entity().await,
            Err(UsergridError::Exhausted)
        ));
    }

    #[tokio::test]
    async fn test_query_template_and_page_size_sent_on_every_page() {
        let server = MockServer::start().await;
        let ql = "select * where author = 'Hemingway' order by title asc";

        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param("ql", ql))
            .and(query_param("limit", "2"))
            .and(query_param_is_missing("cursor"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(books(0..2), Some("next-token"))))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param("ql", ql))
            .and(query_param("limit", "2"))
            .and(query_param("cursor", "next-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(books(2..3), None)))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_client(&server);
        let mut query = UsergridQuery::new();
        (&mut query).eq("author", "Hemingway").asc("title").limit(2);

        let iterator = client.iterate("books", &query).await.unwrap();
        assert_eq!(iterator.page_size(), 2);
        let all = iterator.collect_remaining().await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_page_fetch_leaves_iterator_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param_is_missing("cursor"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![book(0)], Some("c1"))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param("cursor", "c1"))
            .respond_with(ResponseTemplate::new(503).set_body_json(
                test_utils::shared::error_body("service_unavailable", "try later"),
            ))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param("cursor", "c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![book(1)], None)))
            .mount(&server)
            .await;

        let client = setup_client(&server);
        let mut iterator = client.iterate("books", &UsergridQuery::new()).await.unwrap();
        iterator.get_next_entity().await.unwrap();

        let err = iterator.get_next_entity().await.unwrap_err();
        assert!(matches!(err, UsergridError::Server { status: 503, .. }));
        assert!(err.is_retryable());
        assert!(iterator.has_next_entity());
        assert_eq!(iterator.cursor(), Some("c1"));
        assert_eq!(iterator.pages_fetched(), 1);
        assert_eq!(iterator.buffered(), 0);

        let entity = iterator.get_next_entity().await.expect("retry should succeed");
        assert_eq!(entity.get_as::<String>("title").as_deref(), Some("Book 1"));
        assert!(!iterator.has_next_entity());
    }

    #[tokio::test]
    async fn test_transport_failure_propagates_and_keeps_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param_is_missing("cursor"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![book(0)], Some("c1"))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param("cursor", "c1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page_body(vec![book(1)], None))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = usergrid_rs::UsergridConfig::new(
            &server.uri(),
            test_utils::shared::ORG,
            test_utils::shared::APP,
        )
        .timeout(Duration::from_millis(300));
        let client = test_utils::shared::setup_client_with_config(config);
        let mut iterator = client.iterate("books", &UsergridQuery::new()).await.unwrap();
        iterator.get_next_entity().await.unwrap();

        let err = iterator.get_next_entity().await.unwrap_err();
        assert!(matches!(err, UsergridError::Transport(_)), "got {err:?}");
        assert!(iterator.has_next_entity());
        assert_eq!(iterator.cursor(), Some("c1"));
        assert_eq!(iterator.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn test_configured_page_size_is_default_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(books(0..1), None)))
            .expect(1)
            .mount(&server)
            .await;

        let config = usergrid_rs::UsergridConfig::new(
            &server.uri(),
            test_utils::shared::ORG,
            test_utils::shared::APP,
        )
        .page_size(50);
        let client = test_utils::shared::setup_client_with_config(config);
        let iterator = client.iterate("books", &UsergridQuery::new()).await.unwrap();
        assert_eq!(iterator.page_size(), 50);
        assert_eq!(iterator.buffered(), 1);
    }

    #[tokio::test]
    async fn test_repeated_cursor_ends_iteration() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param_is_missing("cursor"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![book(0)], Some("same"))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param("cursor", "same"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![book(1)], Some("same"))))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_client(&server);
        let all = client
            .iterate("books", &UsergridQuery::new())
            .await
            .unwrap()
            .collect_remaining()
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_page_with_fresh_cursor_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param_is_missing("cursor"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![book(0)], Some("c1"))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param("cursor", "c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![], Some("c2"))))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param("cursor", "c2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![book(1)], None)))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_client(&server);
        let mut iterator = client.iterate("books", &UsergridQuery::new()).await.unwrap();
        iterator.get_next_entity().await.unwrap();

        let entity = iterator.get_next_entity().await.unwrap();
        assert_eq!(entity.get_as::<String>("title").as_deref(), Some("Book 1"));
        assert_eq!(iterator.pages_fetched(), 3);
        assert!(!iterator.has_next_entity());
    }

    #[tokio::test]
    async fn test_failure_after_skipped_empty_page_keeps_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param_is_missing("cursor"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![book(0)], Some("c1"))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param("cursor", "c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![], Some("c2"))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param("cursor", "c2"))
            .respond_with(ResponseTemplate::new(503).set_body_json(
                test_utils::shared::error_body("service_unavailable", "try later"),
            ))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(app_path("books")))
            .and(query_param("cursor", "c2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(vec![book(2)], None)))
            .mount(&server)
            .await;

        let client = setup_client(&server);
        let mut iterator = client.iterate("books", &UsergridQuery::new()).await.unwrap();
        iterator.get_next_entity().await.unwrap();
        let before = (iterator.cursor().map(str::to_string), iterator.pages_fetched());

        let err = iterator.get_next_entity().await.unwrap_err();
        assert!(matches!(err, UsergridError::Server { status: 503, .. }));
        let after = (iterator.cursor().map(str::to_string), iterator.pages_fetched());
        assert_eq!(before, after);
        assert_eq!(after, (Some("c1".to_string()), 1));
        assert_eq!(iterator.buffered(), 0);

        // The retry starts again from c1, walks past the empty page and reaches c2.
        let entity = iterator.get_next_entity().await.expect("retry should succeed");
        assert_eq!(entity.get_as::<String>("title").as_deref(), Some("Book 2"));
        assert_eq!(iterator.pages_fetched(), 3);
        assert!(!iterator.has_next_entity());
    }
}
