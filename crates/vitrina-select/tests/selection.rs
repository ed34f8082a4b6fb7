//! Integration tests for the product-page selection client against a
//! `wiremock` stand-in for the chat-completions endpoint.

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vitrina_core::{SiteConfig, TitledUrl};
use vitrina_select::SelectorClient;

fn test_site() -> SiteConfig {
    serde_yaml::from_str(
        r"
root_url: https://shop.example.com/
llm_batch_size: 20
price_tags:
  - tag: span
    class: price
",
    )
    .unwrap()
}

fn candidates() -> Vec<TitledUrl> {
    vec![
        TitledUrl {
            url: "https://shop.example.com/p/1".to_string(),
            title: "Aceite CBD 10% 10ml".to_string(),
        },
        TitledUrl {
            url: "https://shop.example.com/contacto".to_string(),
            title: "Contacto".to_string(),
        },
        TitledUrl {
            url: "https://shop.example.com/p/2".to_string(),
            title: "Crema corporal 250ml".to_string(),
        },
    ]
}

fn chat_body(content: &str) -> serde_json::Value {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

fn client_for(server: &MockServer) -> SelectorClient {
    SelectorClient::new(&server.uri(), "test-key", "test-model", 0.2, 5)
        .expect("failed to build SelectorClient")
}

#[tokio::test]
async fn selects_the_urls_named_by_the_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            r#"["https://shop.example.com/p/1", "https://shop.example.com/p/2"]"#,
        )))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let selected = client
        .select_product_urls(&test_site(), &candidates())
        .await;

    assert_eq!(
        selected
            .iter()
            .map(|pair| pair.url.as_str())
            .collect::<Vec<_>>(),
        vec![
            "https://shop.example.com/p/1",
            "https://shop.example.com/p/2"
        ]
    );
}

#[tokio::test]
async fn fenced_json_answers_are_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            "```json\n[\"https://shop.example.com/p/1\"]\n```",
        )))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let selected = client
        .select_product_urls(&test_site(), &candidates())
        .await;

    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].url, "https://shop.example.com/p/1");
}

/// Malformed output is retried up to 3 attempts, then the batch fails open
/// to zero selections rather than crashing.
#[tokio::test]
async fn malformed_answers_retry_three_times_then_fail_open() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            "I could not find any product pages, sorry!",
        )))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let selected = client
        .select_product_urls(&test_site(), &candidates())
        .await;

    assert!(selected.is_empty());
}

#[tokio::test]
async fn api_errors_also_fail_open() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let selected = client
        .select_product_urls(&test_site(), &candidates())
        .await;

    assert!(selected.is_empty());
}

#[tokio::test]
async fn empty_candidate_list_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("[]")))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let selected = client.select_product_urls(&test_site(), &[]).await;
    assert!(selected.is_empty());
}
