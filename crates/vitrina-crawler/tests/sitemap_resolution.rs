//! Integration tests for sitemap discovery and recursive expansion against
//! `wiremock` servers.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vitrina_crawler::{resolve_sitemaps, FetchClient};

fn test_client() -> FetchClient {
    FetchClient::new(5, "vitrina-test/0.1", 4, 0, 0, false).expect("failed to build FetchClient")
}

fn xml_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "application/xml")
}

fn url_set(urls: &[String]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("<url><loc>{u}</loc></url>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</urlset>"#
    )
}

fn sitemap_index(children: &[String]) -> String {
    let entries: String = children
        .iter()
        .map(|u| format!("<sitemap><loc>{u}</loc></sitemap>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</sitemapindex>"#
    )
}

/// Seed domain with a robots.txt directive pointing at an index referencing
/// two children of 3 URLs each: exactly 2 groups totaling 6 URLs, tagged by
/// their respective child source.
#[tokio::test]
async fn robots_directive_index_with_two_children_yields_two_groups() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!("User-agent: *\nDisallow: /cart\nSitemap: {base}/sitemap_index.xml\n"),
            "text/plain",
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap_index.xml"))
        .respond_with(xml_response(sitemap_index(&[
            format!("{base}/sitemap-products.xml"),
            format!("{base}/sitemap-pages.xml"),
        ])))
        .mount(&server)
        .await;

    let product_urls: Vec<String> = (1..=3).map(|i| format!("{base}/p/{i}")).collect();
    let page_urls: Vec<String> = (1..=3).map(|i| format!("{base}/info/{i}")).collect();

    Mock::given(method("GET"))
        .and(path("/sitemap-products.xml"))
        .respond_with(xml_response(url_set(&product_urls)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap-pages.xml"))
        .respond_with(xml_response(url_set(&page_urls)))
        .mount(&server)
        .await;

    let client = test_client();
    let groups = resolve_sitemaps(&client, &base, 5, 4).await.unwrap();

    assert_eq!(groups.len(), 2, "expected 2 groups, got: {groups:?}");
    let total: usize = groups.iter().map(|g| g.urls.len()).sum();
    assert_eq!(total, 6);

    let products = groups
        .iter()
        .find(|g| g.source.ends_with("/sitemap-products.xml"))
        .expect("products group tagged by its source");
    assert_eq!(products.urls, product_urls);
    let pages = groups
        .iter()
        .find(|g| g.source.ends_with("/sitemap-pages.xml"))
        .expect("pages group tagged by its source");
    assert_eq!(pages.urls, page_urls);
}

#[tokio::test]
async fn falls_back_to_well_known_path_without_robots_directive() {
    let server = MockServer::start().await;
    let base = server.uri();

    // robots.txt exists but names no sitemap.
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("User-agent: *\n", "text/plain"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(xml_response(url_set(&[format!("{base}/p/1")])))
        .mount(&server)
        .await;

    let client = test_client();
    let groups = resolve_sitemaps(&client, &base, 5, 4).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert!(groups[0].source.ends_with("/sitemap.xml"));
    assert_eq!(groups[0].urls, vec![format!("{base}/p/1")]);
}

#[tokio::test]
async fn missing_sitemap_resolves_to_empty() {
    let server = MockServer::start().await;
    let client = test_client();
    let groups = resolve_sitemaps(&client, &server.uri(), 5, 4).await.unwrap();
    assert!(groups.is_empty());
}

/// Nodes nested beyond the depth cap yield nothing, while shallower
/// branches are kept.
#[tokio::test]
async fn depth_cap_drops_deep_branches_and_keeps_shallow_results() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!("Sitemap: {base}/sitemap_index.xml\n"),
            "text/plain",
        ))
        .mount(&server)
        .await;

    // Depth 1: index with a leaf child and a nested index child.
    Mock::given(method("GET"))
        .and(path("/sitemap_index.xml"))
        .respond_with(xml_response(sitemap_index(&[
            format!("{base}/sitemap-shallow.xml"),
            format!("{base}/sitemap-nested.xml"),
        ])))
        .mount(&server)
        .await;

    // Depth 2: one leaf, one further index.
    Mock::given(method("GET"))
        .and(path("/sitemap-shallow.xml"))
        .respond_with(xml_response(url_set(&[format!("{base}/p/1")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap-nested.xml"))
        .respond_with(xml_response(sitemap_index(&[format!(
            "{base}/sitemap-deep.xml"
        )])))
        .mount(&server)
        .await;

    // Depth 3 is beyond the cap: this node must never be fetched.
    Mock::given(method("GET"))
        .and(path("/sitemap-deep.xml"))
        .respond_with(xml_response(url_set(&[format!("{base}/p/hidden")])))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client();
    let groups = resolve_sitemaps(&client, &base, 2, 4).await.unwrap();

    assert_eq!(groups.len(), 1, "only the shallow branch survives");
    assert_eq!(groups[0].urls, vec![format!("{base}/p/1")]);
}

/// A forbidden or malformed child yields an empty result for that node only.
#[tokio::test]
async fn failing_children_do_not_abort_siblings() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!("Sitemap: {base}/sitemap_index.xml\n"),
            "text/plain",
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap_index.xml"))
        .respond_with(xml_response(sitemap_index(&[
            format!("{base}/sitemap-good.xml"),
            format!("{base}/sitemap-forbidden.xml"),
            format!("{base}/sitemap-broken.xml"),
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/sitemap-good.xml"))
        .respond_with(xml_response(url_set(&[format!("{base}/p/1")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap-forbidden.xml"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap-broken.xml"))
        .respond_with(xml_response("<html><body>not a sitemap</body></html>".to_string()))
        .mount(&server)
        .await;

    let client = test_client();
    let groups = resolve_sitemaps(&client, &base, 5, 4).await.unwrap();

    assert_eq!(groups.len(), 1);
    assert!(groups[0].source.ends_with("/sitemap-good.xml"));
}
