//! Integration tests for the bundled site adapters against mock servers.

mod support;

use std::sync::Arc;

use comic_dl_core::download::{ComicDownloader, DownloadConfig, SerieDownloadOptions};
use comic_dl_core::site::{
    AdapterOptions, CopymangaAdapter, SiteAdapter, SiteConfig, SiteError, ZerobywAdapter,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::socket_guard::start_mock_server_or_skip;

const ZEROBYW_SERIE_HTML: &str = r#"
<html><head><title>Blue Period</title></head><body>
  <div class="cl">
    <a class="uk-label" href="plugin.php?id=jameson_manhua&a=zz&zuozhe_name=Yamaguchi">Yamaguchi</a>
  </div>
  <div class="cl">
    <span class="uk-label">中文</span>
    <span class="uk-label">Japan</span>
    <span class="uk-label">已完结</span>
  </div>
  <div class="uk-grid-collapse">
    <div class="muludiv"><a href="/chapter/1">Ch 1</a></div>
    <div class="muludiv"><a href="/chapter/2">Ch 2</a></div>
  </div>
</body></html>
"#;

fn zerobyw_chapter_html(images: &[&str]) -> String {
    let imgs: String = images
        .iter()
        .map(|src| format!(r#"<img src="{src}">"#))
        .collect();
    format!(
        r#"<html><body><div class="wp"><div class="jameson_manhua"><div class="uk-zjimg">{imgs}</div></div></div></body></html>"#
    )
}

async fn mount_html(server: &MockServer, route: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_zerobyw_serie_info_from_html() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_html(&server, "/plugin.php", ZEROBYW_SERIE_HTML.to_string()).await;
    let adapter = ZerobywAdapter::with_base_url(&SiteConfig::default(), &server.uri()).unwrap();

    let serie = adapter
        .serie_info(&format!("{}/plugin.php", server.uri()))
        .await
        .expect("serie info should parse");

    assert_eq!(serie.title, "BluePeriod");
    let names: Vec<&str> = serie.chapters.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Ch 1", "Ch 2"]);
    let info = serie.info.expect("metadata should be present");
    assert_eq!(info.penciller.as_deref(), Some("Yamaguchi"));
    assert_eq!(info.language.as_deref(), Some("zh"));
    assert_eq!(info.status.as_deref(), Some("End"));
}

#[tokio::test]
async fn test_zerobyw_image_list_resolves_relative_chapter() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_html(
        &server,
        "/chapter/1",
        zerobyw_chapter_html(&["/img/1.jpg", "/img/2.jpg"]),
    )
    .await;
    let adapter = ZerobywAdapter::with_base_url(&SiteConfig::default(), &server.uri()).unwrap();

    let pages = adapter
        .image_list("/chapter/1", &AdapterOptions::new())
        .await
        .unwrap();

    assert_eq!(
        pages,
        vec![Some("/img/1.jpg".to_string()), Some("/img/2.jpg".to_string())]
    );
}

#[tokio::test]
async fn test_zerobyw_chapter_without_session_is_unauthorized() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_html(
        &server,
        "/chapter/1",
        r#"<html><body><div class="wp"></div></body></html>"#.to_string(),
    )
    .await;
    let adapter = ZerobywAdapter::with_base_url(&SiteConfig::default(), &server.uri()).unwrap();

    let result = adapter.image_list("/chapter/1", &AdapterOptions::new()).await;

    assert!(matches!(result, Err(SiteError::Unauthorized { .. })));
}

#[tokio::test]
async fn test_zerobyw_http_error_is_request_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/plugin.php"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    let adapter = ZerobywAdapter::with_base_url(&SiteConfig::default(), &server.uri()).unwrap();

    let error = adapter
        .serie_info(&format!("{}/plugin.php", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(error, SiteError::RequestFailed { .. }));
    assert!(error.to_string().contains("HTTP 403"));
}

#[tokio::test]
async fn test_zerobyw_sends_cookie_header() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/chapter/1"))
        .and(header("cookie", "session=abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(zerobyw_chapter_html(&["/img/1.jpg"])),
        )
        .mount(&server)
        .await;
    let config = SiteConfig {
        cookie: Some("session=abc\n".to_string()),
        ..SiteConfig::default()
    };
    let adapter = ZerobywAdapter::with_base_url(&config, &server.uri()).unwrap();

    let pages = adapter
        .image_list("/chapter/1", &AdapterOptions::new())
        .await
        .expect("cookie-matched mock should answer");

    assert_eq!(pages.len(), 1);
}

#[tokio::test]
async fn test_zerobyw_full_serie_download() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_html(&server, "/plugin.php", ZEROBYW_SERIE_HTML.to_string()).await;
    for chapter in 1..=2 {
        mount_html(
            &server,
            &format!("/chapter/{chapter}"),
            zerobyw_chapter_html(&[&format!("/img/{chapter}/a.jpg")]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path(format!("/img/{chapter}/a.jpg")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(format!("chapter {chapter}").into_bytes())
                    .insert_header("content-type", "image/jpeg"),
            )
            .mount(&server)
            .await;
    }
    let temp = TempDir::new().unwrap();
    let adapter = Arc::new(ZerobywAdapter::new(&SiteConfig::default()).unwrap());

    let summary = ComicDownloader::new(adapter, temp.path(), DownloadConfig::default())
        .download_serie(
            &format!("{}/plugin.php", server.uri()),
            &SerieDownloadOptions::default(),
        )
        .await
        .expect("serie should resolve");

    assert!(summary.is_success());
    assert_eq!(summary.completed(), 2);
    let first = temp.path().join("BluePeriod").join("Ch 1").join("01.jpg");
    assert_eq!(std::fs::read(first).unwrap(), b"chapter 1");
}

fn copymanga_serie_body() -> serde_json::Value {
    json!({
        "code": 200,
        "results": {
            "comic": {
                "name": "Blue Period",
                "brief": "A story about painting.",
                "region": { "display": "Japan" },
                "status": { "value": 0 },
                "author": [{ "name": "Yamaguchi" }],
                "theme": [{ "name": "Art" }, { "name": "Drama" }]
            },
            "groups": { "default": { "count": 2 } }
        }
    })
}

#[tokio::test]
async fn test_copymanga_serie_info_from_api() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/v3/comic2/blueperiod"))
        .and(header("webp", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(copymanga_serie_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/comic/blueperiod/group/default/chapters"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": {
                "list": [
                    { "index": 1, "name": "Ch 2", "uuid": "uuid-2" },
                    { "index": 0, "name": "Ch 1", "uuid": "uuid-1" }
                ]
            }
        })))
        .mount(&server)
        .await;
    let adapter = CopymangaAdapter::with_base_url(&SiteConfig::default(), &server.uri()).unwrap();

    let serie = adapter
        .serie_info("https://www.copymanga.org/comic/blueperiod")
        .await
        .expect("serie info should parse");

    assert_eq!(serie.title, "Blue Period");
    let indices: Vec<u32> = serie.chapters.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(
        serie.chapters[0].uri.as_deref(),
        Some("/api/v3/comic/blueperiod/chapter/uuid-1?platform=3")
    );
    let info = serie.info.expect("metadata should be present");
    assert_eq!(info.status.as_deref(), Some("Ongoing"));
    assert_eq!(info.tags.as_deref(), Some("Art,Drama"));
    assert_eq!(info.count.as_deref(), Some("2"));
    assert_eq!(info.location.as_deref(), Some("Japan"));
}

#[tokio::test]
async fn test_copymanga_image_list_orders_by_words() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/v3/comic/blueperiod/chapter/uuid-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": {
                "chapter": {
                    "contents": [
                        { "url": "https://img.example/c.webp" },
                        { "url": "https://img.example/a.webp" },
                        { "url": "https://img.example/b.webp" }
                    ],
                    "words": [2, 0, 1]
                }
            }
        })))
        .mount(&server)
        .await;
    let config = SiteConfig {
        format: Some("jpg".to_string()),
        ..SiteConfig::default()
    };
    let adapter = CopymangaAdapter::with_base_url(&config, &server.uri()).unwrap();

    let pages = adapter
        .image_list(
            "/api/v3/comic/blueperiod/chapter/uuid-1?platform=3",
            &AdapterOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        pages,
        vec![
            Some("https://img.example/a.webp".to_string()),
            Some("https://img.example/b.webp".to_string()),
            Some("https://img.example/c.webp".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_copymanga_malformed_payload_is_parse_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/v3/comic2/blueperiod"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    let adapter = CopymangaAdapter::with_base_url(&SiteConfig::default(), &server.uri()).unwrap();

    let result = adapter
        .serie_info("https://www.copymanga.org/comic/blueperiod")
        .await;

    assert!(matches!(result, Err(SiteError::ParseFailed { .. })));
}

#[tokio::test]
async fn test_copymanga_rejects_url_without_id() {
    let adapter = CopymangaAdapter::new(&SiteConfig::default()).unwrap();
    let result = adapter.serie_info("not a url").await;
    assert!(matches!(result, Err(SiteError::InvalidUrl { .. })));
}
