mod common;

use std::{io::Cursor, sync::Arc};

use axum::http::{header, StatusCode};
use axum_test::TestServer;
use common::{counting_store, locator, CountingStorage};
use object_store_fs::{
    adapters::{
        inbound::http::router::{create_router, AppState},
        outbound::derivers::StyleDefinition,
    },
    app::AppBuilder,
    services::DerivativeCoordinator,
};
use tempfile::TempDir;

struct TestApp {
    server: TestServer,
    store: Arc<CountingStorage>,
    coordinator: Arc<DerivativeCoordinator>,
    _staging: TempDir,
}

fn test_app() -> TestApp {
    let staging = tempfile::tempdir().unwrap();
    let store = counting_store(&["mybucket"]);
    let styles: Vec<StyleDefinition> = serde_json::from_str(
        r#"[{"name": "thumbnail", "width": 10, "height": 10, "mode": "crop"}]"#,
    )
    .unwrap();

    let app = AppBuilder::new()
        .with_storage_client(store.clone())
        .with_style_definitions(styles)
        .with_staging_dir(staging.path())
        .build()
        .unwrap();

    let server = TestServer::new(create_router(AppState {
        coordinator: app.coordinator.clone(),
    }))
    .unwrap();

    TestApp {
        server,
        store,
        coordinator: app.coordinator,
        _staging: staging,
    }
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[tokio::test]
async fn missing_original_returns_404() {
    let app = test_app();

    app.server
        .get("/mybucket/styles/thumbnail/photos/cat.png")
        .expect_failure()
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn unknown_style_returns_404() {
    let app = test_app();
    let source = png(20, 20);
    app.store
        .seed(
            &locator("mybucket", "photos/cat.png"),
            &source,
        )
        .await;

    app.server
        .get("/mybucket/styles/poster/photos/cat.png")
        .expect_failure()
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn first_request_serves_generated_image_then_redirects() {
    let app = test_app();
    let source = png(40, 20);
    app.store
        .seed(
            &locator("mybucket", "photos/cat.png"),
            &source,
        )
        .await;

    let response = app
        .server
        .get("/mybucket/styles/thumbnail/photos/cat.png")
        .await;
    response.assert_status_ok();
    response.assert_header(header::CONTENT_TYPE, "image/png");

    let body = response.as_bytes();
    let thumb = image::load_from_memory(body).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (10, 10));
    assert_eq!(
        response.header(header::CONTENT_LENGTH).to_str().unwrap(),
        body.len().to_string()
    );

    app.coordinator.wait_for_uploads().await;

    let redirect = app
        .server
        .get("/mybucket/styles/thumbnail/photos/cat.png")
        .await;
    redirect.assert_status(StatusCode::MOVED_PERMANENTLY);
    redirect.assert_header(
        header::LOCATION,
        "http://localhost:9000/mybucket/styles/thumbnail/photos/cat.png",
    );
}

#[tokio::test]
async fn undecodable_original_is_a_server_error() {
    let app = test_app();
    app.store
        .seed(&locator("mybucket", "photos/broken.png"), b"not an image")
        .await;

    app.server
        .get("/mybucket/styles/thumbnail/photos/broken.png")
        .expect_failure()
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn special_character_keys_redirect_to_encoded_location() {
    let app = test_app();
    app.store
        .seed(&locator("mybucket", "photos/a#b c.png"), &png(20, 20))
        .await;
    app.store
        .seed(
            &locator("mybucket", "styles/thumbnail/photos/a#b c.png"),
            &png(10, 10),
        )
        .await;

    let redirect = app
        .server
        .get("/mybucket/styles/thumbnail/photos/a%23b%20c.png")
        .await;
    redirect.assert_status(StatusCode::MOVED_PERMANENTLY);
    redirect.assert_header(
        header::LOCATION,
        "http://localhost:9000/mybucket/styles/thumbnail/photos/a%23b%20c.png",
    );
}
