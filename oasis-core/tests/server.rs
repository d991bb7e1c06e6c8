//! End-to-end tests: islands served over HTTP by the axum router.

use std::ops::ControlFlow;

use axum::http::{Method, StatusCode};
use serde_json::Value;
use tokio::net::TcpListener;

use oasis_core::island::{ChildMode, Island};
use oasis_core::server::{props_for_request, Endpoint, IslandHandler, Payload, Router};

fn page() -> Island {
    let card = Island::new("card", "<div>{{.props.title}}</div>");
    card.add_prop("title", "Hi");

    let page = Island::new(
        "page",
        "<section>{{.children.card}}<p>{{.payload.greeting}}</p></section>",
    );
    page.add_prop("lang", "en").add_child(&card, ChildMode::Eager);
    page
}

fn router() -> Router {
    let get = IslandHandler::new(page(), |request, writer| {
        let mut payload = Payload::new();
        let lang = props_for_request(request)
            .and_then(|props| props.get("lang"))
            .and_then(Value::as_str)
            .unwrap_or("??")
            .to_string();
        payload.set("greeting", format!("hello ({lang})"));
        if let Ok(bytes) = payload.marshal() {
            let _ = writer.write(&bytes);
        }
    });

    // POST hydrates straight from the request body.
    let post = IslandHandler::new(page(), |request, writer| {
        let _ = writer.write(request.body());
    })
    .with_middleware(|request, writer| {
        if request.headers().contains_key("x-block") {
            writer.write_header(StatusCode::UNAUTHORIZED);
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    });

    Router::new().add_endpoints([
        Endpoint::new("/page")
            .handler(Method::GET, get)
            .handler(Method::POST, post),
        Endpoint::new("empty"),
    ])
}

async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router().into_axum();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn get_renders_page_with_handler_payload() {
    let base = spawn_server().await;

    let response = reqwest::get(format!("{base}/page")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.text().await.unwrap(),
        "<section><div>Hi</div><p>hello (en)</p></section>"
    );
}

#[tokio::test]
async fn post_hydrates_from_request_body() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/page"))
        .body(r#"{"greeting":"<posted>"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.text().await.unwrap(),
        "<section><div>Hi</div><p>&lt;posted&gt;</p></section>"
    );

    let response = client
        .post(format!("{base}/page"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 500);
}

#[tokio::test]
async fn middleware_can_reject() {
    let base = spawn_server().await;

    let response = reqwest::Client::new()
        .post(format!("{base}/page"))
        .header("x-block", "1")
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn unrouted_methods_and_paths() {
    let base = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client.delete(format!("{base}/page")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 405);

    let response = client.get(format!("{base}/empty")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
