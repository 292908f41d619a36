use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use configs::StorageConfig;
use futures_util::StreamExt;
use reqwest::StatusCode as HttpStatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use uuid::Uuid;

use server::startup::{build_app, build_state};

struct TestApp {
    base_url: String,
    addr: SocketAddr,
    dir: PathBuf,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

async fn start_server() -> anyhow::Result<TestApp> {
    // Use isolated temp files for both collections per test run
    let dir = std::env::temp_dir().join(format!("cart_service_e2e_{}", Uuid::new_v4()));
    tokio::fs::create_dir_all(&dir).await?;
    let products_file = dir.join("products.json");
    tokio::fs::write(&products_file, b"[]").await?;

    let storage = StorageConfig {
        data_dir: dir.to_string_lossy().into_owned(),
        products_file: products_file.to_string_lossy().into_owned(),
        carts_file: dir.join("carts.json").to_string_lossy().into_owned(),
        public_dir: dir.join("public").to_string_lossy().into_owned(),
        ..StorageConfig::default()
    };
    let state = build_state(&storage).await?;
    let app = build_app(state, &storage);

    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("server error: {}", e); }
    });

    Ok(TestApp { base_url, addr, dir })
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().build().expect("reqwest client")
}

async fn create_product(c: &reqwest::Client, app: &TestApp, body: Value) -> anyhow::Result<String> {
    let res = c.post(app.url("/api/products")).json(&body).send().await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    let body = res.json::<Value>().await?;
    let id = body["payload"]
        .as_array()
        .and_then(|a| a.last())
        .and_then(|p| p["id"].as_str())
        .expect("created id")
        .to_string();
    Ok(id)
}

#[tokio::test]
async fn e2e_public_health() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client().get(app.url("/health")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn e2e_product_crud() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();

    let id = create_product(&c, &app, json!({"name": "Mug", "price": 12, "category": "Cups"})).await?;

    let res = c.get(app.url(&format!("/api/products/{}", id))).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["status"], "success");
    assert_eq!(body["payload"]["name"], "Mug");

    let res = c
        .put(app.url(&format!("/api/products/{}", id)))
        .json(&json!({"id": "changed", "price": 15}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["payload"][0]["id"], id.as_str());
    assert_eq!(body["payload"][0]["price"], 15.0);

    let res = c.delete(app.url(&format!("/api/products/{}", id))).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let res = c.get(app.url(&format!("/api/products/{}", id))).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
    let body = res.json::<Value>().await?;
    assert_eq!(body["status"], "error");

    let res = c.put(app.url("/api/products/nope")).json(&json!({"price": 1})).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn e2e_invalid_product_body_is_bad_request() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();
    let res = c.post(app.url("/api/products")).json(&json!({"name": "No price"})).send().await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);
    let res = c.post(app.url("/api/products")).json(&json!({"name": "", "price": 1})).send().await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn e2e_product_listing_pages() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();
    for i in 0..25 {
        create_product(&c, &app, json!({"name": format!("P{}", i), "price": i, "category": "cups"})).await?;
    }

    let res = c.get(app.url("/api/products?limit=10&page=3")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["payload"].as_array().map(Vec::len), Some(5));
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["hasNextPage"], false);
    assert_eq!(body["hasPrevPage"], true);
    assert_eq!(body["nextLink"], Value::Null);
    let prev = body["prevLink"].as_str().expect("prev link");
    assert!(prev.ends_with("/api/products?limit=10&page=2&sort=&query="));

    let res = c.get(app.url("/api/products?sort=desc&limit=1")).send().await?;
    let body = res.json::<Value>().await?;
    assert_eq!(body["payload"][0]["name"], "P24");

    let res = c.get(app.url("/api/products?limit=0")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);
    let res = c.get(app.url("/api/products?page=abc")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn e2e_cart_flow() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();
    let mug = create_product(&c, &app, json!({"name": "Mug", "price": 12})).await?;
    let cup = create_product(&c, &app, json!({"name": "Cup", "price": 5})).await?;

    let res = c.post(app.url("/api/carts")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::CREATED);
    let cid = res.json::<Value>().await?["payload"]["id"].as_str().expect("cart id").to_string();

    // add twice: one line, quantity 2
    for _ in 0..2 {
        let res = c.post(app.url(&format!("/api/carts/{}/products/{}", cid, mug))).send().await?;
        assert_eq!(res.status(), HttpStatusCode::OK);
    }
    let res = c.post(app.url(&format!("/api/carts/{}/product/{}", cid, cup))).send().await?;
    let body = res.json::<Value>().await?;
    assert_eq!(body["payload"]["products"][0], json!({"product": mug, "quantity": 2}));
    assert_eq!(body["payload"]["products"][1], json!({"product": cup, "quantity": 1}));

    let res = c.post(app.url(&format!("/api/carts/{}/products/missing", cid))).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);

    let res = c
        .put(app.url(&format!("/api/carts/{}/products/{}", cid, cup)))
        .json(&json!({"quantity": 4}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let res = c
        .put(app.url(&format!("/api/carts/{}/products/{}", cid, cup)))
        .json(&json!({"quantity": -2}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);

    // populated view resolves products and drops deleted ones
    c.delete(app.url(&format!("/api/products/{}", mug))).send().await?;
    let res = c.get(app.url(&format!("/api/carts/{}", cid))).send().await?;
    let body = res.json::<Value>().await?;
    let lines = body["payload"]["products"].as_array().expect("lines").clone();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["product"]["name"], "Cup");
    assert_eq!(lines[0]["quantity"], 4);

    let res = c
        .put(app.url(&format!("/api/carts/{}", cid)))
        .json(&json!({"products": [{"product": "missing", "quantity": 1}]}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);
    let res = c.put(app.url(&format!("/api/carts/{}", cid))).json(&json!({"products": "x"})).send().await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);
    let res = c
        .put(app.url(&format!("/api/carts/{}", cid)))
        .json(&json!({"products": [{"product": cup, "quantity": 7}]}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    assert_eq!(res.json::<Value>().await?["payload"]["products"], json!([{"product": cup, "quantity": 7}]));

    let res = c.delete(app.url(&format!("/api/carts/{}/products/{}", cid, cup))).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let res = c.delete(app.url(&format!("/api/carts/{}", cid))).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    assert_eq!(res.json::<Value>().await?["payload"]["products"], json!([]));

    let res = c.get(app.url("/api/carts/nope")).send().await?;
    assert_eq!(res.status(), HttpStatusCode::NOT_FOUND);
    Ok(())
}

async fn next_text<S>(ws: &mut S) -> anyhow::Result<Value>
where
    S: futures_util::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await?
            .ok_or_else(|| anyhow::anyhow!("socket closed"))??;
        if let WsMessage::Text(text) = frame {
            return Ok(serde_json::from_str(&text)?);
        }
    }
}

#[tokio::test]
async fn e2e_realtime_broadcasts_product_changes() -> anyhow::Result<()> {
    let app = start_server().await?;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", app.addr)).await?;
    // give the server a moment to subscribe the new listener
    tokio::time::sleep(Duration::from_millis(100)).await;

    let c = client();
    let id = create_product(&c, &app, json!({"name": "Mug", "price": 12})).await?;
    let added = next_text(&mut ws).await?;
    assert_eq!(added["event"], "productAdded");
    assert_eq!(added["data"]["id"], id.as_str());

    c.delete(app.url(&format!("/api/products/{}", id))).send().await?;
    let deleted = next_text(&mut ws).await?;
    assert_eq!(deleted, json!({"event": "productDeleted", "data": id}));
    Ok(())
}

#[tokio::test]
async fn e2e_realtime_client_frames_mutate_catalog() -> anyhow::Result<()> {
    use futures_util::SinkExt;

    let app = start_server().await?;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", app.addr)).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let frame = json!({"event": "newProduct", "data": {"name": "Glass", "price": "4.5", "category": "cups"}});
    ws.send(WsMessage::Text(frame.to_string())).await?;
    let added = next_text(&mut ws).await?;
    assert_eq!(added["event"], "productAdded");
    assert_eq!(added["data"]["price"], 4.5);
    let id = added["data"]["id"].as_str().expect("id").to_string();

    ws.send(WsMessage::Text(json!({"event": "deleteProduct", "data": {"id": id}}).to_string())).await?;
    let deleted = next_text(&mut ws).await?;
    assert_eq!(deleted["event"], "productDeleted");

    ws.send(WsMessage::Text(json!({"event": "newProduct", "data": {"name": ""}}).to_string())).await?;
    let err = next_text(&mut ws).await?;
    assert_eq!(err["event"], "error");

    let listing = client().get(app.url("/api/products")).send().await?.json::<Value>().await?;
    assert_eq!(listing["payload"], json!([]));
    Ok(())
}
