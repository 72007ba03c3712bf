mod common;

use std::sync::Arc;

use serde_json::{json, Value};

use carbench::dataset::read_csv;
use carbench::embedding::HashProvider;
use carbench::generation::GeneratorSource;
use carbench::ingest::Indexer;
use carbench::rag::RagPipeline;
use carbench::search::Retriever;
use carbench::server::router;
use carbench::store::memory::InMemoryStore;
use common::{FixedGenerator, CARS_CSV};

async fn start(store: Arc<InMemoryStore>, generator: Arc<FixedGenerator>) -> String {
    let pipeline = RagPipeline::new(
        Retriever::new(store, Arc::new(HashProvider::new(64)), "cars"),
        GeneratorSource::Fixed(generator),
        5,
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(Arc::new(pipeline));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn indexed_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    Indexer::new(store.clone(), Arc::new(HashProvider::new(64)), "cars")
        .reindex(read_csv(CARS_CSV.as_bytes()).unwrap())
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn test_root_and_health() {
    let base = start(Arc::new(InMemoryStore::new()), FixedGenerator::new("x")).await;
    let client = reqwest::Client::new();

    let root: Value = client.get(&base).send().await.unwrap().json().await.unwrap();
    assert_eq!(root, json!({ "message": "Car Benchmarking API is running" }));

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_chat_returns_generated_text() {
    let generator = FixedGenerator::new("The Toyota 86 makes 205 HP.");
    let base = start(indexed_store().await, generator.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({
            "query": "How much horsepower does the Toyota 86 have?",
            "history": [{ "role": "user", "content": "hi" }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "response": "The Toyota 86 makes 205 HP." }));

    let prompt = generator.last_prompt().unwrap();
    assert!(prompt.contains("How much horsepower does the Toyota 86 have?"));
}

#[tokio::test]
async fn test_chat_history_is_optional() {
    let base = start(indexed_store().await, FixedGenerator::new("ok")).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({ "query": "anything" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_chat_null_history_accepted() {
    let base = start(indexed_store().await, FixedGenerator::new("ok")).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({ "query": "anything", "history": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "response": "ok" }));
}

#[tokio::test]
async fn test_pipeline_error_maps_to_500_detail() {
    let base = start(Arc::new(InMemoryStore::new()), FixedGenerator::new("x")).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({ "query": "anything" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "detail": "collection not found: cars" }));
}

#[tokio::test]
async fn test_missing_query_is_rejected() {
    let base = start(Arc::new(InMemoryStore::new()), FixedGenerator::new("x")).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({ "history": [] }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}
