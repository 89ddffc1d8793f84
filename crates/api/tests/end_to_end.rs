use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use toolkit_api::{AppState, auth::TokenKeys, build_router};
use toolkit_client::{
    Catalog, ClientError, HttpBackend, InstallStore, MemoryCache, ModuleId, Outcome, StoreOptions,
};
use toolkit_storage::{MemoryStorage, ToolkitStorage, seed_catalog};

async fn spawn_server() -> SocketAddr {
    let storage = Arc::new(MemoryStorage::new());
    seed_catalog(storage.as_ref()).await.unwrap();
    let storage: Arc<dyn ToolkitStorage> = storage;
    let state = AppState::new(
        storage,
        TokenKeys::new(b"e2e-secret", chrono::Duration::days(7)),
    );
    let app = build_router(state, Duration::from_secs(60));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn backend(addr: SocketAddr) -> Arc<HttpBackend> {
    Arc::new(HttpBackend::new(&format!("http://{}/api", addr), Duration::from_secs(5)).unwrap())
}

async fn open_store(backend: &Arc<HttpBackend>) -> InstallStore {
    InstallStore::open(
        backend.clone(),
        Arc::new(MemoryCache::new()),
        StoreOptions::default(),
    )
    .await
}

#[tokio::test]
async fn test_install_round_trip_against_server() {
    let addr = spawn_server().await;
    let backend = backend(addr);

    let catalog = Catalog::load(backend.as_ref()).await;
    assert!(!catalog.is_fallback());
    let flexbox = catalog.search("flexbox")[0];
    let reference = flexbox.reference;
    let before = flexbox.module.downloads;
    assert!(!reference.is_demo());

    let store = open_store(&backend).await;
    store
        .register("alice", "alice@example.com", "secret123")
        .await
        .unwrap();

    assert_eq!(store.install(reference).await.unwrap(), Outcome::Applied);
    assert_eq!(store.install(reference).await.unwrap(), Outcome::AlreadySatisfied);
    assert!(store.is_installed(reference.id()).await);

    let reloaded = Catalog::load(backend.as_ref()).await;
    let downloads = reloaded.get(reference.id()).unwrap().module.downloads;
    assert_eq!(downloads, before + 1);

    assert_eq!(store.uninstall(reference).await.unwrap(), Outcome::Applied);
    assert_eq!(
        store.uninstall(reference).await.unwrap(),
        Outcome::AlreadySatisfied
    );
    assert!(store.installed().await.is_empty());

    let reloaded = Catalog::load(backend.as_ref()).await;
    let downloads = reloaded.get(reference.id()).unwrap().module.downloads;
    assert_eq!(downloads, before + 1);
}

#[tokio::test]
async fn test_second_device_conflict_is_absorbed() {
    let addr = spawn_server().await;
    let backend = backend(addr);
    let catalog = Catalog::load(backend.as_ref()).await;
    let hooks = catalog.search("hooks")[0].reference;

    let laptop = open_store(&backend).await;
    laptop
        .register("alice", "alice@example.com", "secret123")
        .await
        .unwrap();
    let phone = open_store(&backend).await;
    phone.login("alice", "secret123").await.unwrap();

    assert_eq!(phone.install(hooks).await.unwrap(), Outcome::Applied);

    // The laptop has not seen the phone's install; the server answers 400.
    assert!(!laptop.is_installed(hooks.id()).await);
    assert_eq!(
        laptop.install(hooks).await.unwrap(),
        Outcome::AlreadySatisfied
    );
    assert!(laptop.is_installed(hooks.id()).await);

    // Logging in again picks up the server list.
    let user = laptop.login("alice", "secret123").await.unwrap();
    assert_eq!(user.installed_modules, vec![hooks.id()]);
}

#[tokio::test]
async fn test_session_errors_are_classified() {
    let addr = spawn_server().await;
    let backend = backend(addr);
    let store = open_store(&backend).await;

    let err = store.login("nobody", "secret123").await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { status: 400, .. }));

    let err = store.restore("not-a-token").await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthenticated));

    store
        .register("alice", "alice@example.com", "secret123")
        .await
        .unwrap();
    let err = store
        .install(toolkit_client::ModuleRef::Persisted(ModuleId(999)))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NotFound { .. }));
    assert!(store.installed().await.is_empty());
}
