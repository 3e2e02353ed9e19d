use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use lotto_backend::config::{Config, RecommendConfig, SourceConfig, WorkerConfig};
use lotto_backend::routes::build_router;
use lotto_backend::source::canned::CannedDrawSource;
use lotto_backend::state::AppState;
use lotto_backend::store::Store;

pub struct TestApp {
    pub app: Router,
    pub store: Arc<Store>,
    pub source: Arc<CannedDrawSource>,
    _temp_dir: TempDir,
}

/// App wired to a canned draw source pre-seeded with `source_rounds`
/// published rounds (0 = source knows nothing yet).
pub async fn spawn_test_server(source_rounds: u32) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("lotto-test.sled");

    // Construct Config directly; set_var would race across parallel tests.
    let config = Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: sled_path.to_string_lossy().to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        source: SourceConfig {
            base_url: "http://127.0.0.1:0".to_string(),
            timeout_secs: 1,
            mock: true,
        },
        worker: WorkerConfig {
            is_leader: false,
            ingestion_cron: "0 50 20 * * Sat".to_string(),
            settlement_cron: "0 10 21 * * Sat".to_string(),
            timezone: "Asia/Seoul".to_string(),
        },
        recommend: RecommendConfig { default_window: 52 },
    };

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let source = Arc::new(CannedDrawSource::with_rounds(source_rounds));
    let (shutdown_tx, _) = broadcast::channel::<()>(8);

    let state = AppState::new(store.clone(), source.clone(), &config, shutdown_tx);
    let app = build_router(state);

    TestApp {
        app,
        store,
        source,
        _temp_dir: temp_dir,
    }
}
