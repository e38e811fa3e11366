use std::{net::SocketAddr, process, sync::Arc};

use gemstore::{
    application::{
        admin::AdminService,
        categories::CategoryService,
        dashboard::DashboardService,
        error::AppError,
        orders::OrderService,
        products::ProductService,
        repos::{
            AdminsRepo, CategoriesRepo, CategoriesWriteRepo, DashboardRepo, OrdersRepo,
            OrdersWriteRepo, ProductsRepo, ProductsWriteRepo, StoreHealth,
        },
        storage::{ObjectStorage, RetryPolicy, RetryingObjectStorage},
    },
    cache::{
        CacheBackend, CacheClient, CacheConfig, CacheTrigger, KvCache, MemoryKvCache, ReadThrough,
        RedisKvCache,
    },
    config,
    infra::{
        auth::TokenIssuer,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, RateLimitRules, RateLimiter, SessionCookieSettings},
        telemetry,
        uploads::LocalObjectStorage,
    },
};
use sqlx::PgPool;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const SOURCE: &str = "gemstore::main";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = init_pool(&settings).await?;
    info!(target: SOURCE, "migrations applied");
    pool.close().await;
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let jwt_secret = settings
        .auth
        .jwt_secret
        .clone()
        .ok_or_else(|| InfraError::configuration("auth.jwt_secret is not configured"))
        .map_err(AppError::from)?;

    let pool = init_pool(&settings).await?;
    let repositories = Arc::new(PostgresRepositories::new(pool));

    let cache_config = CacheConfig::from(&settings.cache);
    let cache = CacheClient::new(init_cache_backend(&cache_config)?, cache_config.op_timeout());
    let reads = ReadThrough::new(cache.clone(), cache_config.ttl());

    let categories_repo: Arc<dyn CategoriesRepo> = repositories.clone();
    let categories_write_repo: Arc<dyn CategoriesWriteRepo> = repositories.clone();
    let products_repo: Arc<dyn ProductsRepo> = repositories.clone();
    let products_write_repo: Arc<dyn ProductsWriteRepo> = repositories.clone();
    let orders_repo: Arc<dyn OrdersRepo> = repositories.clone();
    let orders_write_repo: Arc<dyn OrdersWriteRepo> = repositories.clone();
    let admins_repo: Arc<dyn AdminsRepo> = repositories.clone();
    let dashboard_repo: Arc<dyn DashboardRepo> = repositories.clone();
    let store: Arc<dyn StoreHealth> = repositories.clone();

    let trigger = CacheTrigger::new(cache.clone(), categories_repo.clone());

    let uploads = Arc::new(
        LocalObjectStorage::new(
            settings.uploads.directory.clone(),
            &settings.uploads.public_base_url,
        )
        .map_err(|err| AppError::from(InfraError::from(err)))?,
    );
    let storage: Arc<dyn ObjectStorage> = Arc::new(RetryingObjectStorage::new(
        uploads.clone(),
        RetryPolicy {
            upload_retries: settings.uploads.upload_retries,
            delete_retries: settings.uploads.delete_retries,
            backoff: settings.uploads.retry_backoff,
        },
    ));

    let tokens = TokenIssuer::new(&jwt_secret, settings.auth.token_ttl);

    let api_state = ApiState {
        categories: Arc::new(CategoryService::new(
            categories_repo.clone(),
            categories_write_repo,
            products_repo.clone(),
            reads.clone(),
            trigger.clone(),
        )),
        products: Arc::new(ProductService::new(
            products_repo.clone(),
            products_write_repo,
            categories_repo,
            storage,
            reads.clone(),
            trigger.clone(),
        )),
        orders: Arc::new(OrderService::new(
            orders_repo,
            orders_write_repo,
            products_repo,
            reads.clone(),
            trigger.clone(),
        )),
        admin: Arc::new(AdminService::new(admins_repo, tokens, reads, trigger)),
        dashboard: Arc::new(DashboardService::new(dashboard_repo)),
        store,
        uploads,
        rate_limiter: RateLimiter::new(
            cache,
            std::time::Duration::from_secs(u64::from(settings.rate_limit.window_seconds.get())),
        ),
        rate_rules: RateLimitRules::new(
            settings.rate_limit.max_requests.get(),
            settings.rate_limit.product_max_requests.get(),
        ),
        session: SessionCookieSettings {
            secure: settings.auth.cookie_secure,
        },
        max_upload_bytes: usize::try_from(settings.uploads.max_request_bytes.get())
            .map_err(|_| InfraError::configuration("uploads.max_request_bytes out of range"))
            .map_err(AppError::from)?,
    };

    serve_http(&settings, api_state).await
}

async fn init_pool(settings: &config::Settings) -> Result<PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(
        database_url,
        settings.database.max_connections.get(),
        settings.database.acquire_timeout,
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(pool)
}

fn init_cache_backend(config: &CacheConfig) -> Result<Arc<dyn KvCache>, AppError> {
    match config.backend {
        CacheBackend::Redis => {
            let backend = RedisKvCache::open(&config.redis_url)
                .map_err(|err| AppError::from(InfraError::cache(err.to_string())))?;
            info!(target: SOURCE, url = %config.redis_url, "using redis response cache");
            Ok(Arc::new(backend))
        }
        CacheBackend::Memory => {
            warn!(target: SOURCE, "using in-process response cache; entries are not shared between instances");
            Ok(Arc::new(MemoryKvCache::with_capacity(
                config.memory_capacity_non_zero(),
            )))
        }
    }
}

async fn serve_http(settings: &config::Settings, api_state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(api_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target: SOURCE, addr = %settings.server.addr, "listening");

    let grace = settings.server.graceful_shutdown;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(grace))
    .await
    .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target: SOURCE, "server stopped");
    Ok(())
}

/// Resolves on ctrl-c; a second timer bounds how long in-flight requests may drain.
async fn shutdown_signal(grace: std::time::Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target: SOURCE, error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!(target: SOURCE, grace_secs = grace.as_secs(), "shutdown requested; draining");
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(target: SOURCE, "graceful shutdown window elapsed; exiting");
        process::exit(0);
    });
}
