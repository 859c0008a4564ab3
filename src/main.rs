use dotenvy::dotenv;
use snafu::ResultExt as _;
use tokio::net::TcpListener;

use screenshare::error::{
    ApplicationError, BindAddressSnafu, OpenStoreSnafu, TemplatesSnafu, WebServerSnafu,
};
use screenshare::service::store::Store;
use screenshare::{api, config, logger};

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = config::load()?;

    let _guard = logger::init(&config)?;

    let store = Store::open(config.store_backend, &config.data_dir)
        .await
        .context(OpenStoreSnafu)?;

    let app = api::create_app(store, &config).context(TemplatesSnafu)?;
    let router = api::create_router(app);

    let address = config.host_address;
    let listener = TcpListener::bind(address)
        .await
        .context(BindAddressSnafu { address })?;

    tracing::info!(%address, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context(WebServerSnafu)
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "could not listen for the shutdown signal");
        std::future::pending::<()>().await;
    }

    tracing::info!("shutting down");
}
