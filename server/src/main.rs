use quill::{
    routes,
    setup::{setup_sentry, setup_tracing},
    state::AppState,
};
use tracing::info;

fn main() -> color_eyre::Result<()> {
    let _sentry_guard = setup_sentry();

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?
        .block_on(async { run_application().await })
}

async fn run_application() -> quill::Result<()> {
    setup_tracing("quill")?;

    let app_state = AppState::from_env().await?;
    info!(
        version = app_state.version(),
        "Starting quill at {}",
        app_state.config.base_url()
    );
    if app_state.config.development_mode {
        info!("Development mode is on, error pages include details");
    }

    let port = app_state.config.port;
    routes::run_server(routes::routes(app_state), port).await
}
