use matchsync_server::{
    api::app_router, build_state, config::Config, init_tracing, scheduler,
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let shutdown = CancellationToken::new();
    let state = build_state(&config, shutdown.clone()).await?;

    let scheduler = scheduler::start_sync_scheduler(
        state.clone(),
        config.sync_interval,
        config.sync_initial_delay,
    );

    let router = app_router(state, &config);
    tracing::info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    let signal = shutdown.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown requested"),
                _ = signal.cancelled() => {}
            }
            // Closes WebSocket loops, running jobs and the scheduler.
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = scheduler.await {
        tracing::warn!("Sync scheduler task ended abnormally: {}", e);
    }
    tracing::info!("Server stopped");
    Ok(())
}
