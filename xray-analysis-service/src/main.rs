use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use xray_analysis_service::{create_app, init_tracing};
use xray_prompting::{GeminiClient, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = Settings::from_env()?;
    let client = match GeminiClient::new(&settings) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Vision client unavailable");
            std::process::exit(1);
        }
    };
    info!(model = %client.model(), base_url = %settings.base_url, "Vision client ready");

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3000);

    let app = create_app(Arc::new(client));
    let listener = TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    let addr = listener.local_addr()?;

    info!("Chest X-ray Prompting Service starting on {}", addr);
    info!("Analysis endpoint: POST http://{}/analyze", addr);
    info!("Adaptive endpoint: POST http://{}/adaptive", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
