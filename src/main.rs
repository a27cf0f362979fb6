// Módulos de la aplicación
mod analyzer;
mod api;
mod app_state;
mod config;
mod error;
mod extract;
mod github;
mod llm;
mod models;
mod pitch;
mod prompt;

use std::sync::Arc;

use crate::app_state::AppState;
use anyhow::Context;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 2. Cargar configuración (sin GEMINI_API_KEY no se arranca)
    let cfg = config::AppConfig::from_env().context("Error al cargar la configuración")?;

    // 3. Construir el analizador
    let analyzer = analyzer::SubmissionAnalyzer::from_config(&cfg)
        .context("Error inicializando el analizador")?;
    info!(
        model = analyzer.model_name(),
        pitch = analyzer.pitch_enabled(),
        "Analizador listo"
    );

    // 4. Estado compartido
    let app_state = AppState {
        config: Arc::new(cfg),
        analyzer,
    };

    // 5. Router con CORS abierto
    let app = Router::new()
        .merge(api::create_router(app_state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // 6. Iniciar el servidor
    let server_addr = &app_state.config.server_addr;
    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {server_addr}"))?;
    info!("🚀 Servidor escuchando en http://{}", server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}
