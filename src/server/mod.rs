pub mod responses;
pub mod routes;

use crate::inference::InferenceClient;
use actix_web::{middleware, web, App, HttpServer};

pub struct AppState {
    pub client: InferenceClient,
}

/// Registers every route. The image route is mounted under `public_prefix`.
pub fn configure(cfg: &mut web::ServiceConfig, public_prefix: &str) {
    cfg.route("/", web::get().to(routes::index))
        .route("/generate", web::post().to(routes::generate))
        .route("/models/status", web::get().to(routes::model_status))
        .route("/health", web::get().to(routes::health))
        .route(
            &format!("{}/{{filename}}", public_prefix.trim_end_matches('/')),
            web::get().to(routes::serve_image),
        );
}

pub async fn run(client: InferenceClient) -> std::io::Result<()> {
    let host = client.config().host.clone();
    let port = client.config().port;
    let public_prefix = client.config().public_prefix.clone();
    let state = web::Data::new(AppState { client });

    HttpServer::new(move || {
        let prefix = public_prefix.clone();
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(move |cfg| configure(cfg, &prefix))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
