use crate::{
    models::{GenerationRequest, HealthStatus},
    server::{responses, AppState},
    storage::local::is_safe_file_name,
};
use actix_web::{web, Either, HttpResponse};

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>rimgen</title>
</head>
<body>
  <h1>Text to image</h1>
  <form id="generate" method="post" action="/generate">
    <input name="prompt" placeholder="a red fox in snow" required minlength="3" size="60">
    <button type="submit">Generate</button>
  </form>
  <p id="error" hidden></p>
  <img id="result" alt="" hidden>
  <script>
    document.getElementById("generate").addEventListener("submit", async (event) => {
      event.preventDefault();
      const error = document.getElementById("error");
      const result = document.getElementById("result");
      error.hidden = true;
      const response = await fetch("/generate", { method: "POST", body: new FormData(event.target) });
      const data = await response.json();
      if (!response.ok) {
        error.textContent = data.error + (data.suggestion ? " " + data.suggestion : "");
        error.hidden = false;
        return;
      }
      result.src = data.image_url;
      result.alt = data.prompt;
      result.hidden = false;
    });
  </script>
</body>
</html>
"#;

pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

pub async fn generate(
    state: web::Data<AppState>,
    body: Either<web::Json<GenerationRequest>, web::Form<GenerationRequest>>,
) -> HttpResponse {
    let request = match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };
    let orchestrator = state.client.orchestrator();

    match request.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        Some(selector) => match orchestrator.generate_with_model(&request.prompt, selector).await {
            Ok(outcome) => responses::outcome_response(&outcome),
            Err(e) => {
                log::warn!("Generation rejected: {}", e);
                responses::error_response(&e)
            }
        },
        None => match orchestrator.generate(&request.prompt).await {
            Ok(result) => responses::aggregate_response(&result),
            Err(e) => {
                log::warn!("Generation rejected: {}", e);
                responses::error_response(&e)
            }
        },
    }
}

pub async fn model_status(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.client.prober().status_report().await)
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let report = state.client.prober().health().await;
    match report.status {
        HealthStatus::Unhealthy => HttpResponse::ServiceUnavailable().json(report),
        HealthStatus::Healthy | HealthStatus::Degraded => HttpResponse::Ok().json(report),
    }
}

pub async fn serve_image(state: web::Data<AppState>, filename: web::Path<String>) -> HttpResponse {
    let filename = filename.into_inner();
    if !is_safe_file_name(&filename) {
        return HttpResponse::NotFound().finish();
    }
    match state.client.storage().load(&filename).await {
        Ok(Some(bytes)) => HttpResponse::Ok()
            .content_type(content_type_for(&filename))
            .body(bytes),
        Ok(None) => HttpResponse::NotFound().finish(),
        Err(e) => {
            log::error!("Failed to read {}: {}", filename, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
