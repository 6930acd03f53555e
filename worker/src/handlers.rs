use actix_web::{HttpResponse, Responder};

pub async fn home() -> impl Responder {
    HttpResponse::Ok().body("Quiz Bot is running!")
}

/// Liveness probe for the container health check.
pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("OK")
}
