use crate::handlers;
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/", web::get().to(handlers::home))
        .route("/health", web::get().to(handlers::health));
}
