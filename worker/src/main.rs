mod config;
mod handlers;
mod routes;
mod worker_service;

use actix_web::{App, HttpServer};
use anyhow::Context;
use config::Config;
use quizcast_services::{BotApi, JsonStore, QuizEngine, TelegramService};
use std::sync::Arc;
use worker_service::WorkerService;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env()?;

    log::info!("Starting Quiz Bot, health server on {}:{}", config.server_host, config.server_port);

    let store = JsonStore::new(&config.data_dir)?;
    let engine = QuizEngine::load(store).shared();

    let api: Arc<dyn BotApi> = Arc::new(
        TelegramService::new(&config.telegram_api_url, &config.bot_token, config.poll_timeout)
            .context("Failed to initialize Telegram client")?,
    );

    let worker_service = WorkerService::new(api, engine, config.clone());

    // Start the bot in a background task
    let worker = tokio::spawn(async move {
        worker_service.start().await;
    });

    // Minimal HTTP server for health checks
    let server = HttpServer::new(|| App::new().configure(routes::configure))
        .bind((config.server_host.as_str(), config.server_port))
        .with_context(|| format!("Failed to bind {}:{}", config.server_host, config.server_port))?
        .run();

    tokio::select! {
        result = server => result.context("Health server failed")?,
        result = worker => {
            result.context("Bot worker panicked")?;
            anyhow::bail!("Bot worker stopped");
        }
    }

    Ok(())
}
