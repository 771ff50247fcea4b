use anyhow::Context;
use tracing_subscriber::fmt::init;

use ecg_learning_api::{
    config::Config,
    services::content_import::seed_if_empty,
    stores::{MongoModuleStore, MongoTaskStore},
};

/// Loads the built-in ECG tasks and modules into an empty database.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();

    let config = Config::load().context("Failed to load configuration")?;

    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .context("Failed to connect to MongoDB")?;
    let mongo = mongo_client.database(&config.mongo_database);

    let tasks = MongoTaskStore::new(mongo.clone());
    let modules = MongoModuleStore::new(mongo);

    let report = seed_if_empty(&tasks, &modules).await?;
    tracing::info!(
        "Seeding finished: {} tasks, {} modules inserted",
        report.tasks_inserted,
        report.modules_inserted
    );

    Ok(())
}
