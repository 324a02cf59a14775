use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing::info;

use tea_disease_api::classifier::Classifier;
use tea_disease_api::config::Config;
use tea_disease_api::handlers;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    let classifier = Classifier::load(&config.model_path, &config.labels_path)
        .context("failed to load classifier artifact")?;
    info!(
        model = %config.model_path.display(),
        classes = classifier.labels().len(),
        "classifier loaded"
    );

    let state = web::Data::new(classifier);
    let allowed_origin = config.allowed_origin.clone();
    let route_prefix = config.route_prefix.clone();

    info!("server running at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(handlers::cors(&allowed_origin))
            .app_data(state.clone())
            .configure(handlers::routes(&route_prefix))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
