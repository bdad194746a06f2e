use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::info;

use stayline_assist::{OpenAiGenerator, StaticGenerator, TextGenerator};
use stayline_core::config::{AppConfig, ConfigError, LoadOptions};
use stayline_core::recommend::FALLBACK_EXPLANATION;
use stayline_db::repositories::{
    SqlBookingRepository, SqlEmployeeRepository, SqlPaymentRepository, SqlUserRepository,
};
use stayline_db::{connect, migrations, DbPool};
use stayline_gateway::{MockGateway, ProviderGateway, StripeGateway};

use crate::routes::AppState;
use crate::services::{BookingService, EmployeeService, PaymentService};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let gateway = select_gateway(&config);
    let explainer = select_explainer(&config);

    let bookings = Arc::new(SqlBookingRepository::new(db_pool.clone()));
    let payments = Arc::new(SqlPaymentRepository::new(db_pool.clone()));
    let users = Arc::new(SqlUserRepository::new(db_pool.clone()));
    let employees = Arc::new(SqlEmployeeRepository::new(db_pool.clone()));

    let state = AppState {
        bookings: Arc::new(BookingService::new(bookings.clone(), users.clone(), explainer)),
        payments: Arc::new(PaymentService::new(payments, bookings, users, gateway)),
        employees: Arc::new(EmployeeService::new(employees)),
    };

    Ok(Application { config, db_pool, state })
}

/// Real Stripe adapter when a secret key is configured, the in-memory double
/// otherwise so the server stays runnable without credentials.
fn select_gateway(config: &AppConfig) -> Arc<dyn ProviderGateway> {
    if config.stripe.secret_key.expose_secret().trim().is_empty() {
        info!(event_name = "system.bootstrap.gateway", provider = "mock", "payment gateway selected");
        Arc::new(MockGateway::new())
    } else {
        info!(event_name = "system.bootstrap.gateway", provider = "stripe", "payment gateway selected");
        Arc::new(StripeGateway::new(
            config.stripe.secret_key.clone(),
            config.stripe.api_base.clone(),
        ))
    }
}

fn select_explainer(config: &AppConfig) -> Arc<dyn TextGenerator> {
    match (&config.assist.enabled, &config.assist.api_key) {
        (true, Some(api_key)) => {
            info!(event_name = "system.bootstrap.explainer", kind = "openai", "explainer selected");
            Arc::new(OpenAiGenerator::new(
                api_key.clone(),
                config.assist.base_url.clone(),
                config.assist.model.clone(),
                Duration::from_secs(config.assist.timeout_secs),
            ))
        }
        _ => {
            info!(event_name = "system.bootstrap.explainer", kind = "static", "explainer selected");
            Arc::new(StaticGenerator::new(FALLBACK_EXPLANATION))
        }
    }
}
