use std::io;

use actix_web::{middleware::Logger, App, HttpServer};
use ecom_admin::config::Config;
use ecom_admin::state::AppState;
use ecom_admin::store::Stores;
use ecom_admin::token::TokenIssuer;
use ecom_admin::{db, routes};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let stores = match config.database_url.as_deref() {
        Some(url) => {
            let database = db::connect(url, &config.database_name)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            Stores::mongo(&database)
        }
        None => {
            log::warn!("DATABASE_URL not set, data lives in memory and is lost on exit");
            Stores::in_memory()
        }
    };

    let state = AppState::new(stores, TokenIssuer::new(&config.jwt_secret, config.token_ttl));

    log::info!("listening on {}", config.bind_addr);
    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(Logger::default())
            .configure(move |cfg| routes::configure(cfg, &state))
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
