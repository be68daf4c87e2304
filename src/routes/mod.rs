use actix_web::{guard, web, HttpRequest};

use crate::error::ApiError;
use crate::middleware::AuthMiddleware;
use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod categories;
pub mod products;
pub mod users;

pub(crate) fn auth_header(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// Registers shared state and the whole `/api` route table.
pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    let gate = state.gate.clone();

    cfg.app_data(web::Data::new(state.clone()))
        .app_data(
            web::JsonConfig::default()
                .error_handler(|err, _req| ApiError::validation(err.to_string()).into()),
        )
        .app_data(
            web::QueryConfig::default()
                .error_handler(|err, _req| ApiError::validation(err.to_string()).into()),
        )
        .service(
            web::scope("/api/auth")
                .route("/register", web::post().to(auth::register))
                .route("/login", web::post().to(auth::login))
                .service(
                    web::resource("/profile")
                        .wrap(AuthMiddleware::any_account(gate.clone()))
                        .route(web::get().to(auth::profile))
                        .route(web::put().to(auth::update_profile)),
                )
                .service(
                    web::resource("/change-password")
                        .wrap(AuthMiddleware::any_account(gate.clone()))
                        .route(web::put().to(auth::change_password)),
                ),
        )
        .service(
            web::scope("/api/users")
                .wrap(AuthMiddleware::admin(gate.clone()))
                .route("", web::get().to(users::list))
                .route("/{id}", web::get().to(users::get))
                .route("/{id}", web::put().to(users::update))
                .route("/{id}", web::delete().to(users::delete))
                .route("/{id}/deactivate", web::put().to(users::deactivate))
                .route("/{id}/activate", web::put().to(users::activate))
                .route("/{id}/role", web::put().to(users::change_role)),
        )
        .service(
            web::scope("/api/categories")
                .service(
                    web::resource("")
                        .guard(guard::Get())
                        .route(web::get().to(categories::list)),
                )
                .service(
                    web::resource("")
                        .guard(guard::Post())
                        .wrap(AuthMiddleware::admin(gate.clone()))
                        .route(web::post().to(categories::create)),
                )
                .route("/with-count", web::get().to(categories::with_count))
                .route("/slug/{slug}", web::get().to(categories::by_slug))
                .service(
                    web::resource("/{id}")
                        .guard(guard::Get())
                        .route(web::get().to(categories::get)),
                )
                .service(
                    web::resource("/{id}")
                        .guard(guard::Any(guard::Put()).or(guard::Delete()))
                        .wrap(AuthMiddleware::admin(gate.clone()))
                        .route(web::put().to(categories::update))
                        .route(web::delete().to(categories::delete)),
                ),
        )
        .service(
            web::scope("/api/products")
                .service(
                    web::resource("")
                        .guard(guard::Get())
                        .route(web::get().to(products::list)),
                )
                .service(
                    web::resource("")
                        .guard(guard::Post())
                        .wrap(AuthMiddleware::admin(gate.clone()))
                        .route(web::post().to(products::create)),
                )
                .route("/featured", web::get().to(products::featured))
                .route("/search", web::get().to(products::search))
                .route("/category/{category_id}", web::get().to(products::by_category))
                .route("/slug/{slug}", web::get().to(products::by_slug))
                .service(
                    web::resource("/{id}/ratings")
                        .wrap(AuthMiddleware::any_account(gate.clone()))
                        .route(web::post().to(products::add_rating))
                        .route(web::put().to(products::update_rating)),
                )
                .service(
                    web::resource("/{id}")
                        .guard(guard::Get())
                        .route(web::get().to(products::get)),
                )
                .service(
                    web::resource("/{id}")
                        .guard(guard::Any(guard::Put()).or(guard::Delete()))
                        .wrap(AuthMiddleware::admin(gate.clone()))
                        .route(web::put().to(products::update))
                        .route(web::delete().to(products::delete)),
                ),
        )
        .service(
            web::scope("/api/admin")
                .wrap(AuthMiddleware::admin(gate))
                .route("/stats", web::get().to(admin::stats))
                .route("/recent-products", web::get().to(admin::recent_products))
                .route("/recent-users", web::get().to(admin::recent_users))
                .route("/users", web::get().to(admin::users))
                .route("/products", web::get().to(admin::products))
                .route("/products", web::post().to(admin::create_product))
                .route("/products/{id}", web::get().to(admin::get_product))
                .route("/products/{id}", web::put().to(admin::update_product))
                .route("/products/{id}", web::delete().to(admin::delete_product)),
        );
}
