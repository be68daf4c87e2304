use actix_web::http::StatusCode;
use actix_web::{test, App};
use chrono::Duration;
use ecom_admin::models::{ProductInput, RegisterInput, Role};
use ecom_admin::routes;
use ecom_admin::state::AppState;
use ecom_admin::store::Stores;
use ecom_admin::token::TokenIssuer;
use serde_json::{json, Value};

fn state() -> AppState {
    AppState::new(
        Stores::in_memory(),
        TokenIssuer::new("api-test-secret", Duration::hours(1)),
    )
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(App::new().configure(|cfg| routes::configure(cfg, &$state))).await
    };
}

/// Sends the request and returns the status plus the decoded envelope.
macro_rules! call {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

/// Creates an account directly through the service layer, returning its id and token.
async fn account(state: &AppState, name: &str, email: &str, role: Role) -> (String, String) {
    let input = RegisterInput {
        name: name.to_string(),
        email: email.to_string(),
        password: "secret123".to_string(),
        role: None,
    };
    let auth = state.auth.register(input, role).await.unwrap();
    (auth.user.id, auth.token)
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

fn product_json(name: &str, category: &str) -> Value {
    json!({
        "name": name,
        "description": "A thing worth selling",
        "price": 19.5,
        "category": category,
        "stock": 4,
        "tags": ["Sale", "sale", " new "]
    })
}

async fn category(state: &AppState, name: &str) -> String {
    let input = serde_json::from_value(json!({ "name": name })).unwrap();
    state.categories.create(input).await.unwrap().id
}

#[actix_web::test]
async fn register_login_and_profile() {
    let state = state();
    let app = app!(state);

    let (status, body) = call!(
        app,
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "name": "Ann Lee",
            "email": "Ann@Example.com",
            "password": "secret123"
        }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["email"], "ann@example.com");
    assert_eq!(body["data"]["user"]["role"], "user");
    assert!(body["data"]["user"].get("password").is_none());
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = call!(
        app,
        test::TestRequest::get()
            .uri("/api/auth/profile")
            .insert_header(bearer(&token))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Ann Lee");

    let (status, body) = call!(
        app,
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "name": "Ann Again",
            "email": "ann@example.com",
            "password": "secret123"
        }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User with this email already exists");

    let (status, _) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "ann@example.com", "password": "secret123" }))
    );
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn login_failures_look_the_same() {
    let state = state();
    let app = app!(state);
    account(&state, "Ann Lee", "ann@example.com", Role::User).await;

    let (wrong_status, wrong_body) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "ann@example.com", "password": "not-it" }))
    );
    let (unknown_status, unknown_body) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "nobody@example.com", "password": "not-it" }))
    );
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, unknown_status);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["message"], "Invalid credentials");
}

#[actix_web::test]
async fn admin_routes_need_an_admin() {
    let state = state();
    let app = app!(state);
    let (_, user_token) = account(&state, "Ann Lee", "ann@example.com", Role::User).await;
    let (_, admin_token) = account(&state, "Root", "root@example.com", Role::Admin).await;

    let (status, body) = call!(app, test::TestRequest::get().uri("/api/users"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access denied. No token provided.");

    let (status, _) = call!(
        app,
        test::TestRequest::get()
            .uri("/api/users")
            .insert_header(("Authorization", "Bearer not-a-token"))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call!(
        app,
        test::TestRequest::get()
            .uri("/api/admin/stats")
            .insert_header(bearer(&user_token))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, body) = call!(
        app,
        test::TestRequest::get()
            .uri("/api/users")
            .insert_header(bearer(&admin_token))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["users"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["pagination"]["total"], 2);

    let (status, body) = call!(
        app,
        test::TestRequest::get()
            .uri("/api/admin/stats")
            .insert_header(bearer(&admin_token))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalUsers"], 2);
    assert_eq!(body["data"]["totalOrders"], 0);
}

#[actix_web::test]
async fn admin_self_registration_is_refused() {
    let state = state();
    let app = app!(state);

    let request = || {
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "name": "Mallory",
            "email": "mallory@example.com",
            "password": "secret123",
            "role": "admin"
        }))
    };

    let (status, _) = call!(app, request());
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, user_token) = account(&state, "Ann Lee", "ann@example.com", Role::User).await;
    let (status, _) = call!(app, request().insert_header(bearer(&user_token)));
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, admin_token) = account(&state, "Root", "root@example.com", Role::Admin).await;
    let (status, body) = call!(app, request().insert_header(bearer(&admin_token)));
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["role"], "admin");
}

#[actix_web::test]
async fn deactivation_revokes_existing_tokens() {
    let state = state();
    let app = app!(state);
    let (user_id, user_token) = account(&state, "Ann Lee", "ann@example.com", Role::User).await;
    let (_, admin_token) = account(&state, "Root", "root@example.com", Role::Admin).await;

    let (status, body) = call!(
        app,
        test::TestRequest::put()
            .uri(&format!("/api/users/{}/deactivate", user_id))
            .insert_header(bearer(&admin_token))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isActive"], false);

    let (status, body) = call!(
        app,
        test::TestRequest::get()
            .uri("/api/auth/profile")
            .insert_header(bearer(&user_token))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token or user inactive.");

    let (status, body) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "ann@example.com", "password": "secret123" }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Account is deactivated");
}

#[actix_web::test]
async fn products_with_the_same_name_get_distinct_slugs() {
    let state = state();
    let app = app!(state);
    let (_, admin_token) = account(&state, "Root", "root@example.com", Role::Admin).await;
    let category_id = category(&state, "Shirts").await;

    let mut slugs = Vec::new();
    for _ in 0..3 {
        let (status, body) = call!(
            app,
            test::TestRequest::post()
                .uri("/api/products")
                .insert_header(bearer(&admin_token))
                .set_json(product_json("Blue Shirt", &category_id))
        );
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["category"]["name"], "Shirts");
        assert_eq!(body["data"]["tags"], json!(["Sale", "sale", "new"]));
        assert!(body["data"]["sku"].as_str().unwrap().starts_with("SKU-"));
        slugs.push(body["data"]["slug"].as_str().unwrap().to_string());
    }
    assert_eq!(slugs, ["blue-shirt", "blue-shirt-1", "blue-shirt-2"]);

    let (status, body) = call!(
        app,
        test::TestRequest::get().uri("/api/products/slug/blue-shirt-1")
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["slug"], "blue-shirt-1");

    let (status, body) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/products")
            .insert_header(bearer(&admin_token))
            .set_json(product_json("Orphan", "missing-category"))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid category ID");
}

#[actix_web::test]
async fn each_user_rates_a_product_once() {
    let state = state();
    let app = app!(state);
    let (user_id, user_token) = account(&state, "Ann Lee", "ann@example.com", Role::User).await;
    let category_id = category(&state, "Shirts").await;
    let input: ProductInput = serde_json::from_value(product_json("Blue Shirt", &category_id)).unwrap();
    let product = state.products.create(input).await.unwrap();
    let uri = format!("/api/products/{}/ratings", product.id);

    let (status, body) = call!(
        app,
        test::TestRequest::post()
            .uri(&uri)
            .insert_header(bearer(&user_token))
            .set_json(json!({ "rating": 4, "review": "Fits well" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalRatings"], 1);
    assert_eq!(body["data"]["averageRating"], 4.0);
    assert_eq!(body["data"]["ratings"][0]["user"]["_id"], user_id.as_str());
    assert_eq!(body["data"]["ratings"][0]["user"]["name"], "Ann Lee");

    let (status, body) = call!(
        app,
        test::TestRequest::post()
            .uri(&uri)
            .insert_header(bearer(&user_token))
            .set_json(json!({ "rating": 5 }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You have already rated this product");

    let (status, body) = call!(
        app,
        test::TestRequest::put()
            .uri(&uri)
            .insert_header(bearer(&user_token))
            .set_json(json!({ "rating": 2 }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ratings"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["averageRating"], 2.0);

    let (status, _) = call!(
        app,
        test::TestRequest::post()
            .uri(&uri)
            .insert_header(bearer(&user_token))
            .set_json(json!({ "rating": 9 }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call!(
        app,
        test::TestRequest::post().uri(&uri).set_json(json!({ "rating": 3 }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn categories_in_use_cannot_be_deleted() {
    let state = state();
    let app = app!(state);
    let (_, admin_token) = account(&state, "Root", "root@example.com", Role::Admin).await;

    let (status, body) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/categories")
            .insert_header(bearer(&admin_token))
            .set_json(json!({ "name": "Summer Hats", "description": "Wide brims" }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["slug"], "summer-hats");
    let category_id = body["data"]["_id"].as_str().unwrap().to_string();

    let (status, body) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/categories")
            .insert_header(bearer(&admin_token))
            .set_json(json!({ "name": "!!" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Category name must contain letters or numbers");

    let (status, body) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/categories")
            .insert_header(bearer(&admin_token))
            .set_json(json!({ "name": "Summer Hats" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Category with this name already exists");

    let input: ProductInput = serde_json::from_value(product_json("Straw Hat", &category_id)).unwrap();
    let product = state.products.create(input).await.unwrap();

    let (status, body) = call!(
        app,
        test::TestRequest::get().uri("/api/categories/with-count")
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["productCount"], 1);

    let category_uri = format!("/api/categories/{}", category_id);
    let (status, body) = call!(
        app,
        test::TestRequest::delete()
            .uri(&category_uri)
            .insert_header(bearer(&admin_token))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot delete category with existing products");

    let (status, _) = call!(
        app,
        test::TestRequest::delete()
            .uri(&format!("/api/admin/products/{}", product.id))
            .insert_header(bearer(&admin_token))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call!(
        app,
        test::TestRequest::delete()
            .uri(&category_uri)
            .insert_header(bearer(&admin_token))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call!(app, test::TestRequest::get().uri(&category_uri));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Category not found");
}

#[actix_web::test]
async fn listing_is_paginated() {
    let state = state();
    let app = app!(state);
    let category_id = category(&state, "Mugs").await;
    for i in 0..25 {
        let input: ProductInput =
            serde_json::from_value(product_json(&format!("Mug {}", i), &category_id)).unwrap();
        state.products.create(input).await.unwrap();
    }

    let (status, body) = call!(
        app,
        test::TestRequest::get().uri("/api/products?page=2&limit=10")
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["products"].as_array().unwrap().len(), 10);
    assert_eq!(
        body["data"]["pagination"],
        json!({ "page": 2, "limit": 10, "total": 25, "pages": 3 })
    );

    let (_, body) = call!(
        app,
        test::TestRequest::get().uri("/api/products?page=3&limit=10")
    );
    assert_eq!(body["data"]["products"].as_array().unwrap().len(), 5);

    let (status, body) = call!(
        app,
        test::TestRequest::get().uri("/api/products?page=18446744073709551615&limit=10")
    );
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["products"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["pagination"]["total"], 25);

    let (status, body) = call!(app, test::TestRequest::get().uri("/api/products?page=abc"));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn search_requires_a_term() {
    let state = state();
    let app = app!(state);
    let category_id = category(&state, "Mugs").await;
    for name in ["Red Mug", "Blue Plate"] {
        let input: ProductInput = serde_json::from_value(product_json(name, &category_id)).unwrap();
        state.products.create(input).await.unwrap();
    }

    let (status, body) = call!(app, test::TestRequest::get().uri("/api/products/search?q=mug"));
    assert_eq!(status, StatusCode::OK);
    let products = body["data"]["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["name"], "Red Mug");

    let (status, body) = call!(app, test::TestRequest::get().uri("/api/products/search"));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Search term is required");
}

#[actix_web::test]
async fn malformed_bodies_are_rejected_with_an_envelope() {
    let state = state();
    let app = app!(state);

    let (status, body) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/auth/login")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = call!(
        app,
        test::TestRequest::post().uri("/api/auth/register").set_json(json!({
            "name": "A",
            "email": "a@example.com",
            "password": "secret123"
        }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Name must be between 2 and 50 characters");
}
