pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod models;
pub mod password;
pub mod response;
pub mod routes;
pub mod services;
pub mod slug;
pub mod state;
pub mod store;
pub mod token;
pub mod validate;
