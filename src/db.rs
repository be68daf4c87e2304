use mongodb::bson::doc;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};

use crate::models::{Category, Product, User};
use crate::store::mongo::{CATEGORIES, PRODUCTS, USERS};

/// Connects to MongoDB and makes sure the indexes the services rely on exist.
pub async fn connect(database_url: &str, database_name: &str) -> mongodb::error::Result<Database> {
    let client_options = ClientOptions::parse(database_url).await?;
    let client = Client::with_options(client_options)?;
    let db = client.database(database_name);
    ensure_indexes(&db).await?;
    log::info!("connected to MongoDB database '{}'", database_name);
    Ok(db)
}

fn unique(keys: mongodb::bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn ensure_indexes(db: &Database) -> mongodb::error::Result<()> {
    let users: Collection<User> = db.collection(USERS);
    users.create_index(unique(doc! { "email": 1 }), None).await?;

    let categories: Collection<Category> = db.collection(CATEGORIES);
    categories
        .create_indexes(vec![unique(doc! { "name": 1 }), unique(doc! { "slug": 1 })], None)
        .await?;

    let products: Collection<Product> = db.collection(PRODUCTS);
    products
        .create_indexes(
            vec![
                unique(doc! { "sku": 1 }),
                unique(doc! { "slug": 1 }),
                IndexModel::builder().keys(doc! { "category": 1 }).build(),
                IndexModel::builder()
                    .keys(doc! { "name": "text", "description": "text", "tags": "text" })
                    .build(),
            ],
            None,
        )
        .await?;
    Ok(())
}
