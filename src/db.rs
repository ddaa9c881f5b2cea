use anyhow::{Context, Result};
use mongodb::{Client, Database, bson::doc, options::ClientOptions};

pub async fn connect_to_mongo(uri: &str, db_name: &str) -> Result<Database> {
    let client_options = ClientOptions::parse(uri)
        .await
        .context("invalid DB_CONNECTION string")?;
    let client = Client::with_options(client_options)?;

    let db = client.database(db_name);

    db.run_command(doc! { "ping": 1 }, None)
        .await
        .context("MongoDB did not answer ping")?;

    tracing::info!(database = db_name, "Connected to MongoDB");
    Ok(db)
}
