use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::{debug, info};

use super::error::{MongoDaoError, MongoResult};

const PING_ATTEMPTS: u32 = 10;
const FIRST_PING_DELAY: Duration = Duration::from_millis(250);
const MAX_PING_DELAY: Duration = Duration::from_secs(5);

/// Connect, wait for the deployment to answer, and check it can run the per-season
/// closure transactions.
pub async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let mut attempts = 0;
    let mut delay = FIRST_PING_DELAY;
    while let Err(err) = database.run_command(doc! { "ping": 1 }).await {
        attempts += 1;
        if attempts >= PING_ATTEMPTS {
            return Err(MongoDaoError::InitialPing {
                attempts,
                source: err,
            });
        }
        debug!(attempts, error = %err, "MongoDB ping failed; retrying");
        sleep(delay).await;
        delay = (delay * 2).min(MAX_PING_DELAY);
    }

    ensure_transaction_support(&database).await?;
    info!(database = database_name, "connected to MongoDB");
    Ok((client, database))
}

/// Transactions need a replica set or a sharded cluster; a standalone server reports neither.
async fn ensure_transaction_support(database: &Database) -> MongoResult<()> {
    let hello = database
        .run_command(doc! { "hello": 1 })
        .await
        .map_err(|source| MongoDaoError::HealthPing { source })?;

    let replica_set = hello.get_str("setName").is_ok();
    let sharded = hello.get_str("msg").is_ok_and(|msg| msg == "isdbgrid");
    if replica_set || sharded {
        Ok(())
    } else {
        Err(MongoDaoError::TransactionsUnsupported {
            database: database.name().to_owned(),
        })
    }
}
