use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DB: &str = "league_seasons";
const APP_NAME: &str = "league-season-engine";

/// Parsed connection settings for [`super::MongoLeagueStore`].
#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database_name: String,
}

impl MongoConfig {
    /// Parse `uri`, tagging connections with the engine's application name.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri {
                uri: uri.to_owned(),
                source,
            })?;
        if options.app_name.is_none() {
            options.app_name = Some(APP_NAME.to_owned());
        }

        Ok(Self {
            options,
            database_name: db_name
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_DB)
                .to_owned(),
        })
    }
}
