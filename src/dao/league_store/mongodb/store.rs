use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, ClientSession, Collection, Database, IndexModel,
    bson::{DateTime, Document, doc},
    error::{Error as MongoError, TRANSIENT_TRANSACTION_ERROR},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{
        ACTIVITY_COLLECTION, LEAGUE_COLLECTION, MEMBERSHIP_COLLECTION, MongoActivityDocument,
        MongoLeagueDocument, MongoMembershipDocument, MongoSeasonDocument,
        MongoSeasonResultDocument, MongoSnapshotDocument, RESULT_COLLECTION, SEASON_COLLECTION,
        SNAPSHOT_COLLECTION, bson_uuid, doc_id, format_date,
    },
};
use crate::{
    dao::{
        league_store::LeagueStore,
        models::{
            ActivityLogEntity, LeagueEntity, MembershipEntity, PositionSnapshotEntity,
            SeasonClosure, SeasonEntity, SeasonResultEntity,
        },
        storage::{StorageError, StorageResult},
    },
    state::season_status::SeasonStatus,
};

const MAX_TRANSACTION_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct MongoLeagueStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

/// Failure inside a closure transaction, before it is mapped to a storage error.
enum TransactionFailure {
    Driver(MongoError),
    Rejected(StorageError),
}

impl From<MongoError> for TransactionFailure {
    fn from(err: MongoError) -> Self {
        TransactionFailure::Driver(err)
    }
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoLeagueStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let indexes: [(&'static str, &'static str, Document, IndexOptions); 6] = [
            (
                SEASON_COLLECTION,
                "league_id,season_number",
                doc! {"league_id": 1, "season_number": 1},
                IndexOptions::builder()
                    .name(Some("season_number_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            ),
            (
                SEASON_COLLECTION,
                "league_id (active)",
                doc! {"league_id": 1},
                IndexOptions::builder()
                    .name(Some("one_active_season_idx".to_owned()))
                    .unique(Some(true))
                    .partial_filter_expression(Some(doc! {"status": "active"}))
                    .build(),
            ),
            (
                MEMBERSHIP_COLLECTION,
                "league_id",
                doc! {"league_id": 1},
                IndexOptions::builder()
                    .name(Some("membership_league_idx".to_owned()))
                    .build(),
            ),
            (
                RESULT_COLLECTION,
                "season_id,user_id",
                doc! {"season_id": 1, "user_id": 1},
                IndexOptions::builder()
                    .name(Some("result_season_user_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            ),
            (
                SNAPSHOT_COLLECTION,
                "season_id,user_id,taken_on",
                doc! {"season_id": 1, "user_id": 1, "taken_on": 1},
                IndexOptions::builder()
                    .name(Some("snapshot_day_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            ),
            (
                ACTIVITY_COLLECTION,
                "user_id",
                doc! {"user_id": 1, "created_at": -1},
                IndexOptions::builder()
                    .name(Some("activity_user_idx".to_owned()))
                    .build(),
            ),
        ];

        for (collection, index, keys, options) in indexes {
            let model = IndexModel::builder().keys(keys).options(options).build();
            database
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index,
                    source,
                })?;
        }

        // Results are also read per user by the history endpoints.
        let model = IndexModel::builder()
            .keys(doc! {"user_id": 1, "created_at": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("result_user_idx".to_owned()))
                    .build(),
            )
            .build();
        database
            .collection::<Document>(RESULT_COLLECTION)
            .create_index(model)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: RESULT_COLLECTION,
                index: "user_id",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn client(&self) -> Client {
        let guard = self.inner.state.read().await;
        guard.client.clone()
    }

    async fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        let guard = self.inner.state.read().await;
        guard.database.collection::<T>(name)
    }

    async fn save_league(&self, league: LeagueEntity) -> MongoResult<()> {
        let id = league.id;
        let document: MongoLeagueDocument = league.into();
        self.collection::<MongoLeagueDocument>(LEAGUE_COLLECTION)
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(MongoDaoError::operation(LEAGUE_COLLECTION, "save"))?;
        Ok(())
    }

    async fn find_league(&self, id: Uuid) -> MongoResult<Option<LeagueEntity>> {
        self.collection::<MongoLeagueDocument>(LEAGUE_COLLECTION)
            .await
            .find_one(doc_id(id))
            .await
            .map_err(MongoDaoError::operation(LEAGUE_COLLECTION, "find"))?
            .map(LeagueEntity::try_from)
            .transpose()
    }

    async fn list_leagues(&self) -> MongoResult<Vec<LeagueEntity>> {
        let documents: Vec<MongoLeagueDocument> = self
            .collection::<MongoLeagueDocument>(LEAGUE_COLLECTION)
            .await
            .find(doc! {})
            .sort(doc! {"created_at": 1, "_id": 1})
            .await
            .map_err(MongoDaoError::operation(LEAGUE_COLLECTION, "list"))?
            .try_collect()
            .await
            .map_err(MongoDaoError::operation(LEAGUE_COLLECTION, "list"))?;

        documents.into_iter().map(LeagueEntity::try_from).collect()
    }

    async fn save_membership(&self, membership: MembershipEntity) -> MongoResult<()> {
        let user_id = membership.user_id;
        let document: MongoMembershipDocument = membership.into();
        self.collection::<MongoMembershipDocument>(MEMBERSHIP_COLLECTION)
            .await
            .replace_one(doc_id(user_id), &document)
            .upsert(true)
            .await
            .map_err(MongoDaoError::operation(MEMBERSHIP_COLLECTION, "save"))?;
        Ok(())
    }

    async fn list_members(&self, league_id: Uuid) -> MongoResult<Vec<MembershipEntity>> {
        let documents: Vec<MongoMembershipDocument> = self
            .collection::<MongoMembershipDocument>(MEMBERSHIP_COLLECTION)
            .await
            .find(doc! {"league_id": bson_uuid(league_id)})
            .sort(doc! {"joined_at": 1})
            .await
            .map_err(MongoDaoError::operation(MEMBERSHIP_COLLECTION, "list"))?
            .try_collect()
            .await
            .map_err(MongoDaoError::operation(MEMBERSHIP_COLLECTION, "list"))?;

        documents
            .into_iter()
            .map(MembershipEntity::try_from)
            .collect()
    }

    async fn count_members(&self, league_id: Uuid) -> MongoResult<u64> {
        self.collection::<MongoMembershipDocument>(MEMBERSHIP_COLLECTION)
            .await
            .count_documents(doc! {"league_id": bson_uuid(league_id)})
            .await
            .map_err(MongoDaoError::operation(MEMBERSHIP_COLLECTION, "count"))
    }

    async fn award_points(
        &self,
        user_id: Uuid,
        points: i64,
        now: SystemTime,
    ) -> MongoResult<Option<MembershipEntity>> {
        let updated = self
            .collection::<MongoMembershipDocument>(MEMBERSHIP_COLLECTION)
            .await
            .find_one_and_update(
                doc_id(user_id),
                doc! {
                    "$inc": {"points": points},
                    "$set": {"updated_at": DateTime::from_system_time(now)},
                },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(MongoDaoError::operation(MEMBERSHIP_COLLECTION, "award points"))?;

        updated.map(MembershipEntity::try_from).transpose()
    }

    async fn set_cached_ranks(&self, league_id: Uuid, ranks: Vec<(Uuid, u32)>) -> MongoResult<()> {
        let collection = self
            .collection::<MongoMembershipDocument>(MEMBERSHIP_COLLECTION)
            .await;
        for (user_id, rank) in ranks {
            collection
                .update_one(
                    doc! {"_id": bson_uuid(user_id), "league_id": bson_uuid(league_id)},
                    doc! {"$set": {"cached_rank": i64::from(rank)}},
                )
                .await
                .map_err(MongoDaoError::operation(MEMBERSHIP_COLLECTION, "cache rank"))?;
        }
        Ok(())
    }

    async fn insert_season(&self, season: SeasonEntity) -> StorageResult<()> {
        let key = format!("{}#{}", season.league_id, season.season_number);
        let document: MongoSeasonDocument = season.into();
        match self
            .collection::<MongoSeasonDocument>(SEASON_COLLECTION)
            .await
            .insert_one(&document)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(StorageError::duplicate("season", key)),
            Err(err) => Err(MongoDaoError::operation(SEASON_COLLECTION, "insert")(err).into()),
        }
    }

    async fn find_season(&self, id: Uuid) -> MongoResult<Option<SeasonEntity>> {
        self.collection::<MongoSeasonDocument>(SEASON_COLLECTION)
            .await
            .find_one(doc_id(id))
            .await
            .map_err(MongoDaoError::operation(SEASON_COLLECTION, "find"))?
            .map(SeasonEntity::try_from)
            .transpose()
    }

    async fn query_seasons(&self, filter: Document) -> MongoResult<Vec<SeasonEntity>> {
        let documents: Vec<MongoSeasonDocument> = self
            .collection::<MongoSeasonDocument>(SEASON_COLLECTION)
            .await
            .find(filter)
            .sort(doc! {"league_id": 1, "season_number": 1})
            .await
            .map_err(MongoDaoError::operation(SEASON_COLLECTION, "query"))?
            .try_collect()
            .await
            .map_err(MongoDaoError::operation(SEASON_COLLECTION, "query"))?;

        documents.into_iter().map(SeasonEntity::try_from).collect()
    }

    async fn latest_season(&self, league_id: Uuid) -> MongoResult<Option<SeasonEntity>> {
        self.collection::<MongoSeasonDocument>(SEASON_COLLECTION)
            .await
            .find_one(doc! {"league_id": bson_uuid(league_id)})
            .sort(doc! {"season_number": -1})
            .await
            .map_err(MongoDaoError::operation(SEASON_COLLECTION, "latest"))?
            .map(SeasonEntity::try_from)
            .transpose()
    }

    async fn claim_season(
        &self,
        id: Uuid,
        now: SystemTime,
        stale_before: SystemTime,
    ) -> MongoResult<bool> {
        let filter = doc! {
            "_id": bson_uuid(id),
            "$or": [
                {"status": SeasonStatus::Active.as_str()},
                {
                    "status": SeasonStatus::Closing.as_str(),
                    "claimed_at": {"$lt": DateTime::from_system_time(stale_before)},
                },
                {"status": SeasonStatus::Closing.as_str(), "claimed_at": null},
            ],
        };
        let update = doc! {
            "$set": {
                "status": SeasonStatus::Closing.as_str(),
                "claimed_at": DateTime::from_system_time(now),
            }
        };
        let result = self
            .collection::<MongoSeasonDocument>(SEASON_COLLECTION)
            .await
            .update_one(filter, update)
            .await
            .map_err(MongoDaoError::operation(SEASON_COLLECTION, "claim"))?;
        Ok(result.modified_count == 1)
    }

    async fn release_season(&self, id: Uuid) -> MongoResult<bool> {
        let result = self
            .collection::<MongoSeasonDocument>(SEASON_COLLECTION)
            .await
            .update_one(
                doc! {"_id": bson_uuid(id), "status": SeasonStatus::Closing.as_str()},
                doc! {
                    "$set": {"status": SeasonStatus::Active.as_str()},
                    "$unset": {"claimed_at": ""},
                },
            )
            .await
            .map_err(MongoDaoError::operation(SEASON_COLLECTION, "release"))?;
        Ok(result.modified_count == 1)
    }

    async fn commit_closure(&self, closure: SeasonClosure) -> StorageResult<()> {
        let client = self.client().await;
        let database = self.database().await;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let mut session = client
                .start_session()
                .await
                .map_err(|source| MongoDaoError::Transaction {
                    season_id: closure.season_id,
                    source,
                })?;

            let outcome = match session.start_transaction().await {
                Ok(()) => Self::write_closure(&database, &mut session, &closure).await,
                Err(err) => Err(err.into()),
            };

            let outcome = match outcome {
                Ok(()) => session.commit_transaction().await.map_err(Into::into),
                Err(failure) => {
                    if let Err(abort_err) = session.abort_transaction().await {
                        warn!(
                            season_id = %closure.season_id,
                            error = %abort_err,
                            "failed to abort closure transaction"
                        );
                    }
                    Err(failure)
                }
            };

            match outcome {
                Ok(()) => return Ok(()),
                Err(TransactionFailure::Rejected(err)) => return Err(err),
                Err(TransactionFailure::Driver(err)) if is_duplicate_key(&err) => {
                    return Err(StorageError::duplicate(
                        "season result",
                        closure.season_id.to_string(),
                    ));
                }
                Err(TransactionFailure::Driver(err))
                    if err.contains_label(TRANSIENT_TRANSACTION_ERROR)
                        && attempts < MAX_TRANSACTION_ATTEMPTS =>
                {
                    warn!(
                        season_id = %closure.season_id,
                        attempts,
                        error = %err,
                        "transient closure transaction failure; retrying"
                    );
                }
                Err(TransactionFailure::Driver(source)) => {
                    return Err(MongoDaoError::Transaction {
                        season_id: closure.season_id,
                        source,
                    }
                    .into());
                }
            }
        }
    }

    async fn write_closure(
        database: &Database,
        session: &mut ClientSession,
        closure: &SeasonClosure,
    ) -> Result<(), TransactionFailure> {
        let results = database.collection::<MongoSeasonResultDocument>(RESULT_COLLECTION);
        for result in &closure.results {
            let document: MongoSeasonResultDocument = result.clone().into();
            results.insert_one(&document).session(&mut *session).await?;
        }

        let memberships = database.collection::<MongoMembershipDocument>(MEMBERSHIP_COLLECTION);
        let closed_at = DateTime::from_system_time(closure.closed_at);
        for reset in &closure.resets {
            let update = memberships
                .update_one(
                    doc! {
                        "_id": bson_uuid(reset.user_id),
                        "league_id": bson_uuid(closure.league_id),
                    },
                    doc! {
                        "$set": {
                            "league_id": bson_uuid(reset.league_id),
                            "points": 0_i64,
                            "cached_rank": null,
                            "updated_at": closed_at,
                        }
                    },
                )
                .session(&mut *session)
                .await?;
            if update.matched_count == 0 {
                return Err(TransactionFailure::Rejected(StorageError::conflict(format!(
                    "user `{}` left league `{}` during closure",
                    reset.user_id, closure.league_id
                ))));
            }
        }

        let activity = database.collection::<MongoActivityDocument>(ACTIVITY_COLLECTION);
        for entry in &closure.activity {
            let document: MongoActivityDocument = entry.clone().into();
            activity.insert_one(&document).session(&mut *session).await?;
        }

        let seasons = database.collection::<MongoSeasonDocument>(SEASON_COLLECTION);
        let completed = seasons
            .update_one(
                doc! {
                    "_id": bson_uuid(closure.season_id),
                    "status": SeasonStatus::Closing.as_str(),
                },
                doc! {
                    "$set": {
                        "status": SeasonStatus::Completed.as_str(),
                        "completed_at": closed_at,
                    },
                    "$unset": {"claimed_at": ""},
                },
            )
            .session(&mut *session)
            .await?;
        if completed.matched_count == 0 {
            return Err(TransactionFailure::Rejected(StorageError::conflict(format!(
                "season `{}` is no longer closing",
                closure.season_id
            ))));
        }

        Ok(())
    }

    async fn results_matching(&self, filter: Document, sort: Document) -> MongoResult<Vec<SeasonResultEntity>> {
        let documents: Vec<MongoSeasonResultDocument> = self
            .collection::<MongoSeasonResultDocument>(RESULT_COLLECTION)
            .await
            .find(filter)
            .sort(sort)
            .await
            .map_err(MongoDaoError::operation(RESULT_COLLECTION, "query"))?
            .try_collect()
            .await
            .map_err(MongoDaoError::operation(RESULT_COLLECTION, "query"))?;

        documents
            .into_iter()
            .map(SeasonResultEntity::try_from)
            .collect()
    }

    async fn insert_snapshot(&self, snapshot: PositionSnapshotEntity) -> StorageResult<()> {
        let key = format!(
            "{}/{}/{}",
            snapshot.season_id,
            snapshot.user_id,
            format_date(snapshot.taken_on)
        );
        let document: MongoSnapshotDocument = snapshot.into();
        match self
            .collection::<MongoSnapshotDocument>(SNAPSHOT_COLLECTION)
            .await
            .insert_one(&document)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => {
                Err(StorageError::duplicate("position snapshot", key))
            }
            Err(err) => Err(MongoDaoError::operation(SNAPSHOT_COLLECTION, "insert")(err).into()),
        }
    }

    async fn snapshots_for_user(&self, user_id: Uuid) -> MongoResult<Vec<PositionSnapshotEntity>> {
        let documents: Vec<MongoSnapshotDocument> = self
            .collection::<MongoSnapshotDocument>(SNAPSHOT_COLLECTION)
            .await
            .find(doc! {"user_id": bson_uuid(user_id)})
            .sort(doc! {"taken_on": 1})
            .await
            .map_err(MongoDaoError::operation(SNAPSHOT_COLLECTION, "query"))?
            .try_collect()
            .await
            .map_err(MongoDaoError::operation(SNAPSHOT_COLLECTION, "query"))?;

        documents
            .into_iter()
            .map(PositionSnapshotEntity::try_from)
            .collect()
    }

    async fn activity_for_user(&self, user_id: Uuid) -> MongoResult<Vec<ActivityLogEntity>> {
        let documents: Vec<MongoActivityDocument> = self
            .collection::<MongoActivityDocument>(ACTIVITY_COLLECTION)
            .await
            .find(doc! {"user_id": bson_uuid(user_id)})
            .sort(doc! {"created_at": -1})
            .await
            .map_err(MongoDaoError::operation(ACTIVITY_COLLECTION, "query"))?
            .try_collect()
            .await
            .map_err(MongoDaoError::operation(ACTIVITY_COLLECTION, "query"))?;

        Ok(documents.into_iter().map(Into::into).collect())
    }
}

impl LeagueStore for MongoLeagueStore {
    fn save_league(&self, league: LeagueEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_league(league).await.map_err(Into::into) })
    }

    fn find_league(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<LeagueEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_league(id).await.map_err(Into::into) })
    }

    fn list_leagues(&self) -> BoxFuture<'static, StorageResult<Vec<LeagueEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_leagues().await.map_err(Into::into) })
    }

    fn save_membership(
        &self,
        membership: MembershipEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_membership(membership).await.map_err(Into::into) })
    }

    fn list_members(
        &self,
        league_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<MembershipEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_members(league_id).await.map_err(Into::into) })
    }

    fn count_members(&self, league_id: Uuid) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.count_members(league_id).await.map_err(Into::into) })
    }

    fn award_points(
        &self,
        user_id: Uuid,
        points: i64,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<MembershipEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .award_points(user_id, points, now)
                .await
                .map_err(Into::into)
        })
    }

    fn set_cached_ranks(
        &self,
        league_id: Uuid,
        ranks: Vec<(Uuid, u32)>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .set_cached_ranks(league_id, ranks)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_season(&self, season: SeasonEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_season(season).await })
    }

    fn find_season(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_season(id).await.map_err(Into::into) })
    }

    fn find_seasons(
        &self,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<SeasonEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let ids: Vec<_> = ids.into_iter().map(bson_uuid).collect();
            store
                .query_seasons(doc! {"_id": {"$in": ids}})
                .await
                .map_err(Into::into)
        })
    }

    fn list_seasons(
        &self,
        statuses: Vec<SeasonStatus>,
    ) -> BoxFuture<'static, StorageResult<Vec<SeasonEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let statuses: Vec<_> = statuses.iter().map(|status| status.as_str()).collect();
            store
                .query_seasons(doc! {"status": {"$in": statuses}})
                .await
                .map_err(Into::into)
        })
    }

    fn latest_season(
        &self,
        league_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SeasonEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.latest_season(league_id).await.map_err(Into::into) })
    }

    fn claim_season(
        &self,
        id: Uuid,
        now: SystemTime,
        stale_before: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .claim_season(id, now, stale_before)
                .await
                .map_err(Into::into)
        })
    }

    fn release_season(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.release_season(id).await.map_err(Into::into) })
    }

    fn commit_closure(&self, closure: SeasonClosure) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.commit_closure(closure).await })
    }

    fn results_for_season(
        &self,
        season_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SeasonResultEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .results_matching(
                    doc! {"season_id": bson_uuid(season_id)},
                    doc! {"final_rank": 1},
                )
                .await
                .map_err(Into::into)
        })
    }

    fn results_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SeasonResultEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .results_matching(
                    doc! {"user_id": bson_uuid(user_id)},
                    doc! {"created_at": -1},
                )
                .await
                .map_err(Into::into)
        })
    }

    fn insert_snapshot(
        &self,
        snapshot: PositionSnapshotEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_snapshot(snapshot).await })
    }

    fn snapshots_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PositionSnapshotEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.snapshots_for_user(user_id).await.map_err(Into::into) })
    }

    fn activity_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ActivityLogEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.activity_for_user(user_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
