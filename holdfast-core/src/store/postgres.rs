//! Postgres-backed `Store` implementation.
//!
//! One struct per aggregate wrapping a shared `PgPool`, with `async_trait`
//! impls of the ports in `store::mod`. Queries are written with
//! `sqlx::query`/`query_as` against runtime-bound parameters rather than the
//! `sqlx::query!` compile-time macro, since the latter requires a live
//! database (or a checked-in `.sqlx` cache) at build time, a requirement
//! this repository's CI cannot assume. See `DESIGN.md`.
//!
//! `transition` on every repository is implemented as a single `sqlx`
//! transaction: `SELECT ... FOR UPDATE` on the current-state row, compare
//! `expected_from`, `UPDATE` the row, `INSERT` the transition, `COMMIT`.
//! This reads a single serializable unit of work using Postgres row locks
//! instead of `SERIALIZABLE` isolation, which would otherwise force retry
//! loops on every concurrent reconcile pass.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use holdfast_model::{
    DownloadClientId, DownloadId, EpisodeId, IndexerId, MovieId, QualityDefinitionId,
    QualityProfileId, SeasonId, SeriesId,
};
use sqlx::{PgPool, Row};

use crate::domain::{
    Download, DownloadState, EntityKind, Episode, EpisodeState, Fingerprint, Movie, MovieState,
    QualityDefinition, QualityItem, QualityProfile, QualityToken, Season, Series, SeriesState,
    Transition,
};
use crate::error::{CoreError, CoreResult};

use super::{
    DownloadClientConfig, DownloadRepository, EpisodeFilter, EpisodeMetadataUpdate, EpisodeRepository,
    IndexerSourceConfig, MovieFilter, MovieMetadataUpdate, MovieRepository, NewDownload,
    NewDownloadClient, NewIndexerSource, ProviderConfigRepository, QualityRepository, SeasonFilter,
    SeasonRepository, SeriesFilter, SeriesMetadataUpdate, SeriesRepository, TransitionLogReader,
};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore").finish()
    }
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        PostgresStore { pool }
    }

    async fn append_transition(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        kind: EntityKind,
        entity_id: i64,
        from_state: Option<&str>,
        to_state: &str,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO transitions (entity_kind, entity_id, from_state, to_state, at, metadata)
             VALUES ($1, $2, $3, $4, now(), $5)",
        )
        .bind(kind.to_string())
        .bind(entity_id)
        .bind(from_state)
        .bind(to_state)
        .bind(metadata)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

fn row_to_movie(row: &sqlx::postgres::PgRow) -> CoreResult<Movie> {
    let state: String = row.try_get("state")?;
    Ok(Movie {
        id: MovieId::new(row.try_get("id")?),
        external_id: row.try_get("external_id")?,
        title: row.try_get("title")?,
        year: row.try_get("year")?,
        monitored: row.try_get("monitored")?,
        quality_profile_id: QualityProfileId::new(row.try_get("quality_profile_id")?),
        path: row.try_get("path")?,
        state: state.parse().map_err(|e| CoreError::invalid(format!("{e}")))?,
        release_date: row.try_get("release_date")?,
        runtime_minutes: row.try_get("runtime_minutes")?,
        added_at: row.try_get("added_at")?,
    })
}

#[async_trait]
impl MovieRepository for PostgresStore {
    async fn get(&self, id: MovieId) -> CoreResult<Movie> {
        let row = sqlx::query("SELECT * FROM movies WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("movie {id}")))?;
        row_to_movie(&row)
    }

    async fn list(&self, filter: MovieFilter) -> CoreResult<Vec<Movie>> {
        let mut sql = String::from("SELECT * FROM movies WHERE 1=1");
        if filter.state.is_some() {
            sql.push_str(" AND state = $1");
        }
        if filter.monitored.is_some() {
            sql.push_str(" AND monitored = $2");
        }
        if filter.external_id.is_some() {
            sql.push_str(" AND external_id = $3");
        }
        sql.push_str(" ORDER BY id ASC");
        let mut query = sqlx::query(&sql);
        if let Some(state) = filter.state {
            query = query.bind(state.as_str());
        }
        if let Some(monitored) = filter.monitored {
            query = query.bind(monitored);
        }
        if let Some(external_id) = filter.external_id {
            query = query.bind(external_id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_movie).collect()
    }

    async fn upsert_metadata(&self, metadata: MovieMetadataUpdate) -> CoreResult<MovieId> {
        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query("SELECT id FROM movies WHERE external_id = $1 FOR UPDATE")
            .bind(metadata.external_id)
            .fetch_optional(&mut *tx)
            .await?;

        let id = if let Some(row) = existing {
            let id: i64 = row.try_get("id")?;
            sqlx::query(
                "UPDATE movies SET title = $2, year = $3, release_date = $4, runtime_minutes = $5
                 WHERE id = $1",
            )
            .bind(id)
            .bind(&metadata.title)
            .bind(metadata.year)
            .bind(metadata.release_date)
            .bind(metadata.runtime_minutes)
            .execute(&mut *tx)
            .await?;
            MovieId::new(id)
        } else {
            let row = sqlx::query(
                "INSERT INTO movies
                    (external_id, title, year, monitored, quality_profile_id, path, state,
                     release_date, runtime_minutes, added_at)
                 VALUES ($1, $2, $3, true, (SELECT id FROM quality_profiles ORDER BY id LIMIT 1),
                     NULL, $4, $5, $6, now())
                 RETURNING id",
            )
            .bind(metadata.external_id)
            .bind(&metadata.title)
            .bind(metadata.year)
            .bind(MovieState::Discovered.as_str())
            .bind(metadata.release_date)
            .bind(metadata.runtime_minutes)
            .fetch_one(&mut *tx)
            .await?;
            let id: i64 = row.try_get("id")?;
            Self::append_transition(
                &mut tx,
                EntityKind::Movie,
                id,
                None,
                MovieState::Discovered.as_str(),
                None,
            )
            .await?;
            MovieId::new(id)
        };
        tx.commit().await?;
        Ok(id)
    }

    async fn transition(
        &self,
        id: MovieId,
        expected_from: Option<MovieState>,
        to: MovieState,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT state FROM movies WHERE id = $1 FOR UPDATE")
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("movie {id}")))?;
        let current_str: String = row.try_get("state")?;
        let current: MovieState = current_str.parse().map_err(|e| CoreError::invalid(format!("{e}")))?;
        if expected_from != Some(current) {
            return Err(CoreError::Conflict);
        }
        sqlx::query("UPDATE movies SET state = $2 WHERE id = $1")
            .bind(id.get())
            .bind(to.as_str())
            .execute(&mut *tx)
            .await?;
        Self::append_transition(
            &mut tx,
            EntityKind::Movie,
            id.get(),
            Some(current.as_str()),
            to.as_str(),
            metadata,
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn set_path(&self, id: MovieId, path: String) -> CoreResult<()> {
        sqlx::query("UPDATE movies SET path = $2 WHERE id = $1")
            .bind(id.get())
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn row_to_series(row: &sqlx::postgres::PgRow) -> CoreResult<Series> {
    let state: String = row.try_get("state")?;
    Ok(Series {
        id: SeriesId::new(row.try_get("id")?),
        external_id: row.try_get("external_id")?,
        title: row.try_get("title")?,
        monitored: row.try_get("monitored")?,
        quality_profile_id: QualityProfileId::new(row.try_get("quality_profile_id")?),
        path: row.try_get("path")?,
        state: state.parse().map_err(|e| CoreError::invalid(format!("{e}")))?,
        added_at: row.try_get("added_at")?,
    })
}

#[async_trait]
impl SeriesRepository for PostgresStore {
    async fn get(&self, id: SeriesId) -> CoreResult<Series> {
        let row = sqlx::query("SELECT * FROM series WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("series {id}")))?;
        row_to_series(&row)
    }

    async fn list(&self, filter: SeriesFilter) -> CoreResult<Vec<Series>> {
        let mut sql = String::from("SELECT * FROM series WHERE 1=1");
        if filter.state.is_some() {
            sql.push_str(" AND state = $1");
        }
        if filter.monitored.is_some() {
            sql.push_str(" AND monitored = $2");
        }
        if filter.external_id.is_some() {
            sql.push_str(" AND external_id = $3");
        }
        sql.push_str(" ORDER BY id ASC");
        let mut query = sqlx::query(&sql);
        if let Some(state) = filter.state {
            query = query.bind(state.as_str());
        }
        if let Some(monitored) = filter.monitored {
            query = query.bind(monitored);
        }
        if let Some(external_id) = filter.external_id {
            query = query.bind(external_id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_series).collect()
    }

    async fn upsert_metadata(&self, metadata: SeriesMetadataUpdate) -> CoreResult<SeriesId> {
        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query("SELECT id FROM series WHERE external_id = $1 FOR UPDATE")
            .bind(metadata.external_id)
            .fetch_optional(&mut *tx)
            .await?;
        let id = if let Some(row) = existing {
            let id: i64 = row.try_get("id")?;
            sqlx::query("UPDATE series SET title = $2 WHERE id = $1")
                .bind(id)
                .bind(&metadata.title)
                .execute(&mut *tx)
                .await?;
            SeriesId::new(id)
        } else {
            let row = sqlx::query(
                "INSERT INTO series
                    (external_id, title, monitored, quality_profile_id, path, state, added_at)
                 VALUES ($1, $2, true, (SELECT id FROM quality_profiles ORDER BY id LIMIT 1),
                     NULL, $3, now())
                 RETURNING id",
            )
            .bind(metadata.external_id)
            .bind(&metadata.title)
            .bind(SeriesState::Unreleased.as_str())
            .fetch_one(&mut *tx)
            .await?;
            let id: i64 = row.try_get("id")?;
            Self::append_transition(
                &mut tx,
                EntityKind::Series,
                id,
                None,
                SeriesState::Unreleased.as_str(),
                None,
            )
            .await?;
            SeriesId::new(id)
        };
        tx.commit().await?;
        Ok(id)
    }

    async fn transition(
        &self,
        id: SeriesId,
        expected_from: Option<SeriesState>,
        to: SeriesState,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT state FROM series WHERE id = $1 FOR UPDATE")
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("series {id}")))?;
        let current_str: String = row.try_get("state")?;
        let current: SeriesState = current_str.parse().map_err(|e| CoreError::invalid(format!("{e}")))?;
        if expected_from != Some(current) {
            return Err(CoreError::Conflict);
        }
        sqlx::query("UPDATE series SET state = $2 WHERE id = $1")
            .bind(id.get())
            .bind(to.as_str())
            .execute(&mut *tx)
            .await?;
        Self::append_transition(
            &mut tx,
            EntityKind::Series,
            id.get(),
            Some(current.as_str()),
            to.as_str(),
            metadata,
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

fn row_to_season(row: &sqlx::postgres::PgRow) -> CoreResult<Season> {
    Ok(Season {
        id: SeasonId::new(row.try_get("id")?),
        series_id: SeriesId::new(row.try_get("series_id")?),
        season_number: (row.try_get::<i32, _>("season_number")? as u16).into(),
        monitored: row.try_get("monitored")?,
    })
}

#[async_trait]
impl SeasonRepository for PostgresStore {
    async fn get(&self, id: SeasonId) -> CoreResult<Season> {
        let row = sqlx::query("SELECT * FROM seasons WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("season {id}")))?;
        row_to_season(&row)
    }

    async fn list(&self, filter: SeasonFilter) -> CoreResult<Vec<Season>> {
        let mut sql = String::from("SELECT * FROM seasons WHERE 1=1");
        if filter.series_id.is_some() {
            sql.push_str(" AND series_id = $1");
        }
        if filter.monitored.is_some() {
            sql.push_str(" AND monitored = $2");
        }
        sql.push_str(" ORDER BY id ASC");
        let mut query = sqlx::query(&sql);
        if let Some(series_id) = filter.series_id {
            query = query.bind(series_id.get());
        }
        if let Some(monitored) = filter.monitored {
            query = query.bind(monitored);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_season).collect()
    }

    async fn upsert(
        &self,
        series_id: SeriesId,
        season_number: holdfast_model::SeasonNumber,
        monitored: bool,
    ) -> CoreResult<SeasonId> {
        let row = sqlx::query(
            "INSERT INTO seasons (series_id, season_number, monitored)
             VALUES ($1, $2, $3)
             ON CONFLICT (series_id, season_number) DO UPDATE SET monitored = EXCLUDED.monitored
             RETURNING id",
        )
        .bind(series_id.get())
        .bind(season_number.value() as i32)
        .bind(monitored)
        .fetch_one(&self.pool)
        .await?;
        Ok(SeasonId::new(row.try_get("id")?))
    }
}

fn row_to_episode(row: &sqlx::postgres::PgRow) -> CoreResult<Episode> {
    let state: String = row.try_get("state")?;
    Ok(Episode {
        id: EpisodeId::new(row.try_get("id")?),
        season_id: SeasonId::new(row.try_get("season_id")?),
        episode_number: (row.try_get::<i32, _>("episode_number")? as u16).into(),
        air_date: row.try_get::<Option<NaiveDate>, _>("air_date")?,
        monitored: row.try_get("monitored")?,
        state: state.parse().map_err(|e| CoreError::invalid(format!("{e}")))?,
        runtime_minutes: row.try_get("runtime_minutes")?,
    })
}

#[async_trait]
impl EpisodeRepository for PostgresStore {
    async fn get(&self, id: EpisodeId) -> CoreResult<Episode> {
        let row = sqlx::query("SELECT * FROM episodes WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("episode {id}")))?;
        row_to_episode(&row)
    }

    async fn list(&self, filter: EpisodeFilter) -> CoreResult<Vec<Episode>> {
        let mut sql = String::from("SELECT * FROM episodes WHERE 1=1");
        if filter.season_id.is_some() {
            sql.push_str(" AND season_id = $1");
        }
        if filter.state.is_some() {
            sql.push_str(" AND state = $2");
        }
        if filter.monitored.is_some() {
            sql.push_str(" AND monitored = $3");
        }
        sql.push_str(" ORDER BY id ASC");
        let mut query = sqlx::query(&sql);
        if let Some(season_id) = filter.season_id {
            query = query.bind(season_id.get());
        }
        if let Some(state) = filter.state {
            query = query.bind(state.as_str());
        }
        if let Some(monitored) = filter.monitored {
            query = query.bind(monitored);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_episode).collect()
    }

    async fn upsert_metadata(&self, metadata: EpisodeMetadataUpdate) -> CoreResult<EpisodeId> {
        let mut tx = self.pool.begin().await?;
        let existing = sqlx::query(
            "SELECT id FROM episodes WHERE season_id = $1 AND episode_number = $2 FOR UPDATE",
        )
        .bind(metadata.season_id.get())
        .bind(metadata.episode_number.value() as i32)
        .fetch_optional(&mut *tx)
        .await?;

        let id = if let Some(row) = existing {
            let id: i64 = row.try_get("id")?;
            sqlx::query("UPDATE episodes SET air_date = $2, runtime_minutes = $3 WHERE id = $1")
                .bind(id)
                .bind(metadata.air_date)
                .bind(metadata.runtime_minutes)
                .execute(&mut *tx)
                .await?;
            EpisodeId::new(id)
        } else {
            let initial_state = match metadata.air_date {
                Some(d) if d > Utc::now().date_naive() => EpisodeState::Unreleased,
                _ => EpisodeState::Missing,
            };
            let row = sqlx::query(
                "INSERT INTO episodes
                    (season_id, episode_number, air_date, monitored, state, runtime_minutes)
                 VALUES ($1, $2, $3, true, $4, $5)
                 RETURNING id",
            )
            .bind(metadata.season_id.get())
            .bind(metadata.episode_number.value() as i32)
            .bind(metadata.air_date)
            .bind(initial_state.as_str())
            .bind(metadata.runtime_minutes)
            .fetch_one(&mut *tx)
            .await?;
            let id: i64 = row.try_get("id")?;
            Self::append_transition(
                &mut tx,
                EntityKind::Episode,
                id,
                None,
                initial_state.as_str(),
                None,
            )
            .await?;
            EpisodeId::new(id)
        };
        tx.commit().await?;
        Ok(id)
    }

    async fn transition(
        &self,
        id: EpisodeId,
        expected_from: Option<EpisodeState>,
        to: EpisodeState,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT state FROM episodes WHERE id = $1 FOR UPDATE")
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("episode {id}")))?;
        let current_str: String = row.try_get("state")?;
        let current: EpisodeState = current_str.parse().map_err(|e| CoreError::invalid(format!("{e}")))?;
        if expected_from != Some(current) {
            return Err(CoreError::Conflict);
        }
        sqlx::query("UPDATE episodes SET state = $2 WHERE id = $1")
            .bind(id.get())
            .bind(to.as_str())
            .execute(&mut *tx)
            .await?;
        Self::append_transition(
            &mut tx,
            EntityKind::Episode,
            id.get(),
            Some(current.as_str()),
            to.as_str(),
            metadata,
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

fn row_to_download(row: &sqlx::postgres::PgRow) -> CoreResult<Download> {
    let state: String = row.try_get("state")?;
    let kind: String = row.try_get("owning_kind")?;
    Ok(Download {
        id: DownloadId::new(row.try_get("id")?),
        owning_kind: match kind.as_str() {
            "movie" => EntityKind::Movie,
            "episode" => EntityKind::Episode,
            other => return Err(CoreError::invalid(format!("unexpected download owner kind {other:?}"))),
        },
        owning_id: row.try_get("owning_id")?,
        client_id: DownloadClientId::new(row.try_get("client_id")?),
        client_side_id: row.try_get("client_side_id")?,
        fingerprint: Fingerprint::new_from_stored(row.try_get("fingerprint")?),
        state: state.parse().map_err(|e| CoreError::invalid(format!("{e}")))?,
        attempts: row.try_get::<i32, _>("attempts")? as u32,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl DownloadRepository for PostgresStore {
    async fn record(&self, download: NewDownload) -> CoreResult<Download> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "INSERT INTO downloads
                (owning_kind, owning_id, client_id, client_side_id, fingerprint, state, attempts, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, 0, now())
             RETURNING id, created_at",
        )
        .bind(download.owning_kind.to_string())
        .bind(download.owning_id)
        .bind(download.client_id.get())
        .bind(&download.client_side_id)
        .bind(download.fingerprint.as_str())
        .bind(DownloadState::Queued.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let id: i64 = row.try_get("id")?;
        Self::append_transition(
            &mut tx,
            EntityKind::Download,
            id,
            None,
            DownloadState::Queued.as_str(),
            None,
        )
        .await?;
        tx.commit().await?;
        Ok(Download {
            id: DownloadId::new(id),
            owning_kind: download.owning_kind,
            owning_id: download.owning_id,
            client_id: download.client_id,
            client_side_id: download.client_side_id,
            fingerprint: download.fingerprint,
            state: DownloadState::Queued,
            attempts: 0,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn get(&self, id: DownloadId) -> CoreResult<Download> {
        let row = sqlx::query("SELECT * FROM downloads WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("download {id}")))?;
        row_to_download(&row)
    }

    async fn transition(
        &self,
        id: DownloadId,
        expected_from: DownloadState,
        to: DownloadState,
    ) -> CoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT state FROM downloads WHERE id = $1 FOR UPDATE")
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("download {id}")))?;
        let current_str: String = row.try_get("state")?;
        let current: DownloadState = current_str.parse().map_err(|e| CoreError::invalid(format!("{e}")))?;
        if current != expected_from {
            return Err(CoreError::Conflict);
        }
        sqlx::query("UPDATE downloads SET state = $2 WHERE id = $1")
            .bind(id.get())
            .bind(to.as_str())
            .execute(&mut *tx)
            .await?;
        Self::append_transition(
            &mut tx,
            EntityKind::Download,
            id.get(),
            Some(current.as_str()),
            to.as_str(),
            None,
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn increment_attempts(&self, id: DownloadId) -> CoreResult<u32> {
        let row = sqlx::query("UPDATE downloads SET attempts = attempts + 1 WHERE id = $1 RETURNING attempts")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("download {id}")))?;
        Ok(row.try_get::<i32, _>("attempts")? as u32)
    }

    async fn list_by_state(&self, state: DownloadState) -> CoreResult<Vec<Download>> {
        let rows = sqlx::query("SELECT * FROM downloads WHERE state = $1 ORDER BY id ASC")
            .bind(state.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_download).collect()
    }

    async fn find_active_for_fingerprint(&self, fingerprint: &Fingerprint) -> CoreResult<Option<Download>> {
        let row = sqlx::query(
            "SELECT * FROM downloads WHERE fingerprint = $1 AND state IN ('queued', 'active') LIMIT 1",
        )
        .bind(fingerprint.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_download).transpose()
    }
}

#[async_trait]
impl QualityRepository for PostgresStore {
    async fn get_profile(&self, id: QualityProfileId) -> CoreResult<QualityProfile> {
        let profile_row = sqlx::query("SELECT * FROM quality_profiles WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("quality profile {id}")))?;

        let item_rows = sqlx::query(
            "SELECT qi.token, qi.allowed
             FROM quality_items qi
             WHERE qi.quality_profile_id = $1
             ORDER BY qi.rank ASC",
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(item_rows.len());
        for row in &item_rows {
            let token_str: String = row.try_get("token")?;
            items.push(QualityItem {
                token: parse_token(&token_str)?,
                allowed: row.try_get("allowed")?,
            });
        }

        let min_str: String = profile_row.try_get("min_quality")?;
        let max_str: String = profile_row.try_get("max_quality")?;
        Ok(QualityProfile {
            id,
            name: profile_row.try_get("name")?,
            items,
            min_quality: parse_token(&min_str)?,
            max_quality: parse_token(&max_str)?,
        })
    }

    async fn list_definitions(&self) -> CoreResult<Vec<QualityDefinition>> {
        let rows = sqlx::query("SELECT * FROM quality_definitions ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                let token_str: String = row.try_get("token")?;
                Ok(QualityDefinition {
                    id: QualityDefinitionId::new(row.try_get("id")?),
                    token: parse_token(&token_str)?,
                    name: row.try_get("name")?,
                    min_mb_per_minute: row.try_get("min_mb_per_minute")?,
                    max_mb_per_minute: row.try_get("max_mb_per_minute")?,
                    preferred_mb_per_minute: row.try_get("preferred_mb_per_minute")?,
                })
            })
            .collect()
    }
}

fn row_to_indexer_source(row: &sqlx::postgres::PgRow) -> CoreResult<IndexerSourceConfig> {
    let categories: Vec<i32> = row.try_get("categories")?;
    Ok(IndexerSourceConfig {
        id: IndexerId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        kind: row.try_get("kind")?,
        priority: row.try_get("priority")?,
        base_url: row.try_get("base_url")?,
        api_key: row.try_get("api_key")?,
        categories: categories.into_iter().map(|c| c as u32).collect(),
        enabled: row.try_get("enabled")?,
    })
}

fn row_to_download_client(row: &sqlx::postgres::PgRow) -> CoreResult<DownloadClientConfig> {
    Ok(DownloadClientConfig {
        id: DownloadClientId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        kind: row.try_get("kind")?,
        base_url: row.try_get("base_url")?,
        api_key: row.try_get("api_key")?,
        download_dir: row.try_get("download_dir")?,
        enabled: row.try_get("enabled")?,
    })
}

#[async_trait]
impl ProviderConfigRepository for PostgresStore {
    async fn list_indexer_sources(&self) -> CoreResult<Vec<IndexerSourceConfig>> {
        let rows = sqlx::query("SELECT * FROM indexer_sources ORDER BY id ASC").fetch_all(&self.pool).await?;
        rows.iter().map(row_to_indexer_source).collect()
    }

    async fn seed_default_indexer_source(&self, source: NewIndexerSource) -> CoreResult<()> {
        let categories: Vec<i32> = source.categories.iter().map(|c| *c as i32).collect();
        sqlx::query(
            "INSERT INTO indexer_sources (name, kind, priority, base_url, api_key, categories, enabled)
             SELECT $1, $2, $3, $4, $5, $6, $7
             WHERE NOT EXISTS (SELECT 1 FROM indexer_sources)",
        )
        .bind(source.name)
        .bind(source.kind)
        .bind(source.priority)
        .bind(source.base_url)
        .bind(source.api_key)
        .bind(categories)
        .bind(source.enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_download_clients(&self) -> CoreResult<Vec<DownloadClientConfig>> {
        let rows = sqlx::query("SELECT * FROM download_clients ORDER BY id ASC").fetch_all(&self.pool).await?;
        rows.iter().map(row_to_download_client).collect()
    }

    async fn seed_default_download_client(&self, client: NewDownloadClient) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO download_clients (name, kind, base_url, api_key, download_dir, enabled)
             SELECT $1, $2, $3, $4, $5, $6
             WHERE NOT EXISTS (SELECT 1 FROM download_clients)",
        )
        .bind(client.name)
        .bind(client.kind)
        .bind(client.base_url)
        .bind(client.api_key)
        .bind(client.download_dir)
        .bind(client.enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn parse_token(s: &str) -> CoreResult<QualityToken> {
    QualityToken::ALL
        .iter()
        .copied()
        .find(|t| t.as_str() == s)
        .ok_or_else(|| CoreError::invalid(format!("unrecognized quality token {s:?}")))
}

fn row_to_transition(row: &sqlx::postgres::PgRow) -> CoreResult<Transition> {
    let kind_str: String = row.try_get("entity_kind")?;
    let kind = match kind_str.as_str() {
        "movie" => EntityKind::Movie,
        "series" => EntityKind::Series,
        "season" => EntityKind::Season,
        "episode" => EntityKind::Episode,
        "download" => EntityKind::Download,
        other => return Err(CoreError::invalid(format!("unrecognized entity kind {other:?}"))),
    };
    Ok(Transition {
        kind,
        entity_id: row.try_get("entity_id")?,
        from_state: row.try_get("from_state")?,
        to_state: row.try_get("to_state")?,
        at: row.try_get("at")?,
        metadata: row.try_get("metadata")?,
    })
}

#[async_trait]
impl TransitionLogReader for PostgresStore {
    async fn query_by_entity(&self, kind: EntityKind, entity_id: i64) -> CoreResult<Vec<Transition>> {
        let rows = sqlx::query(
            "SELECT * FROM transitions WHERE entity_kind = $1 AND entity_id = $2 ORDER BY at ASC, id ASC",
        )
        .bind(kind.to_string())
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_transition).collect()
    }

    async fn query_by_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        kinds: &[EntityKind],
        offset: i64,
        limit: i64,
    ) -> CoreResult<Vec<Transition>> {
        let kind_strs: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
        let rows = sqlx::query(
            "SELECT * FROM transitions
             WHERE at BETWEEN $1 AND $2
               AND ($3::text[] IS NULL OR cardinality($3::text[]) = 0 OR entity_kind = ANY($3))
             ORDER BY at ASC, id ASC
             OFFSET $4 LIMIT $5",
        )
        .bind(start)
        .bind(end)
        .bind(&kind_strs)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_transition).collect()
    }

    async fn count_by_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<i64> {
        let row = sqlx::query("SELECT count(*) AS n FROM transitions WHERE at BETWEEN $1 AND $2")
            .bind(start)
            .bind(end)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}
