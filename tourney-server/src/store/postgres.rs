use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use tourney_api::id::{TournamentId, UserId};
use tourney_api::tournaments::{Tournament, TournamentFilter};

use super::{
    Assignment, NewTournament, NewUser, Store, TournamentUpdate, User, DEFAULT_STATUS,
};
use crate::Error;

/// SQLSTATE of `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
    table_prefix: String,
}

impl PgStore {
    pub fn new(pool: PgPool, table_prefix: String) -> Self {
        Self { pool, table_prefix }
    }

    /// Creates all tables that don't exist yet.
    pub async fn migrate(&self) -> Result<(), Error> {
        let prefix = &self.table_prefix;

        let statements = [
            format!(
                "CREATE TABLE IF NOT EXISTS {prefix}users (
                    id BIGSERIAL PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    email TEXT NOT NULL UNIQUE,
                    password_hash TEXT NOT NULL,
                    full_name TEXT,
                    is_admin BOOLEAN NOT NULL DEFAULT FALSE,
                    last_login TIMESTAMPTZ,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {prefix}tournaments (
                    id BIGSERIAL PRIMARY KEY,
                    name TEXT NOT NULL,
                    description TEXT,
                    prize_money TEXT,
                    max_participants INTEGER NOT NULL DEFAULT 64,
                    current_participants INTEGER NOT NULL DEFAULT 0,
                    start_date TIMESTAMP,
                    game_title TEXT,
                    tournament_format TEXT DEFAULT 'Single Elimination',
                    rules TEXT,
                    image_url TEXT,
                    status TEXT NOT NULL DEFAULT '{DEFAULT_STATUS}',
                    created_by BIGINT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {prefix}tournament_participants (
                    tournament_id BIGINT NOT NULL,
                    user_id BIGINT NOT NULL,
                    registered_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    PRIMARY KEY (tournament_id, user_id)
                )"
            ),
        ];

        for sql in &statements {
            sqlx::query(sql).execute(&self.pool).await?;
        }

        log::debug!("Database schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &NewUser) -> Result<User, Error> {
        let sql = format!(
            "INSERT INTO {}users (username, email, password_hash, full_name) \
             VALUES ($1, $2, $3, $4) RETURNING *",
            self.table_prefix
        );

        let row = sqlx::query(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.full_name)
            .fetch_one(&self.pool)
            .await
            .map_err(unique_violation)?;

        Ok(user_from_row(&row)?)
    }

    async fn find_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<User>, Error> {
        let sql = format!(
            "SELECT * FROM {}users WHERE username = $1 AND password_hash = $2",
            self.table_prefix
        );

        let row = sqlx::query(&sql)
            .bind(username)
            .bind(password_hash)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(user_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn touch_last_login(&self, id: UserId) -> Result<(), Error> {
        let sql = format!(
            "UPDATE {}users SET last_login = CURRENT_TIMESTAMP WHERE id = $1",
            self.table_prefix
        );

        sqlx::query(&sql).bind(id.0).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_tournaments(&self, filter: &TournamentFilter) -> Result<Vec<Tournament>, Error> {
        let mut query = list_query(&self.table_prefix, filter);
        let mut rows = query.build().fetch(&self.pool);

        let mut tournaments = Vec::new();
        while let Some(row) = rows.try_next().await? {
            tournaments.push(tournament_from_row(&row)?);
        }

        Ok(tournaments)
    }

    async fn insert_tournament(&self, tournament: &NewTournament) -> Result<Tournament, Error> {
        let sql = format!(
            "INSERT INTO {}tournaments (name, description, prize_money, max_participants, \
             start_date, game_title, tournament_format, rules, image_url, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
            self.table_prefix
        );

        let row = sqlx::query(&sql)
            .bind(&tournament.name)
            .bind(&tournament.description)
            .bind(&tournament.prize_money)
            .bind(tournament.max_participants)
            .bind(tournament.start_date)
            .bind(&tournament.game_title)
            .bind(&tournament.tournament_format)
            .bind(&tournament.rules)
            .bind(&tournament.image_url)
            .bind(tournament.created_by.map(|id| id.0))
            .fetch_one(&self.pool)
            .await?;

        Ok(tournament_from_row(&row)?)
    }

    async fn register_participant(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> Result<(), Error> {
        // Dropping the transaction on an error rolls it back.
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO {}tournament_participants (tournament_id, user_id) VALUES ($1, $2)",
            self.table_prefix
        ))
        .bind(tournament_id.0)
        .bind(user_id.0)
        .execute(&mut *tx)
        .await
        .map_err(unique_violation)?;

        sqlx::query(&format!(
            "UPDATE {}tournaments SET current_participants = current_participants + 1 \
             WHERE id = $1",
            self.table_prefix
        ))
        .bind(tournament_id.0)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_tournament(
        &self,
        id: TournamentId,
        update: &TournamentUpdate,
    ) -> Result<Option<Tournament>, Error> {
        let mut query = update_query(&self.table_prefix, id, update);

        match query.build().fetch_optional(&self.pool).await? {
            Some(row) => Ok(Some(tournament_from_row(&row)?)),
            None => Ok(None),
        }
    }
}

/// Builds the `SELECT` for [`Store::list_tournaments`].
fn list_query(table_prefix: &str, filter: &TournamentFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!(
        "SELECT * FROM {}tournaments WHERE TRUE",
        table_prefix
    ));

    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);

        query.push(" AND (name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR description ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    if let Some(status) = &filter.status {
        query.push(" AND status = ");
        query.push_bind(status.clone());
    }

    query.push(" ORDER BY start_date DESC");
    query
}

/// Builds the `UPDATE` for [`Store::update_tournament`]. `updated_at` is always stamped.
fn update_query(
    table_prefix: &str,
    id: TournamentId,
    update: &TournamentUpdate,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("UPDATE {}tournaments SET ", table_prefix));

    let mut assignments = query.separated(", ");
    for assignment in update.assignments() {
        assignments.push(format!("{} = ", assignment.column()));

        match assignment.clone() {
            Assignment::Name(value) | Assignment::Status(value) => {
                assignments.push_bind_unseparated(value)
            }
            Assignment::Description(value)
            | Assignment::PrizeMoney(value)
            | Assignment::GameTitle(value)
            | Assignment::Rules(value)
            | Assignment::ImageUrl(value) => assignments.push_bind_unseparated(value),
            Assignment::MaxParticipants(value) => assignments.push_bind_unseparated(value),
            Assignment::StartDate(value) => assignments.push_bind_unseparated(value),
        };
    }
    assignments.push("updated_at = CURRENT_TIMESTAMP");

    query.push(" WHERE id = ");
    query.push_bind(id.0);
    query.push(" RETURNING *");
    query
}

/// Maps a `unique_violation` to [`Error::UniqueViolation`].
fn unique_violation(err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            Error::UniqueViolation(db.message().to_owned())
        }
        err => err.into(),
    }
}

/// Builds an `ILIKE` pattern matching `input` anywhere, with all wildcards in `input` escaped.
fn like_pattern(input: &str) -> String {
    let mut pattern = String::with_capacity(input.len() + 2);
    pattern.push('%');

    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }

        pattern.push(c);
    }

    pattern.push('%');
    pattern
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        full_name: row.try_get("full_name")?,
        is_admin: row.try_get("is_admin")?,
        last_login: row.try_get("last_login")?,
    })
}

fn tournament_from_row(row: &PgRow) -> Result<Tournament, sqlx::Error> {
    let created_by: Option<i64> = row.try_get("created_by")?;

    Ok(Tournament {
        id: TournamentId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        prize_money: row.try_get("prize_money")?,
        max_participants: row.try_get("max_participants")?,
        current_participants: row.try_get("current_participants")?,
        start_date: row.try_get("start_date")?,
        game_title: row.try_get("game_title")?,
        tournament_format: row.try_get("tournament_format")?,
        rules: row.try_get("rules")?,
        image_url: row.try_get("image_url")?,
        status: row.try_get("status")?,
        created_by: created_by.map(UserId),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
