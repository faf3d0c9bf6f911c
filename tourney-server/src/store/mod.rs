mod memory;
mod postgres;
mod update;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use update::{Assignment, NullField, TournamentUpdate};

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use tourney_api::auth::UserInfo;
use tourney_api::id::{TournamentId, UserId};
use tourney_api::tournaments::{Tournament, TournamentFilter};

use crate::Error;

/// The persistence backend for users, tournaments and participants.
///
/// Every method is a complete unit of work: connections are acquired and released inside the
/// call, and multi-statement writes are atomic.
#[async_trait]
pub trait Store: Debug + Send + Sync {
    /// Inserts a new user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UniqueViolation`] if the username or email is already taken.
    async fn insert_user(&self, user: &NewUser) -> Result<User, Error>;

    /// Returns the user with exactly this username and password hash.
    async fn find_user(&self, username: &str, password_hash: &str)
        -> Result<Option<User>, Error>;

    /// Sets the `last_login` of the user to now.
    async fn touch_last_login(&self, id: UserId) -> Result<(), Error>;

    /// Returns all tournaments matching `filter`, latest `start_date` first. Tournaments
    /// without a start date come first.
    async fn list_tournaments(&self, filter: &TournamentFilter) -> Result<Vec<Tournament>, Error>;

    async fn insert_tournament(&self, tournament: &NewTournament) -> Result<Tournament, Error>;

    /// Adds the user to the tournament and increments its participant counter, atomically.
    ///
    /// The tournament is neither required to exist nor checked for capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UniqueViolation`] if the user is already registered. Nothing is
    /// written in that case.
    async fn register_participant(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> Result<(), Error>;

    /// Applies `update` and stamps `updated_at`. Returns `None` if no tournament with the
    /// given `id` exists.
    async fn update_tournament(
        &self,
        id: TournamentId,
        update: &TournamentUpdate,
    ) -> Result<Option<Tournament>, Error>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub is_admin: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn info(&self) -> UserInfo {
        UserInfo {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            is_admin: self.is_admin,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
}

/// A tournament about to be inserted, with all defaults already applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTournament {
    pub name: String,
    pub description: String,
    pub prize_money: String,
    pub max_participants: i32,
    pub start_date: Option<NaiveDateTime>,
    pub game_title: String,
    pub tournament_format: String,
    pub rules: String,
    pub image_url: String,
    pub created_by: Option<UserId>,
}

/// The status of a newly created tournament.
pub const DEFAULT_STATUS: &str = "draft";
