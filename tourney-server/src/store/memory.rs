use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tourney_api::id::{TournamentId, UserId};
use tourney_api::tournaments::{Tournament, TournamentFilter};

use super::{NewTournament, NewUser, Store, TournamentUpdate, User, DEFAULT_STATUS};
use crate::Error;

/// A process-local [`Store`]. Everything is lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<UserId, User>,
    tournaments: BTreeMap<TournamentId, Tournament>,
    participants: HashSet<(TournamentId, UserId)>,
    next_user_id: i64,
    next_tournament_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &NewUser) -> Result<User, Error> {
        let mut inner = self.inner.lock();

        for existing in inner.users.values() {
            if existing.username == user.username {
                return Err(Error::UniqueViolation(format!(
                    "username {:?} already exists",
                    user.username
                )));
            }

            if existing.email == user.email {
                return Err(Error::UniqueViolation(format!(
                    "email {:?} already exists",
                    user.email
                )));
            }
        }

        inner.next_user_id += 1;
        let user = User {
            id: UserId(inner.next_user_id),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            full_name: Some(user.full_name.clone()),
            is_admin: false,
            last_login: None,
        };

        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<User>, Error> {
        let inner = self.inner.lock();

        Ok(inner
            .users
            .values()
            .find(|user| user.username == username && user.password_hash == password_hash)
            .cloned())
    }

    async fn touch_last_login(&self, id: UserId) -> Result<(), Error> {
        let mut inner = self.inner.lock();

        if let Some(user) = inner.users.get_mut(&id) {
            user.last_login = Some(Utc::now());
        }

        Ok(())
    }

    async fn list_tournaments(&self, filter: &TournamentFilter) -> Result<Vec<Tournament>, Error> {
        let inner = self.inner.lock();

        let mut tournaments: Vec<Tournament> = inner
            .tournaments
            .values()
            .filter(|tournament| filter.matches(tournament))
            .cloned()
            .collect();

        // Same order as `ORDER BY start_date DESC` in postgres: NULLs first.
        tournaments.sort_by_key(|t| (t.start_date.is_some(), Reverse(t.start_date)));

        Ok(tournaments)
    }

    async fn insert_tournament(&self, tournament: &NewTournament) -> Result<Tournament, Error> {
        let mut inner = self.inner.lock();

        inner.next_tournament_id += 1;
        let now = Utc::now();

        let tournament = Tournament {
            id: TournamentId(inner.next_tournament_id),
            name: tournament.name.clone(),
            description: Some(tournament.description.clone()),
            prize_money: Some(tournament.prize_money.clone()),
            max_participants: tournament.max_participants,
            current_participants: 0,
            start_date: tournament.start_date,
            game_title: Some(tournament.game_title.clone()),
            tournament_format: Some(tournament.tournament_format.clone()),
            rules: Some(tournament.rules.clone()),
            image_url: Some(tournament.image_url.clone()),
            status: DEFAULT_STATUS.to_owned(),
            created_by: tournament.created_by,
            created_at: now,
            updated_at: now,
        };

        inner.tournaments.insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn register_participant(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> Result<(), Error> {
        let mut inner = self.inner.lock();

        if !inner.participants.insert((tournament_id, user_id)) {
            return Err(Error::UniqueViolation(format!(
                "user {} is already registered for tournament {}",
                user_id, tournament_id
            )));
        }

        if let Some(tournament) = inner.tournaments.get_mut(&tournament_id) {
            tournament.current_participants += 1;
        }

        Ok(())
    }

    async fn update_tournament(
        &self,
        id: TournamentId,
        update: &TournamentUpdate,
    ) -> Result<Option<Tournament>, Error> {
        let mut inner = self.inner.lock();

        Ok(inner.tournaments.get_mut(&id).map(|tournament| {
            update.apply(tournament);
            tournament.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tourney_api::id::{TournamentId, UserId};
    use tourney_api::tournaments::TournamentFilter;

    use super::MemoryStore;
    use crate::store::{NewTournament, NewUser, Store};
    use crate::Error;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            full_name: String::new(),
        }
    }

    fn new_tournament(name: &str, start: Option<(i32, u32, u32)>) -> NewTournament {
        NewTournament {
            name: name.into(),
            description: String::new(),
            prize_money: String::new(),
            max_participants: 64,
            start_date: start.map(|(y, m, d)| {
                NaiveDate::from_ymd_opt(y, m, d)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap()
            }),
            game_title: String::new(),
            tournament_format: "Single Elimination".into(),
            rules: String::new(),
            image_url: String::new(),
            created_by: None,
        }
    }

    #[tokio::test]
    async fn test_memory_store_users() {
        let store = MemoryStore::new();

        let alice = store.insert_user(&new_user("alice", "a@x")).await.unwrap();
        assert_eq!(alice.id, UserId(1));
        assert!(!alice.is_admin);

        match store.insert_user(&new_user("alice", "other@x")).await {
            Err(Error::UniqueViolation(_)) => (),
            res => panic!("expected unique violation, got {:?}", res),
        }

        match store.insert_user(&new_user("bob", "a@x")).await {
            Err(Error::UniqueViolation(_)) => (),
            res => panic!("expected unique violation, got {:?}", res),
        }

        assert_eq!(store.find_user("alice", "hash").await.unwrap(), Some(alice));
        assert_eq!(store.find_user("alice", "wrong").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_list_order() {
        let store = MemoryStore::new();

        store
            .insert_tournament(&new_tournament("early", Some((2024, 1, 1))))
            .await
            .unwrap();
        store
            .insert_tournament(&new_tournament("undated", None))
            .await
            .unwrap();
        store
            .insert_tournament(&new_tournament("late", Some((2025, 6, 1))))
            .await
            .unwrap();

        let names: Vec<_> = store
            .list_tournaments(&TournamentFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();

        assert_eq!(names, ["undated", "late", "early"]);
    }

    #[tokio::test]
    async fn test_memory_store_register() {
        let store = MemoryStore::new();
        let tournament = store
            .insert_tournament(&new_tournament("Cup", None))
            .await
            .unwrap();

        store
            .register_participant(tournament.id, UserId(7))
            .await
            .unwrap();

        match store.register_participant(tournament.id, UserId(7)).await {
            Err(Error::UniqueViolation(_)) => (),
            res => panic!("expected unique violation, got {:?}", res),
        }

        // Registering for an unknown tournament is accepted.
        store
            .register_participant(TournamentId(99), UserId(7))
            .await
            .unwrap();

        let list = store
            .list_tournaments(&TournamentFilter::default())
            .await
            .unwrap();
        assert_eq!(list[0].current_participants, 1);
    }
}
