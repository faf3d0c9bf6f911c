use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::datetime;
use crate::id::{TournamentId, UserId};
use crate::payload::{double_option, split_action, PayloadError};

pub const DEFAULT_MAX_PARTICIPANTS: i32 = 64;
pub const DEFAULT_FORMAT: &str = "Single Elimination";

/// A stored tournament row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub description: Option<String>,
    pub prize_money: Option<String>,
    pub max_participants: i32,
    pub current_participants: i32,
    pub start_date: Option<NaiveDateTime>,
    pub game_title: Option<String>,
    pub tournament_format: Option<String>,
    pub rules: Option<String>,
    pub image_url: Option<String>,
    pub status: String,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A `POST` request to the tournaments handler, dispatched on the `action` field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TournamentRequest {
    Create(CreateTournament),
    Register(RegisterParticipant),
}

impl TournamentRequest {
    /// Decodes a request body.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::UnknownAction`] if `action` is missing or unknown, and
    /// [`PayloadError::Malformed`] if the body does not decode.
    pub fn from_body(body: &str) -> Result<Self, PayloadError> {
        let (action, value) = split_action(body)?;

        match action.as_deref() {
            Some("create") => Ok(Self::Create(serde_json::from_value(value)?)),
            Some("register") => Ok(Self::Register(serde_json::from_value(value)?)),
            _ => Err(PayloadError::UnknownAction(action)),
        }
    }
}

/// The body of `{"action": "create"}`. Absent optional fields take their defaults on insert.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTournament {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prize_money: Option<String>,
    #[serde(default)]
    pub max_participants: Option<i32>,
    #[serde(default, deserialize_with = "datetime::deserialize_option")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub game_title: Option<String>,
    #[serde(default)]
    pub tournament_format: Option<String>,
    #[serde(default)]
    pub rules: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// The body of `{"action": "register"}`. The participant is the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterParticipant {
    #[serde(default)]
    pub tournament_id: Option<TournamentId>,
}

/// The body of a `PUT` request: a sparse patch of the tournament `id`.
///
/// Only the listed fields can be changed. `None` means "leave untouched", `Some(None)` is an
/// explicit `null`. For nullable columns that clears the value; `name`, `status` and
/// `max_participants` are not nullable and reject it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentPatch {
    #[serde(default)]
    pub id: Option<TournamentId>,
    #[serde(default, deserialize_with = "double_option")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub prize_money: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_participants: Option<Option<i32>>,
    #[serde(default, deserialize_with = "datetime::deserialize_patch")]
    pub start_date: Option<Option<NaiveDateTime>>,
    #[serde(default, deserialize_with = "double_option")]
    pub game_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub rules: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
}

/// Filters for listing tournaments. `None` disables a predicate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TournamentFilter {
    /// Case-insensitive substring of the name or the description.
    pub search: Option<String>,
    /// Exact status.
    pub status: Option<String>,
}

impl TournamentFilter {
    /// Returns `true` if `tournament` satisfies all active predicates.
    pub fn matches(&self, tournament: &Tournament) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let contains = |value: &str| value.to_lowercase().contains(&needle);

            let name = contains(&tournament.name);
            let description = tournament.description.as_deref().map_or(false, contains);

            if !name && !description {
                return false;
            }
        }

        if let Some(status) = &self.status {
            if tournament.status != *status {
                return false;
            }
        }

        true
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentList {
    pub tournaments: Vec<Tournament>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentResponse {
    pub success: bool,
    pub tournament: Tournament,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{
        CreateTournament, Tournament, TournamentFilter, TournamentPatch, TournamentRequest,
    };
    use crate::id::TournamentId;
    use crate::PayloadError;

    fn tournament(name: &str, description: Option<&str>, status: &str) -> Tournament {
        Tournament {
            id: TournamentId(1),
            name: name.into(),
            description: description.map(Into::into),
            prize_money: None,
            max_participants: 64,
            current_participants: 0,
            start_date: None,
            game_title: None,
            tournament_format: None,
            rules: None,
            image_url: None,
            status: status.into(),
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_tournament_request_from_body() {
        let req = TournamentRequest::from_body(
            r#"{"action": "create", "name": "Cup", "max_participants": 16, "start_date": ""}"#,
        )
        .unwrap();
        assert_eq!(
            req,
            TournamentRequest::Create(CreateTournament {
                name: Some("Cup".into()),
                max_participants: Some(16),
                ..Default::default()
            })
        );

        match TournamentRequest::from_body(r#"{"action": "register", "tournament_id": 3}"#) {
            Ok(TournamentRequest::Register(req)) => {
                assert_eq!(req.tournament_id, Some(TournamentId(3)))
            }
            res => panic!("expected register, got {:?}", res),
        }

        match TournamentRequest::from_body(r#"{"action": "delete"}"#) {
            Err(PayloadError::UnknownAction(_)) => (),
            res => panic!("expected unknown action, got {:?}", res),
        }
    }

    #[test]
    fn test_tournament_patch_decode() {
        let patch: TournamentPatch =
            serde_json::from_str(r#"{"id": 1, "status": "closed", "rules": null}"#).unwrap();

        assert_eq!(patch.id, Some(TournamentId(1)));
        assert_eq!(patch.status, Some(Some("closed".into())));
        assert_eq!(patch.rules, Some(None));
        assert_eq!(patch.description, None);
        assert_eq!(patch.start_date, None);

        let patch: TournamentPatch =
            serde_json::from_str(r#"{"id": 1, "name": null, "max_participants": 8}"#).unwrap();
        assert_eq!(patch.name, Some(None));
        assert_eq!(patch.max_participants, Some(Some(8)));
        assert_eq!(patch.status, None);
    }

    #[test]
    fn test_tournament_filter() {
        let dota = tournament("Dota Masters", None, "open");
        let cs = tournament("CS Cup", Some("Not a DOTA event"), "closed");
        let chess = tournament("Chess", Some("Blitz"), "open");

        let filter = TournamentFilter {
            search: Some("dota".into()),
            status: None,
        };
        assert!(filter.matches(&dota));
        assert!(filter.matches(&cs));
        assert!(!filter.matches(&chess));

        let filter = TournamentFilter {
            search: Some("Dota".into()),
            status: Some("open".into()),
        };
        assert!(filter.matches(&dota));
        assert!(!filter.matches(&cs));
        assert!(!filter.matches(&chess));

        assert!(TournamentFilter::default().matches(&chess));
    }
}
