use chrono::{NaiveDateTime, Utc};
use thiserror::Error;
use tourney_api::tournaments::{Tournament, TournamentPatch};

/// A single column assignment of a tournament update. The set of variants is the whitelist of
/// mutable columns, column names are never taken from input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assignment {
    Name(String),
    Description(Option<String>),
    Status(String),
    PrizeMoney(Option<String>),
    MaxParticipants(i32),
    StartDate(Option<NaiveDateTime>),
    GameTitle(Option<String>),
    Rules(Option<String>),
    ImageUrl(Option<String>),
}

impl Assignment {
    #[inline]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Description(_) => "description",
            Self::Status(_) => "status",
            Self::PrizeMoney(_) => "prize_money",
            Self::MaxParticipants(_) => "max_participants",
            Self::StartDate(_) => "start_date",
            Self::GameTitle(_) => "game_title",
            Self::Rules(_) => "rules",
            Self::ImageUrl(_) => "image_url",
        }
    }

    fn apply(&self, tournament: &mut Tournament) {
        match self.clone() {
            Self::Name(v) => tournament.name = v,
            Self::Description(v) => tournament.description = v,
            Self::Status(v) => tournament.status = v,
            Self::PrizeMoney(v) => tournament.prize_money = v,
            Self::MaxParticipants(v) => tournament.max_participants = v,
            Self::StartDate(v) => tournament.start_date = v,
            Self::GameTitle(v) => tournament.game_title = v,
            Self::Rules(v) => tournament.rules = v,
            Self::ImageUrl(v) => tournament.image_url = v,
        }
    }
}

/// A patch set an explicit `null` on a column that is not nullable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
#[error("{0} must not be null")]
pub struct NullField(pub &'static str);

/// A validated set of column assignments built from a [`TournamentPatch`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TournamentUpdate {
    assignments: Vec<Assignment>,
}

impl TournamentUpdate {
    /// Collects every field present in `patch`. The patch `id` is not an assignment.
    ///
    /// # Errors
    ///
    /// Returns [`NullField`] if `name`, `status` or `max_participants` is an explicit `null`.
    pub fn from_patch(patch: TournamentPatch) -> Result<Self, NullField> {
        let mut assignments = Vec::new();

        if let Some(name) = patch.name {
            assignments.push(Assignment::Name(name.ok_or(NullField("name"))?));
        }

        if let Some(description) = patch.description {
            assignments.push(Assignment::Description(description));
        }

        if let Some(status) = patch.status {
            assignments.push(Assignment::Status(status.ok_or(NullField("status"))?));
        }

        if let Some(prize_money) = patch.prize_money {
            assignments.push(Assignment::PrizeMoney(prize_money));
        }

        if let Some(max_participants) = patch.max_participants {
            assignments.push(Assignment::MaxParticipants(
                max_participants.ok_or(NullField("max_participants"))?,
            ));
        }

        if let Some(start_date) = patch.start_date {
            assignments.push(Assignment::StartDate(start_date));
        }

        if let Some(game_title) = patch.game_title {
            assignments.push(Assignment::GameTitle(game_title));
        }

        if let Some(rules) = patch.rules {
            assignments.push(Assignment::Rules(rules));
        }

        if let Some(image_url) = patch.image_url {
            assignments.push(Assignment::ImageUrl(image_url));
        }

        Ok(Self { assignments })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    #[inline]
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Applies all assignments to `tournament` and stamps `updated_at`.
    pub fn apply(&self, tournament: &mut Tournament) {
        for assignment in &self.assignments {
            assignment.apply(tournament);
        }

        tournament.updated_at = Utc::now();
    }
}
