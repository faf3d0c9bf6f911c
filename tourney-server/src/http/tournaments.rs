use hyper::Method;
use tourney_api::payload::{non_empty, MessageResponse};
use tourney_api::tournaments::{
    CreateTournament, RegisterParticipant, TournamentFilter, TournamentList, TournamentPatch,
    TournamentRequest, TournamentResponse, DEFAULT_FORMAT, DEFAULT_MAX_PARTICIPANTS,
};
use tourney_api::{Event, EventResponse, PayloadError};

use super::response::{self, Cors, Response};
use super::Result;
use crate::store::{NewTournament, TournamentUpdate};
use crate::{State, StatusCodeError};

const CORS: Cors = Cors {
    methods: "GET, POST, PUT, DELETE, OPTIONS",
    headers: "Content-Type, X-Auth-Token, X-User-Id",
};

pub async fn handle(state: &State, event: Event) -> EventResponse {
    log::debug!("tournaments: {}", event.http_method);

    response::finish(route(state, &event).await)
}

async fn route(state: &State, event: &Event) -> Result {
    method!(event, CORS, {
        Method::GET => list(state, event).await,
        Method::POST => match TournamentRequest::from_body(event.body_str())? {
            TournamentRequest::Create(req) => create(state, event, req).await,
            TournamentRequest::Register(req) => register(state, event, req).await,
        },
        Method::PUT => update(state, event).await,
    })
}

async fn list(state: &State, event: &Event) -> Result {
    let filter = TournamentFilter {
        search: event.get_query("search").map(str::to_owned),
        status: event.get_query("status").map(str::to_owned),
    };

    let tournaments = state.store.list_tournaments(&filter).await?;

    Ok(Response::ok().json(&TournamentList { tournaments })?)
}

async fn create(state: &State, event: &Event, req: CreateTournament) -> Result {
    let Some(name) = non_empty(req.name) else {
        return Err(StatusCodeError::bad_request()
            .message("Название турнира обязательно")
            .into());
    };

    let tournament = NewTournament {
        name,
        description: req.description.unwrap_or_default(),
        prize_money: req.prize_money.unwrap_or_default(),
        max_participants: req.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS),
        start_date: req.start_date,
        game_title: req.game_title.unwrap_or_default(),
        tournament_format: req
            .tournament_format
            .unwrap_or_else(|| DEFAULT_FORMAT.to_owned()),
        rules: req.rules.unwrap_or_default(),
        image_url: req.image_url.unwrap_or_default(),
        created_by: state.identity.identify(event),
    };

    let tournament = state.store.insert_tournament(&tournament).await?;
    log::info!("Created tournament {} ({})", tournament.name, tournament.id);

    Ok(Response::ok().json(&TournamentResponse {
        success: true,
        tournament,
    })?)
}

async fn register(state: &State, event: &Event, req: RegisterParticipant) -> Result {
    let Some(user_id) = state.identity.identify(event) else {
        return Err(StatusCodeError::unauthorized()
            .message("Необходима авторизация")
            .into());
    };

    let Some(tournament_id) = req.tournament_id else {
        return Err(StatusCodeError::bad_request()
            .message("Не указан турнир")
            .into());
    };

    state
        .store
        .register_participant(tournament_id, user_id)
        .await
        .map_err(|err| err.on_conflict("Вы уже зарегистрированы на этот турнир"))?;

    log::info!("User {} joined tournament {}", user_id, tournament_id);

    Ok(Response::ok().json(&MessageResponse {
        success: true,
        message: String::from("Вы успешно зарегистрированы на турнир"),
    })?)
}

async fn update(state: &State, event: &Event) -> Result {
    let patch: TournamentPatch =
        serde_json::from_str(event.body_str()).map_err(PayloadError::from)?;

    let id = patch.id;
    let update = TournamentUpdate::from_patch(patch).map_err(|err| {
        log::debug!("Rejecting tournament patch: {}", err);

        StatusCodeError::bad_request().message("Поле не может быть пустым")
    })?;

    if update.is_empty() {
        return Err(StatusCodeError::bad_request()
            .message("Нет полей для обновления")
            .into());
    }

    let Some(id) = id else {
        return Err(StatusCodeError::bad_request()
            .message("Не указан турнир")
            .into());
    };

    match state.store.update_tournament(id, &update).await? {
        Some(tournament) => Ok(Response::ok().json(&TournamentResponse {
            success: true,
            tournament,
        })?),
        None => Err(StatusCodeError::not_found()
            .message("Турнир не найден")
            .into()),
    }
}
