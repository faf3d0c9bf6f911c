use hyper::Method;
use tourney_api::auth::{AuthRequest, AuthResponse, LoginRequest, RegisterRequest};
use tourney_api::payload::non_empty;
use tourney_api::{Event, EventResponse};

use super::response::{self, Cors, Response};
use super::Result;
use crate::auth::{issue_token, password_hash};
use crate::store::{NewUser, User};
use crate::{State, StatusCodeError};

const CORS: Cors = Cors {
    methods: "POST, OPTIONS",
    headers: "Content-Type, X-Auth-Token",
};

pub async fn handle(state: &State, event: Event) -> EventResponse {
    log::debug!("auth: {}", event.http_method);

    response::finish(route(state, &event).await)
}

async fn route(state: &State, event: &Event) -> Result {
    method!(event, CORS, {
        Method::POST => match AuthRequest::from_body(event.body_str())? {
            AuthRequest::Register(req) => register(state, req).await,
            AuthRequest::Login(req) => login(state, req).await,
        },
    })
}

async fn register(state: &State, req: RegisterRequest) -> Result {
    let (Some(username), Some(email), Some(password)) = (
        non_empty(req.username),
        non_empty(req.email),
        non_empty(req.password),
    ) else {
        return Err(StatusCodeError::bad_request()
            .message("Заполните все поля")
            .into());
    };

    let user = NewUser {
        username,
        email,
        password_hash: password_hash(&password),
        full_name: req.full_name.unwrap_or_default(),
    };

    let user = state
        .store
        .insert_user(&user)
        .await
        .map_err(|err| err.on_conflict("Пользователь с таким именем или email уже существует"))?;

    log::info!("Registered user {} ({})", user.username, user.id);

    authorized(&user)
}

async fn login(state: &State, req: LoginRequest) -> Result {
    let (Some(username), Some(password)) = (non_empty(req.username), non_empty(req.password))
    else {
        return Err(StatusCodeError::bad_request()
            .message("Заполните все поля")
            .into());
    };

    let Some(user) = state
        .store
        .find_user(&username, &password_hash(&password))
        .await?
    else {
        return Err(StatusCodeError::unauthorized()
            .message("Неверный логин или пароль")
            .into());
    };

    state.store.touch_last_login(user.id).await?;

    authorized(&user)
}

fn authorized(user: &User) -> Result {
    Ok(Response::ok().json(&AuthResponse {
        success: true,
        token: issue_token(user.id, &user.username),
        user: user.info(),
    })?)
}
