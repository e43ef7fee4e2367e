pub mod auth;
pub mod config;
pub mod err;
pub mod guard;
pub mod models;
pub mod session;
pub mod store;

use axum::{routing::get, routing::post, Extension, Json, Router};

use std::net::SocketAddr;

use axum::handler::Handler;
use axum::headers::Cookie;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use axum::{middleware, TypedHeader};
use serde::Serialize;
use tower::ServiceBuilder;

use crate::config::Config;
use crate::err::{Error, Fine, Maybe, Nothing};
use crate::session::{Session, SessionSigner};

pub type RefStr = &'static str;
pub type Payload<T> = axum::response::Result<Json<Maybe<T>>, Error>;
pub type CookiePayload<T> = axum::response::Result<(HeaderMap, Json<Maybe<T>>), Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Json(Fine(value)))
}

pub fn breaks<V>(err: Error) -> Payload<V>
where
    V: Serialize,
{
    Ok(Json(Nothing(err)))
}

pub fn proceeds_with<V>(cookie: Option<String>, value: V) -> CookiePayload<V>
where
    V: Serialize,
{
    let mut headers = HeaderMap::new();
    if let Some(cookie) = cookie {
        headers.insert(SET_COOKIE, HeaderValue::from_str(&cookie)?);
    }
    Ok((headers, Json(Fine(value))))
}

pub fn breaks_with<V>(err: Error) -> CookiePayload<V>
where
    V: Serialize,
{
    Ok((HeaderMap::new(), Json(Nothing(err))))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::from_env()?;
    let signer = SessionSigner::new(config.session_secret.as_str());
    let store = store::connect(&config).await?;

    let app = Router::new()
        .route("/", get(login_screen))
        .route("/dashboard", get(dashboard_screen))
        .route("/seleccionar", get(select_screen))
        .route("/admin", get(admin_screen))
        .route("/api/login", post(auth::login))
        .route("/api/session", get(auth::current_session))
        .route("/api/students", get(auth::linked_students))
        .route("/api/select-student", post(auth::select_student))
        .route("/api/logout", post(auth::logout))
        .fallback(err::handler404.into_service())
        .layer(
            ServiceBuilder::new()
                .layer(Extension(store))
                .layer(Extension(signer))
                .layer(middleware::from_fn(guard::guard)),
        );

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    log::info!("Starting archery academy portal on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

// The screens themselves are rendered client-side; these endpoints only
// expose the viewer identity the guard let through.
async fn login_screen() -> Payload<Screen> {
    proceeds(Screen::public("login"))
}

async fn dashboard_screen(
    cookies: Option<TypedHeader<Cookie>>,
    Extension(signer): Extension<SessionSigner>,
) -> Payload<Screen> {
    viewer_screen("dashboard", cookies, &signer)
}

async fn select_screen(
    cookies: Option<TypedHeader<Cookie>>,
    Extension(signer): Extension<SessionSigner>,
) -> Payload<Screen> {
    viewer_screen("select-student", cookies, &signer)
}

async fn admin_screen(
    cookies: Option<TypedHeader<Cookie>>,
    Extension(signer): Extension<SessionSigner>,
) -> Payload<Screen> {
    viewer_screen("admin", cookies, &signer)
}

fn viewer_screen(
    name: RefStr,
    cookies: Option<TypedHeader<Cookie>>,
    signer: &SessionSigner,
) -> Payload<Screen> {
    match auth::authenticate(signer, cookies) {
        Ok(session) => proceeds(Screen::for_viewer(name, session)),
        Err(err) => breaks(err),
    }
}

#[derive(Debug, Clone, Serialize)]
struct Screen {
    screen: RefStr,
    viewer: Option<Session>,
}

impl Screen {
    fn public(name: RefStr) -> Self {
        Self {
            screen: name,
            viewer: None,
        }
    }

    fn for_viewer(name: RefStr, session: Session) -> Self {
        Self {
            screen: name,
            viewer: Some(session),
        }
    }
}
