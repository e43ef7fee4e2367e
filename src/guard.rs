use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::models::Role;
use crate::session::{self, Session, SessionSigner};

const ADMIN_PREFIX: &str = "/admin";
const GUARDED_PREFIXES: [&str; 2] = ["/dashboard", "/seleccionar"];
const EXEMPT_PREFIXES: [&str; 2] = ["/api/", "/static/"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Continue,
    RedirectTo(String),
}

/// Pure gate over (path, verified session). Never mutates cookies and
/// never produces an error body, only silent redirects.
pub fn decide(path: &str, session: Option<&Session>) -> Decision {
    if EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return Decision::Continue;
    }
    if path.starts_with(ADMIN_PREFIX) {
        return match session {
            None => Decision::RedirectTo(login_with_resume(path)),
            Some(session) if session.role != Role::Admin => {
                Decision::RedirectTo("/dashboard".to_string())
            }
            Some(_) => Decision::Continue,
        };
    }
    if GUARDED_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) && session.is_none() {
        return Decision::RedirectTo(login_with_resume(path));
    }
    Decision::Continue
}

// The `redirect` parameter is carried for post-login resume; the login
// screen does not consume it yet.
fn login_with_resume(path: &str) -> String {
    format!("/?redirect={}", path)
}

pub async fn guard<B>(req: Request<B>, next: Next<B>) -> Response {
    let session = req.extensions().get::<SessionSigner>().and_then(|signer| {
        session::token_from_headers(req.headers()).and_then(|token| signer.verify(&token))
    });
    match decide(req.uri().path(), session.as_ref()) {
        Decision::Continue => next.run(req).await,
        Decision::RedirectTo(target) => redirect_response(&target),
    }
}

fn redirect_response(target: &str) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(target) {
        headers.insert(header::LOCATION, location);
    }
    (StatusCode::TEMPORARY_REDIRECT, headers, ()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Profile, Student};
    use uuid::Uuid;

    fn session_with_role(role: Role) -> Session {
        let profile = Profile {
            id: Uuid::new_v4(),
            display_name: "Someone".to_string(),
            role,
        };
        let student = Student {
            id: Uuid::new_v4(),
            full_name: "Ana".to_string(),
            is_active: true,
        };
        Session::for_profile(&profile, &[student])
    }

    #[test]
    fn admin_area_without_session_redirects_to_login() {
        assert_eq!(
            decide("/admin/alumnos", None),
            Decision::RedirectTo("/?redirect=/admin/alumnos".to_string())
        );
    }

    #[test]
    fn admin_area_with_non_admin_session_redirects_to_dashboard() {
        let session = session_with_role(Role::Padre);
        assert_eq!(
            decide("/admin", Some(&session)),
            Decision::RedirectTo("/dashboard".to_string())
        );
    }

    #[test]
    fn admin_area_with_admin_session_continues() {
        let session = session_with_role(Role::Admin);
        assert_eq!(decide("/admin/duelos", Some(&session)), Decision::Continue);
    }

    #[test]
    fn dashboard_without_session_redirects_to_login() {
        assert_eq!(
            decide("/dashboard", None),
            Decision::RedirectTo("/?redirect=/dashboard".to_string())
        );
        assert_eq!(
            decide("/seleccionar", None),
            Decision::RedirectTo("/?redirect=/seleccionar".to_string())
        );
    }

    #[test]
    fn dashboard_with_any_role_continues() {
        for role in [Role::Padre, Role::Alumno, Role::Cliente, Role::Admin] {
            let session = session_with_role(role);
            assert_eq!(decide("/dashboard", Some(&session)), Decision::Continue);
            assert_eq!(decide("/seleccionar", Some(&session)), Decision::Continue);
        }
    }

    #[test]
    fn public_paths_continue_without_session() {
        assert_eq!(decide("/", None), Decision::Continue);
        assert_eq!(decide("/acerca", None), Decision::Continue);
    }

    #[test]
    fn api_and_assets_are_exempt() {
        assert_eq!(decide("/api/login", None), Decision::Continue);
        assert_eq!(decide("/static/logo.png", None), Decision::Continue);
    }
}
