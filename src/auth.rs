use axum::headers::Cookie;
use axum::{Extension, Json, TypedHeader};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::err::Error;
use crate::models::{Profile, Role, Student};
use crate::session::{self, Session, SessionSigner};
use crate::store::RecordStore;
use crate::{breaks, breaks_with, proceeds, proceeds_with, CookiePayload, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Destination {
    Dashboard,
    SelectStudent,
}

pub async fn login(
    Json(body): Json<LoginRequest>,
    Extension(store): Extension<RecordStore>,
    Extension(signer): Extension<SessionSigner>,
) -> CookiePayload<LoggedIn> {
    let code = match normalize_code(&body.code) {
        Ok(code) => code,
        Err(err) => return breaks_with(err),
    };
    match resolve(&store, &code).await {
        Ok((session, destination)) => {
            let token = signer.issue(&session)?;
            proceeds_with(
                Some(session::session_cookie(&token)),
                LoggedIn {
                    destination,
                    session,
                },
            )
        }
        Err(Error::InternalError { kind, message }) => {
            // transient store failures look like a bad code to the visitor
            log::warn!("Record store failure during login ({}): {}", kind, message);
            breaks_with(Error::invalid_code())
        }
        Err(err) => breaks_with(err),
    }
}

/// Ordered probe: the profile pool shadows the standalone-student pool
/// when a code exists in both.
pub async fn resolve(
    store: &RecordStore,
    code: &str,
) -> Result<(Session, Destination), Error> {
    if let Some(profile) = store.find_profile_by_code(code).await? {
        let students = store.linked_students(profile.id).await?;
        return outcome_for_profile(&profile, &students);
    }
    if let Some(student) = store.find_active_student_by_code(code).await? {
        return Ok((Session::for_student(&student), Destination::Dashboard));
    }
    Err(Error::invalid_code())
}

pub fn normalize_code(raw: &str) -> Result<String, Error> {
    let trimmed = raw.trim();
    if trimmed.len() < 4 {
        return Err(Error::InvalidPayload {
            message: "Access code must be at least 4 characters!".to_string(),
        });
    }
    Ok(trimmed.to_uppercase())
}

pub fn outcome_for_profile(
    profile: &Profile,
    students: &[Student],
) -> Result<(Session, Destination), Error> {
    // an admin administers rather than views a student, so zero links is fine
    if students.is_empty() && profile.role != Role::Admin {
        return Err(Error::NoStudentsLinked {
            message: "No students are linked to this account!".to_string(),
        });
    }
    let destination = if students.len() > 1 {
        Destination::SelectStudent
    } else {
        Destination::Dashboard
    };
    Ok((Session::for_profile(profile, students), destination))
}

pub async fn current_session(
    cookies: Option<TypedHeader<Cookie>>,
    Extension(signer): Extension<SessionSigner>,
) -> Payload<Session> {
    match authenticate(&signer, cookies) {
        Ok(session) => proceeds(session),
        Err(err) => breaks(err),
    }
}

pub async fn linked_students(
    cookies: Option<TypedHeader<Cookie>>,
    Extension(store): Extension<RecordStore>,
    Extension(signer): Extension<SessionSigner>,
) -> CookiePayload<StudentChoices> {
    let mut session = match authenticate(&signer, cookies) {
        Ok(session) => session,
        Err(err) => return breaks_with(err),
    };
    let students = store.students_by_ids(&session.student_ids).await?;
    if session.student_id.is_none() {
        // a single linked student never prompts, it becomes active right away
        if let [only] = students.as_slice() {
            session.activate(only)?;
            let token = signer.issue(&session)?;
            return proceeds_with(
                Some(session::session_cookie(&token)),
                StudentChoices {
                    students,
                    destination: Destination::Dashboard,
                },
            );
        }
    }
    let destination = if session.student_id.is_some() {
        Destination::Dashboard
    } else {
        Destination::SelectStudent
    };
    proceeds_with(
        None,
        StudentChoices {
            students,
            destination,
        },
    )
}

pub async fn select_student(
    Json(body): Json<SelectStudent>,
    cookies: Option<TypedHeader<Cookie>>,
    Extension(store): Extension<RecordStore>,
    Extension(signer): Extension<SessionSigner>,
) -> CookiePayload<SelectedStudent> {
    let mut session = match authenticate(&signer, cookies) {
        Ok(session) => session,
        Err(err) => return breaks_with(err),
    };
    let student = match store.student_by_id(body.student_id).await? {
        Some(student) => student,
        None => {
            return breaks_with(Error::InvalidSelection {
                message: format!("Student `{}` is not available!", body.student_id),
            })
        }
    };
    match session.activate(&student) {
        Ok(()) => {}
        Err(err) => return breaks_with(err),
    }
    let token = signer.issue(&session)?;
    proceeds_with(
        Some(session::session_cookie(&token)),
        SelectedStudent {
            destination: Destination::Dashboard,
            session,
        },
    )
}

pub async fn logout() -> CookiePayload<LoggedOut> {
    proceeds_with(
        Some(session::expired_session_cookie()),
        LoggedOut { logged_out: true },
    )
}

pub fn authenticate(
    signer: &SessionSigner,
    cookies: Option<TypedHeader<Cookie>>,
) -> Result<Session, Error> {
    cookies
        .as_ref()
        .and_then(|TypedHeader(cookie)| cookie.get(session::SESSION_COOKIE))
        .and_then(|token| signer.verify(token))
        .ok_or_else(Error::unauthenticated)
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedIn {
    pub destination: Destination,
    pub session: Session,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentChoices {
    pub students: Vec<Student>,
    pub destination: Destination,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectStudent {
    pub student_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectedStudent {
    pub destination: Destination,
    pub session: Session,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedOut {
    pub logged_out: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(role: Role) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            display_name: "Guardian".to_string(),
            role,
        }
    }

    fn student(name: &str) -> Student {
        Student {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            is_active: true,
        }
    }

    #[test]
    fn codes_are_uppercased_and_trimmed() {
        assert_eq!(normalize_code(" ab12 ").unwrap(), "AB12");
        assert_eq!(normalize_code("tiro2024").unwrap(), "TIRO2024");
    }

    #[test]
    fn short_codes_are_rejected_before_lookup() {
        for raw in ["", "A", "AB1", "   "] {
            match normalize_code(raw) {
                Err(Error::InvalidPayload { .. }) => {}
                other => panic!("expected invalid payload for {:?}, got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn guardian_with_one_link_goes_to_dashboard() {
        let students = vec![student("Ana")];
        let (session, destination) =
            outcome_for_profile(&profile(Role::Padre), &students).unwrap();
        assert_eq!(destination, Destination::Dashboard);
        assert_eq!(session.student_id, Some(students[0].id));
        assert_eq!(session.student_ids.len(), 1);
    }

    #[test]
    fn guardian_with_many_links_goes_to_selection() {
        let students = vec![student("Ana"), student("Bruno"), student("Carla")];
        let (session, destination) =
            outcome_for_profile(&profile(Role::Padre), &students).unwrap();
        assert_eq!(destination, Destination::SelectStudent);
        assert_eq!(session.student_id, None);
        assert_eq!(session.student_ids.len(), 3);
    }

    #[test]
    fn guardian_without_links_fails() {
        match outcome_for_profile(&profile(Role::Padre), &[]) {
            Err(Error::NoStudentsLinked { .. }) => {}
            other => panic!("expected no-students failure, got {:?}", other),
        }
    }

    #[test]
    fn admin_without_links_still_logs_in() {
        let (session, destination) = outcome_for_profile(&profile(Role::Admin), &[]).unwrap();
        assert_eq!(destination, Destination::Dashboard);
        assert_eq!(session.role, Role::Admin);
        assert!(session.student_ids.is_empty());
    }

    #[test]
    fn standalone_student_session_is_single_membered() {
        let adult = student("Diana");
        let session = Session::for_student(&adult);
        assert_eq!(session.student_id, Some(adult.id));
        assert_eq!(session.student_ids, vec![adult.id]);
        assert_eq!(session.role, Role::Alumno);
        assert_eq!(session.profile_id, None);
    }

    #[test]
    fn destination_wire_names() {
        assert_eq!(
            serde_json::to_value(Destination::Dashboard).unwrap(),
            serde_json::json!("dashboard")
        );
        assert_eq!(
            serde_json::to_value(Destination::SelectStudent).unwrap(),
            serde_json::json!("select-student")
        );
    }
}
