use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ops::Add;
use uuid::Uuid;

use crate::err::Error;
use crate::models::{Profile, Role, Student};

pub const SESSION_COOKIE: &str = "session";
const SESSION_DAYS: i64 = 7;

/// Resolved viewer identity, carried as a single signed token cookie.
/// Both the route guard and the screen handlers read it, so there is no
/// second copy of the identity to keep in sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub profile_id: Option<Uuid>,
    pub profile_name: Option<String>,
    pub role: Role,
    pub student_id: Option<Uuid>,
    pub student_ids: Vec<Uuid>,
    pub student_name: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn empty(role: Role) -> Self {
        Session {
            session_id: fresh_session_id(),
            profile_id: None,
            profile_name: None,
            role,
            student_id: None,
            student_ids: Vec::new(),
            student_name: None,
            expires_at: Utc::now().add(Duration::days(SESSION_DAYS)),
        }
    }

    pub fn for_profile(profile: &Profile, students: &[Student]) -> Self {
        let mut session = Session::empty(profile.role);
        session.profile_id = Some(profile.id);
        session.profile_name = Some(profile.display_name.clone());
        session.student_ids = students.iter().map(|s| s.id).collect();
        if let [only] = students {
            session.student_id = Some(only.id);
            session.student_name = Some(only.full_name.clone());
        }
        session
    }

    pub fn for_student(student: &Student) -> Self {
        let mut session = Session::empty(Role::Alumno);
        session.student_id = Some(student.id);
        session.student_ids = vec![student.id];
        session.student_name = Some(student.full_name.clone());
        session
    }

    pub fn activate(&mut self, student: &Student) -> Result<(), Error> {
        if !self.student_ids.contains(&student.id) {
            return Err(Error::InvalidSelection {
                message: format!("Student `{}` is not linked to this session!", student.id),
            });
        }
        self.student_id = Some(student.id);
        self.student_name = Some(student.full_name.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub struct SessionSigner {
    secret: String,
}

impl SessionSigner {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn issue(&self, session: &Session) -> Result<String, Error> {
        let payload = serde_json::to_vec(session)?;
        let signature = self.digest(&payload);
        Ok(format!("{}.{}", hex::encode(&payload), signature))
    }

    pub fn verify(&self, token: &str) -> Option<Session> {
        let (payload_hex, signature) = token.split_once('.')?;
        let payload = hex::decode(payload_hex).ok()?;
        if self.digest(&payload) != signature {
            return None;
        }
        let session: Session = serde_json::from_slice(&payload).ok()?;
        if session.expires_at <= Utc::now() {
            return None;
        }
        Some(session)
    }

    fn digest(&self, payload: &[u8]) -> String {
        let mut hasher: Sha256 = Digest::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(payload);
        hex::encode(hasher.finalize())
    }
}

pub fn fresh_session_id() -> String {
    let bytes: [u8; 32] = thread_rng().gen();
    let mut hasher: Sha256 = Digest::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax; HttpOnly",
        SESSION_COOKIE,
        token,
        SESSION_DAYS * 24 * 60 * 60
    )
}

pub fn expired_session_cookie() -> String {
    format!(
        "{}=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; SameSite=Lax; HttpOnly",
        SESSION_COOKIE
    )
}

pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .map(str::to_string)
}
