use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::err::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Padre,
    Alumno,
    Cliente,
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "PADRE" => Ok(Role::Padre),
            "ALUMNO" => Ok(Role::Alumno),
            "CLIENTE" => Ok(Role::Cliente),
            other => Err(Error::InternalError {
                kind: "SchemaMismatch",
                message: format!("Unknown profile role `{}`!", other),
            }),
        }
    }
}

// Raw row shape; role is validated into `Role` at the store boundary.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub display_name: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub id: Uuid,
    pub display_name: String,
    pub role: Role,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = Error;

    fn try_from(row: ProfileRow) -> Result<Self, Error> {
        Ok(Profile {
            role: Role::from_str(&row.role)?,
            id: row.id,
            display_name: row.display_name,
        })
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Student {
    pub id: Uuid,
    pub full_name: String,
    pub is_active: bool,
}
