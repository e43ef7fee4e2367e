use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::err::Error;
use crate::models::{Profile, ProfileRow, Student};

#[derive(Clone)]
pub struct RecordStore {
    pool: PgPool,
}

pub async fn connect(config: &Config) -> anyhow::Result<RecordStore> {
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&config.database_url)
        .await
        .context("Could not connect to the record store")?;
    Ok(RecordStore { pool })
}

impl RecordStore {
    pub async fn find_profile_by_code(&self, code: &str) -> Result<Option<Profile>, Error> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, display_name, role FROM profiles WHERE access_code = $1 LIMIT 1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::from)?;
        row.map(Profile::try_from).transpose()
    }

    pub async fn linked_students(&self, profile_id: Uuid) -> Result<Vec<Student>, Error> {
        sqlx::query_as::<_, Student>(
            "SELECT s.id, s.full_name, s.is_active FROM students s \
             JOIN profile_students ps ON ps.student_id = s.id \
             WHERE ps.profile_id = $1 ORDER BY s.full_name",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::from)
    }

    pub async fn find_active_student_by_code(&self, code: &str) -> Result<Option<Student>, Error> {
        sqlx::query_as::<_, Student>(
            "SELECT id, full_name, is_active FROM students \
             WHERE access_code = $1 AND is_active = TRUE LIMIT 1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::from)
    }

    pub async fn students_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Student>, Error> {
        sqlx::query_as::<_, Student>(
            "SELECT id, full_name, is_active FROM students WHERE id = ANY($1) ORDER BY full_name",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::from)
    }

    pub async fn student_by_id(&self, id: Uuid) -> Result<Option<Student>, Error> {
        sqlx::query_as::<_, Student>(
            "SELECT id, full_name, is_active FROM students WHERE id = $1 LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::from)
    }
}
