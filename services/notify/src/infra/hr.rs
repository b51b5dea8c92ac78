//! Read-only access to the external HR source database. The source is
//! reached over a second connection pool and queried with raw SQL — its
//! tables are not ours to model as entities.

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection, FromQueryResult, Statement};

use crate::config::SyncSettings;
use crate::domain::repository::HrSourcePort;
use crate::domain::types::{SourcePasswordRow, SourceProfileRow};
use crate::error::NotifyServiceError;

/// Schema names are interpolated into SQL; only identifier characters pass.
pub fn safe_schema_name(raw: &str) -> Result<String, NotifyServiceError> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(NotifyServiceError::InvalidSchemaName(raw.to_owned()));
    }
    Ok(raw.to_owned())
}

pub struct DbHrSource {
    db: DatabaseConnection,
    schema: String,
    emp_no_like: String,
}

impl DbHrSource {
    pub fn new(db: DatabaseConnection, settings: &SyncSettings) -> Result<Self, NotifyServiceError> {
        Ok(Self {
            db,
            schema: safe_schema_name(&settings.source_schema)?,
            emp_no_like: format!("{}%", settings.emp_no_prefix),
        })
    }

    /// Accounts whose password changed after the watermark. Watermarked by
    /// the account table alone — passwords live nowhere else.
    fn password_query(&self) -> String {
        format!(
            r#"
            SELECT hu.user_id AS emp_no, hu.password, hu.update_dtime AS updated_at
            FROM {schema}.hr_accounts AS hu
            JOIN {schema}.hr_employees AS he ON he.emp_no = hu.user_id
            WHERE he.emp_no LIKE $1
              AND he.work_tp IN ('1', '3')
              AND he.emp_tp IN ('1', '2')
              AND hu.password IS NOT NULL
              AND hu.update_dtime > $2
            "#,
            schema = self.schema,
        )
    }

    /// Full profile rows. Watermarked by the greatest update time across
    /// all four joined tables, since the profile re-reads each of them.
    fn profile_query(&self) -> String {
        format!(
            r#"
            SELECT
                he.emp_no,
                he.name,
                ht.name AS title,
                hd.dept_name AS department,
                hu.password,
                mv.email,
                GREATEST(
                    COALESCE(he.update_dtime, TIMESTAMP '1970-01-01'),
                    COALESCE(hu.update_dtime, TIMESTAMP '1970-01-01'),
                    COALESCE(ht.update_dtime, TIMESTAMP '1970-01-01'),
                    COALESCE(hd.update_dtime, TIMESTAMP '1970-01-01')
                ) AS updated_at
            FROM {schema}.hr_employees AS he
            LEFT JOIN {schema}.hr_accounts AS hu
                   ON hu.user_id = he.emp_no
            LEFT JOIN {schema}.hr_title_codes AS ht
                   ON ht.code_group = 'TITLE'
                  AND ht.code = he.grade_cd
            LEFT JOIN {schema}.hr_departments AS hd
                   ON hd.dept_cd = he.dept_cd
            LEFT JOIN (
                SELECT DISTINCT ON (emp_no)
                       emp_no,
                       email
                FROM {schema}.v_hr_mail_users
                WHERE emp_no IS NOT NULL
                  AND email IS NOT NULL
                ORDER BY emp_no, email
            ) AS mv
                   ON mv.emp_no = hu.user_id
            WHERE hu.password IS NOT NULL
              AND he.emp_no LIKE $1
              AND he.work_tp IN ('1', '3')
              AND he.emp_tp IN ('1', '2')
              AND GREATEST(
                    COALESCE(he.update_dtime, TIMESTAMP '1970-01-01'),
                    COALESCE(hu.update_dtime, TIMESTAMP '1970-01-01'),
                    COALESCE(ht.update_dtime, TIMESTAMP '1970-01-01'),
                    COALESCE(hd.update_dtime, TIMESTAMP '1970-01-01')
              ) > $2
            "#,
            schema = self.schema,
        )
    }
}

#[derive(Debug, FromQueryResult)]
struct PasswordQueryRow {
    emp_no: String,
    password: String,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromQueryResult)]
struct ProfileQueryRow {
    emp_no: String,
    name: Option<String>,
    title: Option<String>,
    department: Option<String>,
    password: String,
    email: Option<String>,
    updated_at: DateTime<Utc>,
}

impl HrSourcePort for DbHrSource {
    async fn fetch_password_rows(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SourcePasswordRow>, NotifyServiceError> {
        let rows = PasswordQueryRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            self.password_query(),
            [self.emp_no_like.clone().into(), since.into()],
        ))
        .all(&self.db)
        .await
        .context("fetch password rows from HR source")?;

        Ok(rows
            .into_iter()
            .map(|row| SourcePasswordRow {
                emp_no: row.emp_no,
                password: row.password,
                updated_at: row.updated_at,
            })
            .collect())
    }

    async fn fetch_profile_rows(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SourceProfileRow>, NotifyServiceError> {
        let rows = ProfileQueryRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            self.profile_query(),
            [self.emp_no_like.clone().into(), since.into()],
        ))
        .all(&self.db)
        .await
        .context("fetch profile rows from HR source")?;

        Ok(rows
            .into_iter()
            .map(|row| SourceProfileRow {
                emp_no: row.emp_no,
                name: row.name,
                title: row.title,
                department: row.department,
                password: row.password,
                email: row.email,
                updated_at: row.updated_at,
            })
            .collect())
    }
}
