use sea_orm::entity::prelude::*;

/// Local user directory row, mirrored from the HR source by the sync engine.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub emp_no: String,
    pub name: Option<String>,
    pub password: String,
    /// "requester" or "admin".
    pub role: String,
    pub title: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
    pub is_verified: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::mail_logs::Entity")]
    MailLogs,
}

impl Related<super::mail_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MailLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
