use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MailLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MailLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MailLogs::EventKey)
                            .string_len(200)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(MailLogs::EventType).string_len(64).not_null())
                    .col(ColumnDef::new(MailLogs::TicketId).big_integer())
                    .col(ColumnDef::new(MailLogs::RecipientEmpNo).string_len(50))
                    .col(
                        ColumnDef::new(MailLogs::RecipientEmail)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(MailLogs::Subject).string_len(255).not_null())
                    .col(ColumnDef::new(MailLogs::BodyText).text())
                    .col(ColumnDef::new(MailLogs::BodyHtml).text())
                    .col(
                        ColumnDef::new(MailLogs::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(MailLogs::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(MailLogs::LastAttemptAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(MailLogs::NextAttemptAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(MailLogs::ErrorMessage).text())
                    .col(
                        ColumnDef::new(MailLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MailLogs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_mail_logs_recipient_emp_no")
                            .from(MailLogs::Table, MailLogs::RecipientEmpNo)
                            .to(Users::Table, Users::EmpNo),
                    )
                    .to_owned(),
            )
            .await?;

        // Index for worker poll queries (due pending/failed rows by next_attempt_at).
        manager
            .create_index(
                Index::create()
                    .table(MailLogs::Table)
                    .col(MailLogs::Status)
                    .col(MailLogs::NextAttemptAt)
                    .name("idx_mail_logs_status_next_attempt_at")
                    .to_owned(),
            )
            .await?;

        // Index for the cooldown lookup (recipient + event type + ticket).
        manager
            .create_index(
                Index::create()
                    .table(MailLogs::Table)
                    .col(MailLogs::RecipientEmail)
                    .col(MailLogs::EventType)
                    .col(MailLogs::TicketId)
                    .name("idx_mail_logs_recipient_event_ticket")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MailLogs::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MailLogs {
    Table,
    Id,
    EventKey,
    EventType,
    TicketId,
    RecipientEmpNo,
    RecipientEmail,
    Subject,
    BodyText,
    BodyHtml,
    Status,
    Attempts,
    LastAttemptAt,
    NextAttemptAt,
    ErrorMessage,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    EmpNo,
}
