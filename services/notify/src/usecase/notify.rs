use crate::domain::repository::MailOutboxRepository;
use crate::domain::types::{CommentSnapshot, MailPayload, Person, TicketEvent, TicketSnapshot};
use crate::error::NotifyServiceError;
use crate::mail::events::render;
use crate::mail::template::{render_bodies, ticket_link};
use crate::usecase::enqueue_mail::{EnqueueMailUseCase, EnqueueOutcome};

/// The notify_* contract consumed by the ticket and comment routers.
/// Callers decide whether to notify; this facade always attempts and lets
/// the enqueuer apply skip/cooldown/duplicate policy.
pub struct TicketNotifier<R: MailOutboxRepository> {
    pub enqueuer: EnqueueMailUseCase<R>,
    pub app_base_url: String,
}

impl<R: MailOutboxRepository> TicketNotifier<R> {
    /// Render one event and hand it to the enqueuer. Recipients without an
    /// email address are dropped before anything is persisted.
    async fn enqueue_event(
        &self,
        event: TicketEvent,
    ) -> Result<Option<EnqueueOutcome>, NotifyServiceError> {
        let recipient = event.recipient();
        let Some(email) = recipient.email.clone() else {
            tracing::debug!(
                emp_no = %recipient.emp_no,
                "recipient has no email address; skipping notification"
            );
            return Ok(None);
        };
        let recipient_emp_no = Some(recipient.emp_no.clone());

        let rendered = render(&event);
        let link = ticket_link(&self.app_base_url, event.ticket().id, event.is_admin_link());
        let link_label = match &event {
            TicketEvent::RequesterCommented { .. } | TicketEvent::AdminCommented { .. } => {
                "View comment"
            }
            _ => "View ticket",
        };
        let (body_text, body_html) = render_bodies(&rendered, &link, link_label);

        let payload = MailPayload {
            event_key: event.event_key(),
            event_type: event.event_type().to_owned(),
            ticket_id: Some(event.ticket().id),
            recipient_emp_no,
            recipient_email: email,
            subject: rendered.subject,
            body_text,
            body_html,
        };
        self.enqueuer.execute(payload).await.map(Some)
    }

    /// Confirmation to the requester after ticket creation.
    pub async fn ticket_created(
        &self,
        ticket: TicketSnapshot,
        requester: Person,
    ) -> Result<(), NotifyServiceError> {
        self.enqueue_event(TicketEvent::TicketCreated { ticket, requester })
            .await?;
        Ok(())
    }

    /// Alert to every admin of the ticket's category, one mail each.
    pub async fn ticket_created_admins(
        &self,
        ticket: TicketSnapshot,
        requester: Person,
        admins: Vec<Person>,
    ) -> Result<(), NotifyServiceError> {
        for admin in admins {
            self.enqueue_event(TicketEvent::TicketCreatedAdmin {
                ticket: ticket.clone(),
                requester: requester.clone(),
                admin,
            })
            .await?;
        }
        Ok(())
    }

    pub async fn assignee_assigned(
        &self,
        ticket: TicketSnapshot,
        assignee: Person,
    ) -> Result<(), NotifyServiceError> {
        self.enqueue_event(TicketEvent::AssigneeAssigned { ticket, assignee })
            .await?;
        Ok(())
    }

    pub async fn assignee_changed(
        &self,
        ticket: TicketSnapshot,
        requester: Person,
        assignee: Option<Person>,
    ) -> Result<(), NotifyServiceError> {
        self.enqueue_event(TicketEvent::AssigneeChanged {
            ticket,
            requester,
            assignee,
        })
        .await?;
        Ok(())
    }

    pub async fn status_changed(
        &self,
        ticket: TicketSnapshot,
        requester: Person,
        new_status: String,
    ) -> Result<(), NotifyServiceError> {
        self.enqueue_event(TicketEvent::StatusChanged {
            ticket,
            requester,
            new_status,
        })
        .await?;
        Ok(())
    }

    /// Requester commented — cross-notify every category admin.
    pub async fn requester_commented(
        &self,
        ticket: TicketSnapshot,
        comment: CommentSnapshot,
        requester: Person,
        admins: Vec<Person>,
    ) -> Result<(), NotifyServiceError> {
        for admin in admins {
            self.enqueue_event(TicketEvent::RequesterCommented {
                ticket: ticket.clone(),
                comment: comment.clone(),
                requester: requester.clone(),
                admin,
            })
            .await?;
        }
        Ok(())
    }

    /// Admin commented — cross-notify the requester.
    pub async fn admin_commented(
        &self,
        ticket: TicketSnapshot,
        comment: CommentSnapshot,
        requester: Person,
        author: Person,
    ) -> Result<(), NotifyServiceError> {
        self.enqueue_event(TicketEvent::AdminCommented {
            ticket,
            comment,
            requester,
            author,
        })
        .await?;
        Ok(())
    }
}
