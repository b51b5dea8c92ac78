//! Event-to-mail translation: pure construction of a human-readable
//! notification from a domain event. Never touches the database or network.

use crate::domain::types::{Person, TicketEvent, TicketSnapshot};

const STATUS_OPEN: &str = "Open";
const STATUS_IN_PROGRESS: &str = "In Progress";
const STATUS_RESOLVED: &str = "Resolved";
const STATUS_CLOSED: &str = "Closed";

const PRIORITY_LOW: &str = "Low";
const PRIORITY_MEDIUM: &str = "Medium";
const PRIORITY_HIGH: &str = "High";
const PRIORITY_URGENT: &str = "Urgent";

const LABEL_UNASSIGNED: &str = "Unassigned";
const PLACEHOLDER: &str = "-";

/// Rendered notification content, ready for the body templates.
#[derive(Debug, Clone)]
pub struct RenderedMail {
    pub subject: String,
    pub alert_type: String,
    pub summary: String,
    pub fields: Vec<(&'static str, String)>,
    pub status_label: String,
    pub priority_label: String,
}

/// Display label for a raw ticket status. Unrecognized values pass through
/// unchanged; a missing status degrades to the placeholder.
pub fn status_label(status: Option<&str>) -> String {
    let Some(status) = status else {
        return PLACEHOLDER.to_owned();
    };
    if status.is_empty() {
        return PLACEHOLDER.to_owned();
    }
    match status.to_ascii_lowercase().as_str() {
        "open" | "new" | "pending" => STATUS_OPEN.to_owned(),
        "in_progress" | "processing" | "assigned" | "working" | "progress" => {
            STATUS_IN_PROGRESS.to_owned()
        }
        "resolved" | "done" | "completed" => STATUS_RESOLVED.to_owned(),
        "closed" | "review" | "business_review" => STATUS_CLOSED.to_owned(),
        _ => status.to_owned(),
    }
}

/// Display label for a raw priority. Unrecognized or missing values fall
/// back to the medium label.
pub fn priority_label(priority: Option<&str>) -> String {
    let Some(priority) = priority else {
        return PRIORITY_MEDIUM.to_owned();
    };
    match priority.to_ascii_lowercase().as_str() {
        "low" => PRIORITY_LOW.to_owned(),
        "medium" => PRIORITY_MEDIUM.to_owned(),
        "high" => PRIORITY_HIGH.to_owned(),
        "urgent" => PRIORITY_URGENT.to_owned(),
        _ => PRIORITY_MEDIUM.to_owned(),
    }
}

fn work_type_label(work_type: &str) -> String {
    match work_type {
        "incident" => "Incident".to_owned(),
        "request" => "Request".to_owned(),
        "change" => "Change".to_owned(),
        "other" | "maintenance" | "project" => "Other".to_owned(),
        _ => work_type.to_owned(),
    }
}

fn user_label(person: &Person) -> String {
    let name = person.name.as_deref().unwrap_or(&person.emp_no);
    let title = person.title.as_deref().unwrap_or(PLACEHOLDER);
    let department = person.department.as_deref().unwrap_or(PLACEHOLDER);
    format!("{name} / {title} / {department}")
}

fn assignee_label(assignee: Option<&Person>) -> String {
    match assignee {
        Some(person) => user_label(person),
        None => LABEL_UNASSIGNED.to_owned(),
    }
}

fn category_value(ticket: &TicketSnapshot) -> String {
    if let Some(label) = &ticket.category_label {
        return label.clone();
    }
    match ticket.category_id {
        Some(id) => id.to_string(),
        None => PLACEHOLDER.to_owned(),
    }
}

fn work_type_value(ticket: &TicketSnapshot) -> String {
    if let Some(label) = &ticket.work_type_label {
        return label.clone();
    }
    match ticket.work_type.as_deref() {
        Some(work_type) => work_type_label(work_type),
        None => PLACEHOLDER.to_owned(),
    }
}

fn build_subject(summary: &str) -> String {
    format!("[HELPDESK] {summary}")
}

impl TicketEvent {
    /// Outbox category tag for this event kind.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TicketCreated { .. } => "ticket_created",
            Self::TicketCreatedAdmin { .. } => "ticket_created_admin",
            Self::AssigneeAssigned { .. } => "assignee_assigned",
            Self::AssigneeChanged { .. } => "assignee_changed",
            Self::StatusChanged { .. } => "status_changed",
            Self::RequesterCommented { .. } => "comment_requester",
            Self::AdminCommented { .. } => "comment_admin",
        }
    }

    /// Deterministic idempotency key: one per (event kind, ticket,
    /// recipient), with the target status folded in for status changes so
    /// distinct transitions never collide.
    pub fn event_key(&self) -> String {
        match self {
            Self::TicketCreated { ticket, requester } => {
                format!("ticket_created:requester:{}:{}", ticket.id, requester.emp_no)
            }
            Self::TicketCreatedAdmin { ticket, admin, .. } => {
                format!("ticket_created:admin:{}:{}", ticket.id, admin.emp_no)
            }
            Self::AssigneeAssigned { ticket, assignee } => {
                format!("assignee_assigned:admin:{}:{}", ticket.id, assignee.emp_no)
            }
            Self::AssigneeChanged {
                ticket,
                requester,
                assignee,
            } => {
                let assignee_part = assignee
                    .as_ref()
                    .map_or("none", |person| person.emp_no.as_str());
                format!(
                    "assignee_changed:requester:{}:{}:{assignee_part}",
                    ticket.id, requester.emp_no
                )
            }
            Self::StatusChanged {
                ticket,
                requester,
                new_status,
            } => {
                format!(
                    "status_changed:requester:{}:{}:{new_status}",
                    ticket.id, requester.emp_no
                )
            }
            Self::RequesterCommented {
                ticket,
                comment,
                admin,
                ..
            } => {
                format!(
                    "comment_requester:admin:{}:{}:{}",
                    ticket.id, comment.id, admin.emp_no
                )
            }
            Self::AdminCommented {
                ticket,
                comment,
                requester,
                ..
            } => {
                format!(
                    "comment_admin:requester:{}:{}:{}",
                    ticket.id, comment.id, requester.emp_no
                )
            }
        }
    }

    /// The person this event notifies.
    pub fn recipient(&self) -> &Person {
        match self {
            Self::TicketCreated { requester, .. } => requester,
            Self::TicketCreatedAdmin { admin, .. } => admin,
            Self::AssigneeAssigned { assignee, .. } => assignee,
            Self::AssigneeChanged { requester, .. } => requester,
            Self::StatusChanged { requester, .. } => requester,
            Self::RequesterCommented { admin, .. } => admin,
            Self::AdminCommented { requester, .. } => requester,
        }
    }

    pub fn ticket(&self) -> &TicketSnapshot {
        match self {
            Self::TicketCreated { ticket, .. }
            | Self::TicketCreatedAdmin { ticket, .. }
            | Self::AssigneeAssigned { ticket, .. }
            | Self::AssigneeChanged { ticket, .. }
            | Self::StatusChanged { ticket, .. }
            | Self::RequesterCommented { ticket, .. }
            | Self::AdminCommented { ticket, .. } => ticket,
        }
    }

    /// Whether the mail links to the admin ticket view.
    pub fn is_admin_link(&self) -> bool {
        matches!(
            self,
            Self::TicketCreatedAdmin { .. }
                | Self::AssigneeAssigned { .. }
                | Self::RequesterCommented { .. }
        )
    }
}

/// Translate a domain event into rendered notification content.
pub fn render(event: &TicketEvent) -> RenderedMail {
    let ticket = event.ticket();
    let priority = priority_label(ticket.priority.as_deref());

    let (alert_type, summary, status, fields) = match event {
        TicketEvent::TicketCreated { ticket, requester } => (
            "New request received",
            "Your request has been received.",
            status_label(ticket.status.as_deref()),
            vec![
                ("Title", ticket.title.clone()),
                ("Category", category_value(ticket)),
                ("Work type", work_type_value(ticket)),
                ("Requester", user_label(requester)),
            ],
        ),
        TicketEvent::TicketCreatedAdmin {
            ticket, requester, ..
        } => (
            "New request received",
            "A new request has been received.",
            status_label(ticket.status.as_deref()),
            vec![
                ("Title", ticket.title.clone()),
                ("Category", category_value(ticket)),
                ("Work type", work_type_value(ticket)),
                ("Requester", user_label(requester)),
            ],
        ),
        TicketEvent::AssigneeAssigned { ticket, assignee } => (
            "Assignee assigned",
            "You have been assigned to a request.",
            status_label(ticket.status.as_deref()),
            vec![
                ("Title", ticket.title.clone()),
                ("Category", category_value(ticket)),
                ("Work type", work_type_value(ticket)),
                ("Assignee", user_label(assignee)),
            ],
        ),
        TicketEvent::AssigneeChanged {
            ticket,
            requester,
            assignee,
        } => (
            "Assignee changed",
            "The assignee has been changed.",
            status_label(ticket.status.as_deref()),
            vec![
                ("Title", ticket.title.clone()),
                ("Category", category_value(ticket)),
                ("Work type", work_type_value(ticket)),
                ("Assignee", assignee_label(assignee.as_ref())),
                ("Requester", user_label(requester)),
            ],
        ),
        TicketEvent::StatusChanged {
            ticket, new_status, ..
        } => {
            let new_label = status_label(Some(new_status.as_str()));
            (
                "Status changed",
                "The request status has been changed.",
                new_label.clone(),
                vec![
                    ("Title", ticket.title.clone()),
                    ("Category", category_value(ticket)),
                    ("Work type", work_type_value(ticket)),
                    ("New status", new_label),
                ],
            )
        }
        TicketEvent::RequesterCommented {
            ticket,
            comment,
            requester,
            ..
        } => (
            "Requester comment",
            "The requester added a comment.",
            status_label(ticket.status.as_deref()),
            vec![
                ("Title", ticket.title.clone()),
                ("Category", category_value(ticket)),
                ("Work type", work_type_value(ticket)),
                ("Requester", user_label(requester)),
                (
                    "Comment",
                    comment.title.clone().unwrap_or_else(|| PLACEHOLDER.to_owned()),
                ),
            ],
        ),
        TicketEvent::AdminCommented {
            ticket,
            comment,
            author,
            ..
        } => (
            "Assignee comment",
            "The assignee added a comment.",
            status_label(ticket.status.as_deref()),
            vec![
                ("Title", ticket.title.clone()),
                ("Category", category_value(ticket)),
                ("Work type", work_type_value(ticket)),
                ("Assignee", user_label(author)),
                (
                    "Comment",
                    comment.title.clone().unwrap_or_else(|| PLACEHOLDER.to_owned()),
                ),
            ],
        ),
    };

    RenderedMail {
        subject: build_subject(summary),
        alert_type: alert_type.to_owned(),
        summary: summary.to_owned(),
        fields,
        status_label: status,
        priority_label: priority,
    }
}
