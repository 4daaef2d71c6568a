use chrono::Utc;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use crate::auth::{Actor, ActorType};
use crate::entity::audit_log;
use crate::extractors::client::ClientInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Failure,
}

impl AuditOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditOutcome::Success => "success",
            AuditOutcome::Failure => "failure",
        }
    }
}

/// One privileged action to be recorded.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub actor_id: String,
    pub actor_type: ActorType,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub outcome: AuditOutcome,
    /// Generated when absent.
    pub correlation_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub detail: Option<serde_json::Value>,
}

impl AuditEntry {
    pub fn new(
        actor_id: impl Into<String>,
        actor_type: ActorType,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            actor_type,
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: None,
            outcome,
            correlation_id: None,
            ip: None,
            user_agent: None,
            detail: None,
        }
    }

    pub fn by(actor: &Actor, action: &str, entity_type: &str, outcome: AuditOutcome) -> Self {
        Self::new(actor.id.clone(), actor.actor_type, action, entity_type, outcome)
    }

    pub fn entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn client(mut self, client: &ClientInfo) -> Self {
        self.ip = client.ip.clone();
        self.user_agent = client.user_agent.clone();
        self
    }

    pub fn detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The row could not be written; the entry went to the `audit` log target instead.
    #[error("audit entry {correlation_id} was not persisted: {reason}")]
    FallbackLogged {
        correlation_id: String,
        reason: String,
    },
}

/// Append-only audit trail backed by the `audit_logs` table.
#[derive(Clone)]
pub struct AuditLogger {
    db: DatabaseConnection,
}

impl AuditLogger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persist one entry and return its correlation id.
    ///
    /// A storage failure never propagates as a hard error: the entry is emitted as a
    /// structured `warn` event on the `audit` target and `FallbackLogged` is returned.
    pub async fn write(&self, entry: AuditEntry) -> Result<String, AuditError> {
        let correlation_id = entry
            .correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let row = audit_log::ActiveModel {
            id: Set(Uuid::now_v7()),
            actor_id: Set(entry.actor_id.clone()),
            actor_type: Set(entry.actor_type.as_str().to_string()),
            action: Set(entry.action.clone()),
            entity_type: Set(entry.entity_type.clone()),
            entity_id: Set(entry.entity_id.clone()),
            outcome: Set(entry.outcome.as_str().to_string()),
            correlation_id: Set(correlation_id.clone()),
            ip: Set(entry.ip.clone()),
            user_agent: Set(entry.user_agent.clone()),
            detail: Set(entry.detail.clone()),
            created_at: Set(Utc::now()),
        };

        match audit_log::Entity::insert(row)
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => Ok(correlation_id),
            Err(e) => {
                tracing::warn!(
                    target: "audit",
                    actor_id = %entry.actor_id,
                    actor_type = entry.actor_type.as_str(),
                    action = %entry.action,
                    entity_type = %entry.entity_type,
                    entity_id = entry.entity_id.as_deref(),
                    outcome = entry.outcome.as_str(),
                    correlation_id = %correlation_id,
                    ip = entry.ip.as_deref(),
                    user_agent = entry.user_agent.as_deref(),
                    detail = entry.detail.as_ref().map(|d| d.to_string()),
                    error = %e,
                    "Audit persistence failed; recorded to log"
                );
                Err(AuditError::FallbackLogged {
                    correlation_id,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Write an entry for a caller that only needs the correlation id.
    pub async fn record(&self, entry: AuditEntry) -> String {
        match self.write(entry).await {
            Ok(id) => id,
            Err(AuditError::FallbackLogged { correlation_id, .. }) => correlation_id,
        }
    }
}
