//! EventDecorator - stamps tenant and identity metadata onto a validated
//! event, producing the immutable wire form

use std::sync::Arc;

use contracts::{IdentityValidator, TelemetryConfig, ValidationIssue, WireEvent, WireMetadata};
use tracing::error;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::validator::{StageOutcome, ValidatedEvent};

/// Decorator stage
pub struct EventDecorator {
    config: Arc<TelemetryConfig>,
    visitor_id: String,
    users: Arc<dyn IdentityValidator>,
}

impl EventDecorator {
    /// `users` must be the validator that commits user ids
    pub fn new(
        config: Arc<TelemetryConfig>,
        visitor_id: impl Into<String>,
        users: Arc<dyn IdentityValidator>,
    ) -> Self {
        Self {
            config,
            visitor_id: visitor_id.into(),
            users,
        }
    }

    /// Build the wire event
    ///
    /// The schema lookup only fails if the validator was bypassed.
    pub fn decorate(&self, validated: ValidatedEvent) -> StageOutcome<WireEvent> {
        let ValidatedEvent { event, issues } = validated;
        let Some(schema) = self.config.events.get(&event.name) else {
            error!(event = %event.name, "Decorating an event without a schema");
            let issue: ValidationIssue = ValidationError::UndefinedName { name: event.name }.to_issue();
            return StageOutcome::Rejected(vec![issue]);
        };

        let decoration = &self.config.decoration;
        StageOutcome::Accepted(WireEvent {
            tenant: self.config.tenant_id,
            category: schema
                .category
                .clone()
                .unwrap_or_else(|| decoration.category.clone()),
            event: event.name,
            origin: decoration.origin.clone(),
            customer: self.users.user_id(),
            visitor: self.visitor_id.clone(),
            timestamp: event.timestamp,
            context: event.attributes,
            metadata: WireMetadata {
                channel: decoration.channel.clone(),
                realtime: schema.realtime && self.config.dispatch.realtime_enabled,
                event_id: Uuid::new_v4(),
                validations: issues,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityStore;
    use contracts::{EventSchema, RawEvent};

    fn decorator(config: TelemetryConfig) -> (EventDecorator, Arc<IdentityStore>) {
        let identity = Arc::new(IdentityStore::with_visitor_id("feedfacecafebeef"));
        let decorator = EventDecorator::new(
            Arc::new(config),
            identity.visitor_id(),
            identity.clone() as Arc<dyn IdentityValidator>,
        );
        (decorator, identity)
    }

    fn validated(event: RawEvent) -> ValidatedEvent {
        ValidatedEvent {
            event,
            issues: vec![ValidationIssue::new(1030, "extra")],
        }
    }

    #[test]
    fn test_decorate_stamps_metadata() {
        let mut config =
            TelemetryConfig::new(42).with_event(EventSchema::new("page_view").with_realtime(true));
        config.decoration.channel = Some("web".into());
        let (decorator, _) = decorator(config);

        let raw = RawEvent::new("page_view").with_attribute("path", "/home");
        let StageOutcome::Accepted(wire) = decorator.decorate(validated(raw.clone())) else {
            panic!("schema exists");
        };

        assert_eq!(wire.tenant, 42);
        assert_eq!(wire.category, "track");
        assert_eq!(wire.origin, "sdk");
        assert_eq!(wire.event, "page_view");
        assert_eq!(wire.customer, None);
        assert_eq!(wire.actor_id(), "feedfacecafebeef");
        assert_eq!(wire.timestamp, raw.timestamp);
        assert_eq!(wire.context, raw.attributes);
        assert_eq!(wire.metadata.channel.as_deref(), Some("web"));
        assert!(wire.metadata.realtime);
        assert_eq!(wire.metadata.validations.len(), 1);
    }

    #[test]
    fn test_realtime_respects_global_switch() {
        let mut config =
            TelemetryConfig::new(1).with_event(EventSchema::new("alert").with_realtime(true));
        config.dispatch.realtime_enabled = false;
        let (decorator, _) = decorator(config);

        let StageOutcome::Accepted(wire) = decorator.decorate(validated(RawEvent::new("alert")))
        else {
            panic!("schema exists");
        };
        assert!(!wire.metadata.realtime);
    }

    #[test]
    fn test_customer_and_category_override() {
        let mut schema = EventSchema::new("checkout");
        schema.category = Some("commerce".into());
        let (decorator, identity) = decorator(TelemetryConfig::new(1).with_event(schema));
        IdentityValidator::commit_user_id(identity.as_ref(), "user-9");

        let StageOutcome::Accepted(wire) = decorator.decorate(validated(RawEvent::new("checkout")))
        else {
            panic!("schema exists");
        };
        assert_eq!(wire.category, "commerce");
        assert_eq!(wire.customer.as_deref(), Some("user-9"));
        assert_eq!(wire.actor_id(), "user-9");
        assert_ne!(wire.id(), Uuid::nil());
    }

    #[test]
    fn test_missing_schema_is_rejected() {
        let (decorator, _) = decorator(TelemetryConfig::new(1));
        match decorator.decorate(validated(RawEvent::new("ghost"))) {
            StageOutcome::Rejected(issues) => assert_eq!(issues[0].code, 1010),
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
