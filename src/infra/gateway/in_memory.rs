// In-memory gateway - records every call instead of talking to a backend.
//
// Used by the test suites across the core services, and handy as a dry-run
// transport. Failures are scriptable per call family so tests can exercise
// the delivery-error paths.

use crate::core::gateway::{
    ChatRef, DeliveryError, DeliveryOptions, MediaKind, MediaRef, MessageGateway, MessageRef,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

/// One recorded gateway call.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Text {
        recipient: ChatRef,
        text: String,
        options: DeliveryOptions,
    },
    Media {
        recipient: ChatRef,
        kind: MediaKind,
        media: MediaRef,
        caption: Option<String>,
    },
    Deleted {
        chat: ChatRef,
        message: MessageRef,
    },
    Restricted {
        group: ChatRef,
        user_id: u64,
        can_post: bool,
        until: Option<DateTime<Utc>>,
    },
}

#[derive(Default)]
pub struct InMemoryGateway {
    events: Mutex<Vec<GatewayEvent>>,
    next_ref: AtomicI64,
    fail_deletes: AtomicBool,
    fail_restrictions: AtomicBool,
    fail_recipient: Mutex<Option<ChatRef>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in call order.
    pub fn events(&self) -> Vec<GatewayEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The text bodies delivered to one recipient, in call order.
    pub fn texts_to(&self, recipient: &ChatRef) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                GatewayEvent::Text {
                    recipient: r, text, ..
                } if r == *recipient => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Make every delivery to `recipient` fail.
    pub fn fail_deliveries_to(&self, recipient: ChatRef) {
        *self.fail_recipient.lock().unwrap() = Some(recipient);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_restrictions(&self, fail: bool) {
        self.fail_restrictions.store(fail, Ordering::SeqCst);
    }

    fn next_message_ref(&self) -> MessageRef {
        MessageRef(self.next_ref.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn delivery_blocked(&self, recipient: &ChatRef) -> bool {
        self.fail_recipient
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|blocked| blocked == recipient)
    }

    fn record(&self, event: GatewayEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl MessageGateway for InMemoryGateway {
    async fn deliver_text(
        &self,
        recipient: &ChatRef,
        text: &str,
        options: DeliveryOptions,
    ) -> Result<MessageRef, DeliveryError> {
        if self.delivery_blocked(recipient) {
            return Err(DeliveryError(format!("unreachable recipient {recipient:?}")));
        }
        self.record(GatewayEvent::Text {
            recipient: recipient.clone(),
            text: text.to_string(),
            options,
        });
        Ok(self.next_message_ref())
    }

    async fn deliver_media(
        &self,
        recipient: &ChatRef,
        kind: MediaKind,
        media: &MediaRef,
        caption: Option<&str>,
    ) -> Result<MessageRef, DeliveryError> {
        if self.delivery_blocked(recipient) {
            return Err(DeliveryError(format!("unreachable recipient {recipient:?}")));
        }
        self.record(GatewayEvent::Media {
            recipient: recipient.clone(),
            kind,
            media: media.clone(),
            caption: caption.map(str::to_string),
        });
        Ok(self.next_message_ref())
    }

    async fn delete_message(
        &self,
        chat: &ChatRef,
        message: MessageRef,
    ) -> Result<(), DeliveryError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(DeliveryError("message is gone".to_string()));
        }
        self.record(GatewayEvent::Deleted {
            chat: chat.clone(),
            message,
        });
        Ok(())
    }

    async fn restrict_member(
        &self,
        group: &ChatRef,
        user_id: u64,
        can_post: bool,
        until: Option<DateTime<Utc>>,
    ) -> Result<(), DeliveryError> {
        if self.fail_restrictions.load(Ordering::SeqCst) {
            return Err(DeliveryError("restriction rejected".to_string()));
        }
        self.record(GatewayEvent::Restricted {
            group: group.clone(),
            user_id,
            can_post,
            until,
        });
        Ok(())
    }
}
