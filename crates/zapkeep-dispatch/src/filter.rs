// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery decision for a single runtime event.
//!
//! [`decide`] is pure: the same event, rules, and self identity always give
//! the same [`Decision`]. Shared rules (ignore list, self-echo suppression)
//! dominate; after that each channel is judged on its own flags.

use std::collections::HashSet;

use zapkeep_config::ZapkeepConfig;
use zapkeep_core::{EventKind, RuntimeEvent};

/// Webhook channel rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRules {
    pub url: Option<String>,
    pub auto_download: bool,
    pub upload: bool,
    pub listen_acks: bool,
    pub on_presence_changed: bool,
    pub on_participants_changed: bool,
    pub on_reaction_message: bool,
    pub on_poll_response: bool,
    pub on_revoked_message: bool,
    pub on_label_updated: bool,
}

impl WebhookRules {
    /// Whether the per-kind flag lets `kind` through. Messages, QR codes and
    /// status changes have no flag.
    pub fn kind_enabled(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Message | EventKind::QrCode | EventKind::StatusChange => true,
            EventKind::Ack => self.listen_acks,
            EventKind::PresenceChange => self.on_presence_changed,
            EventKind::ParticipantsChange => self.on_participants_changed,
            EventKind::Reaction => self.on_reaction_message,
            EventKind::PollResponse => self.on_poll_response,
            EventKind::Revocation => self.on_revoked_message,
            EventKind::LabelUpdate => self.on_label_updated,
        }
    }
}

/// Websocket channel rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebsocketRules {
    pub enabled: bool,
    pub auto_download: bool,
    pub upload: bool,
}

/// Everything [`decide`] looks at besides the event itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub ignore: HashSet<String>,
    pub suppress_self_messages: bool,
    pub webhook: WebhookRules,
    pub websocket: WebsocketRules,
}

impl FilterConfig {
    pub fn from_config(config: &ZapkeepConfig) -> Self {
        let webhook = &config.webhook;
        Self {
            ignore: webhook.ignore.iter().cloned().collect(),
            suppress_self_messages: webhook.suppress_self_messages,
            webhook: WebhookRules {
                url: webhook.url.clone().filter(|url| !url.is_empty()),
                auto_download: webhook.auto_download,
                upload: webhook.upload_s3,
                listen_acks: webhook.listen_acks,
                on_presence_changed: webhook.on_presence_changed,
                on_participants_changed: webhook.on_participants_changed,
                on_reaction_message: webhook.on_reaction_message,
                on_poll_response: webhook.on_poll_response,
                on_revoked_message: webhook.on_revoked_message,
                on_label_updated: webhook.on_label_updated,
            },
            websocket: WebsocketRules {
                enabled: config.websocket.enabled,
                auto_download: config.websocket.auto_download,
                upload: config.websocket.upload_s3,
            },
        }
    }
}

/// What a channel should do with the event's media before delivering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaPlan {
    pub fetch: bool,
    pub upload: bool,
}

/// Why an event was dropped before reaching any channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Suppression {
    IgnoredSender,
    SelfEcho,
}

/// Outcome of [`decide`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decision {
    pub webhook_eligible: bool,
    pub websocket_eligible: bool,
    pub needs_media_fetch: bool,
    pub webhook_media: MediaPlan,
    pub websocket_media: MediaPlan,
    pub suppressed: Option<Suppression>,
}

impl Decision {
    fn suppressed(reason: Suppression) -> Self {
        Self {
            suppressed: Some(reason),
            ..Self::default()
        }
    }

    pub fn any_channel(&self) -> bool {
        self.webhook_eligible || self.websocket_eligible
    }
}

fn media_plan(has_media: bool, eligible: bool, auto_download: bool, upload: bool) -> MediaPlan {
    let fetch = has_media && eligible && auto_download;
    MediaPlan {
        fetch,
        upload: fetch && upload,
    }
}

/// Decides which channels receive `event`.
pub fn decide(event: &RuntimeEvent, rules: &FilterConfig, self_identity: Option<&str>) -> Decision {
    if rules.ignore.contains(&event.sender) {
        return Decision::suppressed(Suppression::IgnoredSender);
    }
    if rules.suppress_self_messages && self_identity == Some(event.sender.as_str()) {
        return Decision::suppressed(Suppression::SelfEcho);
    }

    let webhook_eligible = rules.webhook.url.is_some() && rules.webhook.kind_enabled(event.kind);
    let websocket_eligible = rules.websocket.enabled;

    let has_media = event.media.is_some();
    let webhook_media = media_plan(
        has_media,
        webhook_eligible,
        rules.webhook.auto_download,
        rules.webhook.upload,
    );
    let websocket_media = media_plan(
        has_media,
        websocket_eligible,
        rules.websocket.auto_download,
        rules.websocket.upload,
    );

    Decision {
        webhook_eligible,
        websocket_eligible,
        needs_media_fetch: webhook_media.fetch || websocket_media.fetch,
        webhook_media,
        websocket_media,
        suppressed: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use zapkeep_core::MediaRef;

    const SELF: &str = "5511900000000@c.us";
    const CONTACT: &str = "5511911111111@c.us";

    fn rules() -> FilterConfig {
        let mut config = ZapkeepConfig::default();
        config.webhook.url = Some("https://hooks.example.com".into());
        FilterConfig::from_config(&config)
    }

    fn event(kind: EventKind, sender: &str) -> RuntimeEvent {
        RuntimeEvent::new(kind, "A", sender)
    }

    fn media() -> MediaRef {
        MediaRef {
            id: "m1".into(),
            mimetype: Some("image/png".into()),
            url: Some("https://cdn.example/m1".into()),
            filename: None,
        }
    }

    #[test]
    fn ignored_sender_reaches_no_channel() {
        let d = decide(&event(EventKind::Message, "status@broadcast"), &rules(), None);
        assert!(!d.any_channel());
        assert_eq!(d.suppressed, Some(Suppression::IgnoredSender));
    }

    #[test]
    fn poll_flag_off_only_blocks_webhook() {
        let mut rules = rules();
        rules.webhook.on_poll_response = false;
        let d = decide(&event(EventKind::PollResponse, CONTACT), &rules, None);
        assert!(!d.webhook_eligible);
        assert!(d.websocket_eligible);
    }

    #[test]
    fn webhook_needs_url() {
        let rules = FilterConfig::from_config(&ZapkeepConfig::default());
        let d = decide(&event(EventKind::Message, CONTACT), &rules, None);
        assert!(!d.webhook_eligible);
        assert!(d.websocket_eligible);
    }

    #[test]
    fn self_echo_suppressed_only_when_enabled() {
        let mut rules = rules();
        let own = event(EventKind::Message, SELF);

        let d = decide(&own, &rules, Some(SELF));
        assert!(d.webhook_eligible && d.websocket_eligible);

        rules.suppress_self_messages = true;
        let d = decide(&own, &rules, Some(SELF));
        assert_eq!(d.suppressed, Some(Suppression::SelfEcho));
        assert!(!d.any_channel());

        // Unknown self identity never matches.
        let d = decide(&own, &rules, None);
        assert!(d.any_channel());
    }

    #[test]
    fn media_fetch_follows_eligible_channel_auto_download() {
        let mut rules = rules();
        let ev = event(EventKind::Message, CONTACT).with_media(media());

        let d = decide(&ev, &rules, None);
        assert!(d.needs_media_fetch);
        assert!(d.webhook_media.fetch);
        assert!(!d.websocket_media.fetch);

        rules.webhook.auto_download = false;
        let d = decide(&ev, &rules, None);
        assert!(!d.needs_media_fetch);
    }

    #[test]
    fn media_fetch_ignores_ineligible_channel() {
        let mut rules = rules();
        rules.webhook.on_reaction_message = false;
        rules.websocket.enabled = false;
        let ev = event(EventKind::Reaction, CONTACT).with_media(media());
        let d = decide(&ev, &rules, None);
        assert!(!d.needs_media_fetch);
    }

    #[test]
    fn upload_requires_fetch() {
        let mut rules = rules();
        rules.webhook.upload = true;
        let plain = decide(&event(EventKind::Message, CONTACT), &rules, None);
        assert_eq!(plain.webhook_media, MediaPlan::default());

        let with_media = decide(&event(EventKind::Message, CONTACT).with_media(media()), &rules, None);
        assert!(with_media.webhook_media.upload);
    }

    #[test]
    fn flagless_kinds_always_reach_webhook() {
        let mut rules = rules();
        rules.webhook.listen_acks = false;
        rules.webhook.on_presence_changed = false;
        rules.webhook.on_participants_changed = false;
        rules.webhook.on_reaction_message = false;
        rules.webhook.on_poll_response = false;
        rules.webhook.on_revoked_message = false;
        rules.webhook.on_label_updated = false;
        for kind in [EventKind::Message, EventKind::QrCode, EventKind::StatusChange] {
            assert!(decide(&event(kind, CONTACT), &rules, None).webhook_eligible);
        }
        assert!(!decide(&event(EventKind::Ack, CONTACT), &rules, None).webhook_eligible);
    }

    fn any_kind() -> impl Strategy<Value = EventKind> {
        prop::sample::select(EventKind::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn ignore_list_dominates(
            kind in any_kind(),
            flags in prop::array::uniform7(any::<bool>()),
            ws_enabled in any::<bool>(),
            suppress_self in any::<bool>(),
            with_media in any::<bool>(),
        ) {
            let mut rules = rules();
            rules.webhook.listen_acks = flags[0];
            rules.webhook.on_presence_changed = flags[1];
            rules.webhook.on_participants_changed = flags[2];
            rules.webhook.on_reaction_message = flags[3];
            rules.webhook.on_poll_response = flags[4];
            rules.webhook.on_revoked_message = flags[5];
            rules.webhook.on_label_updated = flags[6];
            rules.websocket.enabled = ws_enabled;
            rules.suppress_self_messages = suppress_self;
            rules.ignore.insert(CONTACT.to_string());

            let mut ev = event(kind, CONTACT);
            if with_media {
                ev = ev.with_media(media());
            }
            let d = decide(&ev, &rules, Some(CONTACT));
            prop_assert!(!d.webhook_eligible);
            prop_assert!(!d.websocket_eligible);
            prop_assert!(!d.needs_media_fetch);
        }

        #[test]
        fn decide_is_deterministic(kind in any_kind(), ws_enabled in any::<bool>()) {
            let mut rules = rules();
            rules.websocket.enabled = ws_enabled;
            let ev = event(kind, CONTACT);
            prop_assert_eq!(decide(&ev, &rules, None), decide(&ev, &rules, None));
        }

        #[test]
        fn websocket_eligibility_ignores_kind(kind in any_kind()) {
            let d = decide(&event(kind, CONTACT), &rules(), None);
            prop_assert!(d.websocket_eligible);
        }
    }
}
