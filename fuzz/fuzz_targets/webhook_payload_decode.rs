#![no_main]

use codeagent_webhook::webhook_payload::{decode_webhook_event, DecodedWebhook};
use libfuzzer_sys::fuzz_target;

const EVENTS: [&str; 5] = [
    "issue_comment",
    "pull_request_review_comment",
    "issues",
    "ping",
    "push",
];

fuzz_target!(|data: &[u8]| {
    let Some((selector, body)) = data.split_first() else {
        return;
    };
    let event = EVENTS[usize::from(*selector) % EVENTS.len()];
    match decode_webhook_event(event, body, Some("codeagent-bot")) {
        Ok(DecodedWebhook::Command(decoded)) => {
            assert!(!decoded.actor.eq_ignore_ascii_case("codeagent-bot"));
        }
        Ok(DecodedWebhook::Ignored { reason }) => assert!(!reason.is_empty()),
        Err(error) => assert!(error.to_string().contains(event)),
    }
});
