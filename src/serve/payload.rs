use serde::Serialize;

use super::env::BodyStyle;

const MESSAGE_SOURCE: &str = "maintenance-relay";
const MESSAGE_PRIORITY: &str = "normal";

#[derive(Serialize, Debug, PartialEq)]
pub struct EnvelopeMessage {
    text: String,
    source: &'static str,
    priority: &'static str,
    request_heartbeat: bool,
}

/// Body of the upstream POST, built once per inbound request.
#[derive(Serialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum OutboundPayload {
    Envelope {
        message: EnvelopeMessage,
        other_agent_id: String,
        request_heartbeat: bool,
    },
    Flat {
        text: String,
        agent_id: String,
    },
}

impl OutboundPayload {
    pub fn new(style: BodyStyle, instruction: &str, agent_id: &str) -> Self {
        match style {
            BodyStyle::Message => OutboundPayload::Envelope {
                message: EnvelopeMessage {
                    text: instruction.to_string(),
                    source: MESSAGE_SOURCE,
                    priority: MESSAGE_PRIORITY,
                    request_heartbeat: true,
                },
                other_agent_id: agent_id.to_string(),
                request_heartbeat: true,
            },
            BodyStyle::Text => OutboundPayload::Flat {
                text: instruction.to_string(),
                agent_id: agent_id.to_string(),
            },
        }
    }
}
