use serde::{Deserialize, Serialize};

/// A user message arriving over the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    pub user_id: String,
    pub text: String,
}

/// A response leaving over the bus on the user's response subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEnvelope {
    pub user_id: String,
    pub text: String,
}

// ── Wire shape ─────────────────────────────────────────────────────

/// WhatsApp-style outgoing message, the JSON carried on response subjects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub messaging_product: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: OutgoingText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingText {
    pub body: String,
}

impl From<&OutboundEnvelope> for OutgoingMessage {
    fn from(env: &OutboundEnvelope) -> Self {
        Self {
            messaging_product: "whatsapp".into(),
            to: env.user_id.clone(),
            kind: "text".into(),
            text: OutgoingText {
                body: env.text.clone(),
            },
        }
    }
}

impl From<OutgoingMessage> for OutboundEnvelope {
    fn from(msg: OutgoingMessage) -> Self {
        Self {
            user_id: msg.to,
            text: msg.text.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outgoing_wire_shape() {
        let env = OutboundEnvelope {
            user_id: "5491100000000".into(),
            text: "hola".into(),
        };
        let v = serde_json::to_value(OutgoingMessage::from(&env)).unwrap();
        assert_eq!(v["messaging_product"], "whatsapp");
        assert_eq!(v["to"], "5491100000000");
        assert_eq!(v["type"], "text");
        assert_eq!(v["text"]["body"], "hola");
    }
}
