use serde::{Deserialize, Deserializer, Serialize};

/// The `payment` object of a 402 response: what the gateway wants paid.
///
/// Only `amount` and `description` take part in signing; the rest is
/// informational and passed through for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirement {
    #[serde(deserialize_with = "amount_string")]
    pub amount: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(
        default,
        rename = "facilitatorURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub facilitator_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Success envelope: every paid endpoint wraps its payload in `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Body of a non-2xx gateway response. Every field is optional; a body that
/// does not parse at all is treated as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default, deserialize_with = "lenient_payment")]
    pub payment: Option<PaymentRequirement>,
}

impl ErrorBody {
    /// Parse an error body, falling back to an empty one for non-JSON input.
    pub fn from_slice(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_default()
    }

    /// The payment amount, if the body carried one.
    pub fn payment_amount(&self) -> Option<&str> {
        self.payment.as_ref().map(|p| p.amount.as_str())
    }

    /// The payment description, if the body carried one.
    pub fn payment_description(&self) -> Option<&str> {
        self.payment.as_ref().map(|p| p.description.as_str())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn amount_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

// A 402 whose `payment` object is incomplete still yields the rest of the body.
fn lenient_payment<'de, D>(deserializer: D) -> Result<Option<PaymentRequirement>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}
