use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LedgerMessage {
    #[serde(rename = "Data", default)]
    pub data: Option<Value>,
    #[serde(rename = "Tags", default)]
    pub tags: Vec<Tag>,
}

impl LedgerMessage {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }

    fn body(&self) -> Option<String> {
        match self.data.as_ref()? {
            Value::String(s) => {
                let s = s.trim();
                let unquoted = s
                    .strip_prefix('"')
                    .and_then(|rest| rest.strip_suffix('"'))
                    .unwrap_or(s);
                Some(unquoted.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Result of a read-only dry run against a ledger process.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DryRunResult {
    #[serde(rename = "Messages", default)]
    pub messages: Vec<LedgerMessage>,
}

impl DryRunResult {
    /// Raw balance from the first reply: the message body when it is an
    /// integer, else the `Balance` tag, else zero.
    pub fn raw_balance(&self) -> String {
        let Some(message) = self.messages.first() else {
            return "0".to_string();
        };
        message
            .body()
            .filter(|b| is_integer(b))
            .or_else(|| {
                message
                    .tag("Balance")
                    .filter(|t| is_integer(t))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "0".to_string())
    }
}

fn is_integer(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(data: Option<Value>, tags: Vec<Tag>) -> DryRunResult {
        DryRunResult {
            messages: vec![LedgerMessage { data, tags }],
        }
    }

    #[test]
    fn test_raw_balance_from_body() {
        let result = reply(Some(Value::String("\"123456789012345678901\"".into())), vec![]);
        assert_eq!(result.raw_balance(), "123456789012345678901");
    }

    #[test]
    fn test_raw_balance_from_numeric_body() {
        let result = reply(Some(serde_json::json!(4200)), vec![]);
        assert_eq!(result.raw_balance(), "4200");
    }

    #[test]
    fn test_raw_balance_falls_back_to_tag() {
        let result = reply(
            Some(Value::String("not a number".into())),
            vec![Tag::new("Action", "Balance-Notice"), Tag::new("Balance", "777")],
        );
        assert_eq!(result.raw_balance(), "777");
    }

    #[test]
    fn test_raw_balance_defaults_to_zero() {
        assert_eq!(DryRunResult::default().raw_balance(), "0");
        let result = reply(None, vec![Tag::new("Balance", "NaN")]);
        assert_eq!(result.raw_balance(), "0");
    }

    #[test]
    fn test_dry_run_wire_shape() {
        let json = r#"{"Messages":[{"Data":"15","Tags":[{"name":"Balance","value":"15"}]}],"Spawns":[]}"#;
        let result: DryRunResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.raw_balance(), "15");
    }
}
