//! Dashboard actions: user-triggerable or periodic payload transmissions

use serde::{Deserialize, Serialize};

/// How an action's timer behaves once the dashboard is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// No timer; the action only fires on explicit triggers.
    #[default]
    Off,
    /// Timer is created and started as soon as the action set is configured.
    AutoStart,
    /// Timer is created but only starts on the first explicit trigger.
    StartOnTrigger,
    /// A user-originated trigger toggles the timer; timer-originated
    /// triggers only transmit.
    ToggleOnTrigger,
}

/// A declared action: a titled payload the dashboard can transmit, either
/// manually or on a periodic timer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Action {
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Icon resource name, opaque to the engine.
    #[serde(default)]
    pub icon: String,
    /// Payload as declared: text, or hex pairs when `binary` is set.
    #[serde(default)]
    pub tx_data: String,
    /// Interpret `tx_data` as hexadecimal bytes instead of text.
    #[serde(default)]
    pub binary: bool,
    /// Line ending appended to text payloads (e.g. "\n", "\r\n").
    #[serde(default)]
    pub eol: String,
    /// Timer behavior.
    #[serde(default)]
    pub timer_mode: TimerMode,
    /// Timer period in milliseconds.
    #[serde(default = "default_timer_interval")]
    pub timer_interval_ms: u64,
    /// Start the timer as soon as a connection is configured, regardless of
    /// mode.
    #[serde(default)]
    pub auto_execute_on_connect: bool,
}

fn default_timer_interval() -> u64 {
    100
}

impl Action {
    /// Payload bytes to hand to the transport sink.
    ///
    /// Text payloads are the UTF-8 data followed by the configured EOL.
    /// Binary payloads decode `tx_data` as hex pairs; whitespace and `0x`
    /// prefixes are tolerated, anything else ends the decode.
    pub fn tx_bytes(&self) -> Vec<u8> {
        if self.binary {
            decode_hex(&self.tx_data)
        } else {
            let mut bytes = self.tx_data.as_bytes().to_vec();
            bytes.extend_from_slice(self.eol.as_bytes());
            bytes
        }
    }
}

fn decode_hex(data: &str) -> Vec<u8> {
    let cleaned: String = data
        .split_whitespace()
        .map(|tok| tok.strip_prefix("0x").unwrap_or(tok))
        .collect();

    let mut bytes = Vec::with_capacity(cleaned.len() / 2);
    let chars: Vec<char> = cleaned.chars().collect();
    for pair in chars.chunks(2) {
        if pair.len() != 2 {
            break;
        }
        let hi = pair[0].to_digit(16);
        let lo = pair[1].to_digit(16);
        match (hi, lo) {
            (Some(hi), Some(lo)) => bytes.push((hi * 16 + lo) as u8),
            _ => break,
        }
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_payload_appends_eol() {
        let action = Action {
            tx_data: "START".to_string(),
            eol: "\r\n".to_string(),
            ..Action::default()
        };
        assert_eq!(action.tx_bytes(), b"START\r\n");
    }

    #[test]
    fn test_binary_payload_decodes_hex() {
        let action = Action {
            tx_data: "0xDE 0xAD be ef".to_string(),
            binary: true,
            ..Action::default()
        };
        assert_eq!(action.tx_bytes(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_binary_payload_stops_at_garbage() {
        let action = Action {
            tx_data: "01 02 zz 03".to_string(),
            binary: true,
            ..Action::default()
        };
        assert_eq!(action.tx_bytes(), vec![0x01, 0x02]);
    }

    #[test]
    fn test_timer_mode_serde_names() {
        let json = r#"{"title":"Poll","timer_mode":"toggle_on_trigger","timer_interval_ms":1000}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.timer_mode, TimerMode::ToggleOnTrigger);
        assert_eq!(action.timer_interval_ms, 1000);
    }

    #[test]
    fn test_interval_defaults_when_omitted() {
        let action: Action = serde_json::from_str(r#"{"title":"Ping"}"#).unwrap();
        assert_eq!(action.timer_interval_ms, 100);
        assert_eq!(action.timer_mode, TimerMode::Off);
    }
}
