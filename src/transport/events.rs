// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 传输层事件定义
//!
//! JSON信封: `{"event": <name>, "data": <payload>}`

use serde::{Deserialize, Serialize};

use crate::ptz::Direction;

/// 录像指令动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingAction {
    Start,
    Stop,
}

/// 远端 → 设备
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    PtzCommand {
        #[serde(rename = "clientId")]
        client_id: String,
        direction: Direction,
    },
    RecordingCommand {
        #[serde(rename = "clientId")]
        client_id: String,
        action: RecordingAction,
    },
    ManualModeCommand {
        #[serde(rename = "clientId")]
        client_id: String,
        enabled: bool,
    },
}

impl InboundEvent {
    pub fn client_id(&self) -> &str {
        match self {
            InboundEvent::PtzCommand { client_id, .. }
            | InboundEvent::RecordingCommand { client_id, .. }
            | InboundEvent::ManualModeCommand { client_id, .. } => client_id,
        }
    }
}

/// 设备 → 远端
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// base64 JPEG
    Frame(String),
    RecordingStatus { recording: bool, manual: bool },
    PtzStatus { moving: bool, manual: bool },
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::Frame(_) => "frame",
            OutboundEvent::RecordingStatus { .. } => "recording_status",
            OutboundEvent::PtzStatus { .. } => "ptz_status",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ptz_command() {
        let json = r#"{"event":"ptz_command","data":{"clientId":"op-1","direction":"up-left"}}"#;
        let event: InboundEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            InboundEvent::PtzCommand {
                client_id: "op-1".into(),
                direction: Direction::UpLeft
            }
        );
        assert_eq!(event.client_id(), "op-1");
    }

    #[test]
    fn parses_recording_and_manual_commands() {
        let rec: InboundEvent = serde_json::from_str(
            r#"{"event":"recording_command","data":{"clientId":"a","action":"stop"}}"#,
        )
        .unwrap();
        assert!(matches!(
            rec,
            InboundEvent::RecordingCommand { action: RecordingAction::Stop, .. }
        ));

        let manual: InboundEvent = serde_json::from_str(
            r#"{"event":"manual_mode_command","data":{"clientId":"a","enabled":true}}"#,
        )
        .unwrap();
        assert!(matches!(manual, InboundEvent::ManualModeCommand { enabled: true, .. }));
    }

    #[test]
    fn rejects_unknown_direction() {
        let json = r#"{"event":"ptz_command","data":{"clientId":"a","direction":"north"}}"#;
        assert!(serde_json::from_str::<InboundEvent>(json).is_err());
    }

    #[test]
    fn outbound_wire_format() {
        let status = OutboundEvent::RecordingStatus {
            recording: true,
            manual: false,
        };
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            r#"{"event":"recording_status","data":{"recording":true,"manual":false}}"#
        );
        let frame = OutboundEvent::Frame("QUJD".into());
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"event":"frame","data":"QUJD"}"#
        );
    }
}
