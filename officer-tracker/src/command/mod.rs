//! Command bus layered over `DeviceMux`: parses/dispatches the handheld
//! remote's command vocabulary and provides the raw framed exchange used
//! by higher-level protocol handshakes.

use std::sync::Arc;

use crate::error::{CommandError, MuxError};
use crate::serial::mux::{Device, DeviceMessage, DeviceMux};

/// Acknowledge sentinel low nibble, shared by both logical peers: a
/// zero-payload message whose command nibble is `Acknowledge`.
const CMD_ACKNOWLEDGE: u8 = 15;

/// The handheld remote's command vocabulary (header low nibble). Codes 0,
/// 12, 13, 14 are unassigned and rejected as `UnknownCommand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CommandAction {
    Ping = 1,
    StartOfficerTracking = 2,
    StopOfficerTracking = 3,
    SendKeyword = 4,
    RelMoveSync = 5,
    RelMoveAsync = 6,
    AbsMoveSync = 7,
    AbsMoveAsync = 8,
    Activate = 9,
    Deactivate = 10,
    SetSpeeds = 11,
    Acknowledge = 15,
}

impl TryFrom<u8> for CommandAction {
    type Error = CommandError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Ping),
            2 => Ok(Self::StartOfficerTracking),
            3 => Ok(Self::StopOfficerTracking),
            4 => Ok(Self::SendKeyword),
            5 => Ok(Self::RelMoveSync),
            6 => Ok(Self::RelMoveAsync),
            7 => Ok(Self::AbsMoveSync),
            8 => Ok(Self::AbsMoveAsync),
            9 => Ok(Self::Activate),
            10 => Ok(Self::Deactivate),
            11 => Ok(Self::SetSpeeds),
            15 => Ok(Self::Acknowledge),
            other => Err(CommandError::UnknownCommand(other)),
        }
    }
}

/// A parsed command read from a peer: the action plus its raw payload
/// bytes, uninterpreted beyond the action's own framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub action: CommandAction,
    pub args: Vec<u8>,
}

pub struct CommandBus {
    mux: Arc<DeviceMux>,
}

impl CommandBus {
    pub fn new(mux: Arc<DeviceMux>) -> Self {
        Self { mux }
    }

    /// Pops one message from `device` and parses it into a `Command`.
    pub async fn read_command(&self, device: Device) -> Result<Command, CommandError> {
        let message = self.mux.read(device).await;
        let action = CommandAction::try_from(message.command())?;
        Ok(Command {
            action,
            args: message.payload().to_vec(),
        })
    }

    /// Writes `action`'s header plus `args`, then awaits an ack message
    /// from the same device.
    pub async fn send_command(
        &self,
        device: Device,
        action: CommandAction,
        args: &[u8],
    ) -> Result<(), CommandError> {
        self.mux.write(device, action as u8, args).await?;
        self.mux.read(device).await;
        Ok(())
    }

    /// Sends an empty-payload Acknowledge message to `device`.
    pub async fn acknowledge_received(&self, device: Device) -> Result<(), MuxError> {
        self.mux.write(device, CMD_ACKNOWLEDGE, &[]).await
    }

    /// Writes a raw response payload without reinterpreting it as a
    /// `Command` — the response contract is defined entirely by the caller
    /// and the peer, not by this bus.
    pub async fn send_response(&self, device: Device, command: u8, payload: &[u8]) -> Result<(), MuxError> {
        self.mux.write(device, command, payload).await
    }

    pub fn try_read_response(&self, device: Device) -> Option<DeviceMessage> {
        self.mux.try_read(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, CommandAction::Ping)]
    #[test_case(2, CommandAction::StartOfficerTracking)]
    #[test_case(9, CommandAction::Activate)]
    #[test_case(15, CommandAction::Acknowledge)]
    fn known_codes_parse(code: u8, expected: CommandAction) {
        assert_eq!(CommandAction::try_from(code).unwrap(), expected);
    }

    #[test_case(0)]
    #[test_case(12)]
    #[test_case(13)]
    #[test_case(14)]
    fn unassigned_codes_are_rejected(code: u8) {
        assert!(matches!(
            CommandAction::try_from(code),
            Err(CommandError::UnknownCommand(_))
        ));
    }
}
