//! Protocol dissection: turns assembled `DeviceMessage`s into a human-facing
//! description of what each one means, reusing `officer-tracker`'s own
//! wire-format constants and decoders so this tool can never disagree with
//! the daemon about what a byte sequence means.

use std::fmt;

use officer_tracker::command::CommandAction;
use officer_tracker::motor::{decode_move_payload, ACK_HEADER, FAULT_NIBBLE, SUCCESS_HEADER};
use officer_tracker::serial::{Device, DeviceMessage};

/// One interpreted message, in capture order.
#[derive(Debug)]
pub struct DissectedFrame {
    pub index: usize,
    pub device: Device,
    pub raw: Vec<u8>,
    pub content: FrameContent,
}

#[derive(Debug)]
pub enum FrameContent {
    /// A recognized command/action with its raw argument bytes, plus a
    /// decoded pan/tilt pair when the action is one of the move commands
    /// and the payload is the expected 6 bytes.
    Action {
        action: CommandAction,
        args: Vec<u8>,
        move_steps: Option<(i32, i32)>,
    },
    /// Motor ack sentinel (header `0x8F`).
    MotorAck,
    /// Motor success token (header `0x81`).
    MotorSuccess,
    /// Motor fault report (command nibble `0x2`).
    MotorFault,
    /// Command nibble not in the known vocabulary (0, 12, 13, 14).
    Unknown(u8),
}

impl fmt::Display for FrameContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameContent::Action { action, args, move_steps } => {
                write!(f, "{action}")?;
                if let Some((pan, tilt)) = move_steps {
                    write!(f, "(pan={pan}, tilt={tilt})")
                } else if !args.is_empty() {
                    write!(f, "({})", hex::encode(args))
                } else {
                    Ok(())
                }
            }
            FrameContent::MotorAck => write!(f, "Ack"),
            FrameContent::MotorSuccess => write!(f, "Success"),
            FrameContent::MotorFault => write!(f, "Fault"),
            FrameContent::Unknown(code) => write!(f, "Unknown(command=0x{code:x})"),
        }
    }
}

/// Move commands carry a 6-byte pan/tilt payload worth decoding on sight.
fn is_move_action(action: CommandAction) -> bool {
    matches!(
        action,
        CommandAction::RelMoveSync
            | CommandAction::RelMoveAsync
            | CommandAction::AbsMoveSync
            | CommandAction::AbsMoveAsync
    )
}

/// Interprets one assembled message. Motors-device headers are checked
/// against the ack/success/fault sentinels before falling back to the
/// shared command vocabulary, since those sentinels live outside it.
pub fn dissect_message(index: usize, message: DeviceMessage) -> DissectedFrame {
    let device = message.device;
    let header = message.header();
    let raw = message.bytes.clone();

    let content = if device == Device::Motors && header == ACK_HEADER {
        FrameContent::MotorAck
    } else if device == Device::Motors && header == SUCCESS_HEADER {
        FrameContent::MotorSuccess
    } else if device == Device::Motors && message.command() == FAULT_NIBBLE {
        FrameContent::MotorFault
    } else {
        match CommandAction::try_from(message.command()) {
            Ok(action) => {
                let args = message.payload().to_vec();
                let move_steps = if is_move_action(action) && args.len() == 6 {
                    let payload: [u8; 6] = args.clone().try_into().unwrap();
                    Some(decode_move_payload(&payload))
                } else {
                    None
                };
                FrameContent::Action { action, args, move_steps }
            }
            Err(_) => FrameContent::Unknown(message.command()),
        }
    };

    DissectedFrame { index, device, raw, content }
}
