pub mod link;
pub mod mux;

pub use link::SerialLink;
pub use mux::{assemble_stream, decode_header, encode_header, Device, DeviceMessage, DeviceMux};
