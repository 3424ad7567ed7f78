pub mod fault;
pub mod messages;
pub mod requests;
pub mod responses;
pub mod wire;

pub use messages::{Frame, Rep, Signature, TypedValue, WireMessage};
pub use wire::{decode_response, encode_request, AvaticaRequest, AvaticaResponse};
