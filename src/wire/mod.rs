//! Wire formats: messages, conversion, codecs, negotiation.

pub mod codec;
pub mod convert;
pub mod error;
pub mod messages;
pub mod negotiate;

pub use codec::{
    BinaryCodec, ErrorBody, JsonCodec, MEDIA_TYPE_BINARY, MEDIA_TYPE_JSON, ResponseCodec,
    WireBody, codec_for,
};
pub use error::{ConvertError, WireError};
pub use negotiate::{MEDIA_TYPE_BINARY_ALT, negotiate};
