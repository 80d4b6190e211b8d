mod decoder;
pub use decoder::{Decoder, DocumentDecoder, DocumentDecoderBuilder, MemberDecoder};
mod registry;
pub use registry::{DecoderRegistry, StandardDecoderRegistry};
mod value;
pub use value::{Composite, DecodeError, Value};

#[cfg(test)]
mod test;
