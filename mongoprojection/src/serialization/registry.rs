use crate::{
    expr::Type,
    serialization::{Decoder, DocumentDecoder},
};
use std::collections::BTreeMap;

/// Looks up the decoder for a static type. Implementations are read-only
/// during translation and may be shared across threads.
pub trait DecoderRegistry: Send + Sync {
    fn lookup(&self, ty: &Type) -> Option<Decoder>;
}

/// Registry that knows every scalar type, derives nullable and collection
/// decoders from their element decoders, and serves registered class
/// decoders by class name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandardDecoderRegistry {
    classes: BTreeMap<String, DocumentDecoder>,
}

impl StandardDecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class decoder under its type name, returning any decoder
    /// it replaced.
    pub fn register(&mut self, decoder: DocumentDecoder) -> Option<DocumentDecoder> {
        self.classes.insert(decoder.type_name().to_string(), decoder)
    }

    pub fn with_class(mut self, decoder: DocumentDecoder) -> Self {
        self.register(decoder);
        self
    }
}

impl DecoderRegistry for StandardDecoderRegistry {
    fn lookup(&self, ty: &Type) -> Option<Decoder> {
        match ty {
            Type::Boolean
            | Type::Int32
            | Type::Int64
            | Type::Double
            | Type::Decimal128
            | Type::String
            | Type::DateTime
            | Type::ObjectId
            | Type::Binary
            | Type::Document
            | Type::Enum(_) => Some(Decoder::Value(ty.clone())),
            Type::Nullable(inner) => self.lookup(inner).map(Decoder::nullable),
            Type::Array(item) | Type::Set(item) | Type::Grouping(_, item) => {
                self.lookup(item).map(Decoder::array)
            }
            Type::Class(name) => self.classes.get(name).cloned().map(Decoder::Document),
        }
    }
}
