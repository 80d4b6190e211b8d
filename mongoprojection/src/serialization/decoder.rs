use crate::expr::Type;
use linked_hash_map::LinkedHashMap;

/// Describes how to rebuild a typed value from a pipeline output value.
#[derive(PartialEq, Debug, Clone)]
pub enum Decoder {
    /// A scalar (or opaque document) value of the given type.
    Value(Type),
    Nullable(Box<Decoder>),
    /// An array or set; the boxed decoder decodes each item.
    Array(Box<Decoder>),
    Document(DocumentDecoder),
}

impl Decoder {
    pub fn array(item: Decoder) -> Self {
        Decoder::Array(Box::new(item))
    }

    pub fn nullable(inner: Decoder) -> Self {
        Decoder::Nullable(Box::new(inner))
    }

    /// Metadata for a declared member of a document decoder.
    pub fn member(&self, name: &str) -> Option<&MemberDecoder> {
        match self {
            Decoder::Document(d) => d.member(name),
            Decoder::Nullable(inner) => inner.member(name),
            Decoder::Value(_) | Decoder::Array(_) => None,
        }
    }

    /// The decoder for the items of an array decoder.
    pub fn item_decoder(&self) -> Option<&Decoder> {
        match self {
            Decoder::Array(item) => Some(item),
            Decoder::Nullable(inner) => inner.item_decoder(),
            Decoder::Value(_) | Decoder::Document(_) => None,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct MemberDecoder {
    pub element_name: String,
    pub decoder: Decoder,
}

/// Structural decoder for a class or constructed shape. Immutable once built;
/// use [`DocumentDecoderBuilder`] to create one.
#[derive(PartialEq, Debug, Clone)]
pub struct DocumentDecoder {
    type_name: String,
    members: LinkedHashMap<String, MemberDecoder>,
    creator: Vec<String>,
}

impl DocumentDecoder {
    pub fn builder(type_name: impl Into<String>) -> DocumentDecoderBuilder {
        DocumentDecoderBuilder {
            type_name: type_name.into(),
            members: LinkedHashMap::new(),
            creator: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn member(&self, name: &str) -> Option<&MemberDecoder> {
        self.members.get(name)
    }

    /// Declared members in declaration order.
    pub fn members(&self) -> impl Iterator<Item = (&String, &MemberDecoder)> {
        self.members.iter()
    }

    /// Member names in the order the constructor takes them.
    pub fn creator(&self) -> &[String] {
        &self.creator
    }
}

impl From<DocumentDecoder> for Decoder {
    fn from(d: DocumentDecoder) -> Self {
        Decoder::Document(d)
    }
}

#[derive(Debug, Clone)]
pub struct DocumentDecoderBuilder {
    type_name: String,
    members: LinkedHashMap<String, MemberDecoder>,
    creator: Vec<String>,
}

impl DocumentDecoderBuilder {
    /// Declares a member read from `element_name`. Redeclaring a member
    /// replaces its metadata but keeps its original position.
    pub fn member(
        mut self,
        name: impl Into<String>,
        element_name: impl Into<String>,
        decoder: Decoder,
    ) -> Self {
        let name = name.into();
        let member = MemberDecoder {
            element_name: element_name.into(),
            decoder,
        };
        match self.members.get_mut(&name) {
            Some(existing) => *existing = member,
            None => {
                self.members.insert(name, member);
            }
        }
        self
    }

    /// Appends a constructor parameter. When none are declared the
    /// constructor takes every member in declaration order.
    pub fn creator_parameter(mut self, name: impl Into<String>) -> Self {
        self.creator.push(name.into());
        self
    }

    pub fn build(self) -> DocumentDecoder {
        let creator = if self.creator.is_empty() {
            self.members.keys().cloned().collect()
        } else {
            self.creator
        };
        DocumentDecoder {
            type_name: self.type_name,
            members: self.members,
            creator,
        }
    }
}
