use crate::expr::{NodeKind, StringComparison, Type};
pub use usererrordisplay_impl::UserErrorDisplay;

#[cfg(test)]
mod test;

pub type Result<T> = std::result::Result<T, Error>;

/// A failure reported to whoever wrote the expression. `code` stays stable;
/// `user_message` is a hint for rewriting the expression, when there is one.
pub trait UserError {
    fn code(&self) -> u32;
    fn user_message(&self) -> Option<String>;
    fn technical_message(&self) -> String;
}

/// Every way a translation can fail. All variants are unsupported
/// translations: the expression uses a form, member, method or type that has
/// no pipeline equivalent here.
#[derive(Debug, UserErrorDisplay, PartialEq, Clone)]
pub enum Error {
    UnsupportedNode(NodeKind, Type),
    UnsupportedMember(String, Type),
    UnsupportedMethod(String, Type),
    UnsupportedStringComparison(StringComparison),
    NoDecoderForType(Type),
    ConstructionWithoutMembers(Type),
    UnsupportedTranslation(String),
}

impl Error {
    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        Error::UnsupportedTranslation(reason.into())
    }
}

impl UserError for Error {
    fn code(&self) -> u32 {
        match self {
            Error::UnsupportedNode(_, _) => 5001,
            Error::UnsupportedMember(_, _) => 5002,
            Error::UnsupportedMethod(_, _) => 5003,
            Error::UnsupportedStringComparison(_) => 5004,
            Error::NoDecoderForType(_) => 5005,
            Error::ConstructionWithoutMembers(_) => 5006,
            Error::UnsupportedTranslation(_) => 5007,
        }
    }

    fn user_message(&self) -> Option<String> {
        match self {
            Error::UnsupportedStringComparison(_) => Some(
                "Only StringComparison.Ordinal and StringComparison.OrdinalIgnoreCase are supported."
                    .to_string(),
            ),
            Error::ConstructionWithoutMembers(_) => Some(
                "Result shapes must be built with named fields, e.g. an anonymous type or record."
                    .to_string(),
            ),
            Error::UnsupportedNode(_, _)
            | Error::UnsupportedMember(_, _)
            | Error::UnsupportedMethod(_, _)
            | Error::NoDecoderForType(_)
            | Error::UnsupportedTranslation(_) => None,
        }
    }

    fn technical_message(&self) -> String {
        match self {
            Error::UnsupportedNode(kind, ty) => {
                format!("unsupported expression node {kind} of type {ty}")
            }
            Error::UnsupportedMember(member, declaring_type) => {
                format!("unsupported member access {declaring_type}.{member}")
            }
            Error::UnsupportedMethod(method, declaring_type) => {
                format!("unsupported method call {declaring_type}.{method}")
            }
            Error::UnsupportedStringComparison(comparison) => {
                format!("unsupported string comparison {comparison:?}")
            }
            Error::NoDecoderForType(ty) => format!("no decoder registered for type {ty}"),
            Error::ConstructionWithoutMembers(ty) => {
                format!("construction of {ty} does not declare its member names")
            }
            Error::UnsupportedTranslation(reason) => reason.clone(),
        }
    }
}
