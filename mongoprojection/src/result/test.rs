use super::{Error, UserError};
use crate::expr::{NodeKind, StringComparison, Type};

#[test]
fn codes_are_distinct() {
    let errors = [
        Error::UnsupportedNode(NodeKind::Lambda, Type::Int32),
        Error::UnsupportedMember("Foo".to_string(), Type::String),
        Error::UnsupportedMethod("Foo".to_string(), Type::String),
        Error::UnsupportedStringComparison(StringComparison::CurrentCulture),
        Error::NoDecoderForType(Type::class("Order")),
        Error::ConstructionWithoutMembers(Type::class("Order")),
        Error::UnsupportedTranslation("reason".to_string()),
    ];
    let mut codes: Vec<u32> = errors.iter().map(UserError::code).collect();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(vec![5001, 5002, 5003, 5004, 5005, 5006, 5007], codes);
}

#[test]
fn technical_message_only() {
    assert_eq!(
        "Error 5002: unsupported member access String.Foo",
        Error::UnsupportedMember("Foo".to_string(), Type::String).to_string()
    );
}

#[test]
fn user_message_is_followed_by_cause() {
    assert_eq!(
        "Error 5004: Only StringComparison.Ordinal and StringComparison.OrdinalIgnoreCase are supported.\n\tCaused by:\n\tunsupported string comparison InvariantCulture",
        Error::UnsupportedStringComparison(StringComparison::InvariantCulture).to_string()
    );
}

#[test]
fn node_kind_names_operator() {
    assert_eq!(
        "Error 5001: unsupported expression node Unary(Not) of type Boolean",
        Error::UnsupportedNode(
            NodeKind::Unary(crate::expr::UnaryOperator::Not),
            Type::Boolean
        )
        .to_string()
    );
}

#[test]
fn implements_std_error() {
    let e: Box<dyn std::error::Error> =
        Box::new(Error::UnsupportedTranslation("no shape".to_string()));
    assert_eq!("Error 5007: no shape", e.to_string());
}
