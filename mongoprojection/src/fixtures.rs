//! Shared shapes for unit tests: an `Order` with nested `Item` and `Address`
//! documents, plus a registry that knows all three.
use crate::{
    expr::{Expression, FieldExpression, Type},
    serialization::{Decoder, DecoderRegistry, DocumentDecoder, StandardDecoderRegistry},
};
use lazy_static::lazy_static;

lazy_static! {
    pub(crate) static ref ADDRESS_DECODER: DocumentDecoder = DocumentDecoder::builder("Address")
        .member("City", "city", Decoder::Value(Type::String))
        .member("Zip", "zip", Decoder::Value(Type::String))
        .build();
    pub(crate) static ref ITEM_DECODER: DocumentDecoder = DocumentDecoder::builder("Item")
        .member("Name", "Name", Decoder::Value(Type::String))
        .member("Quantity", "Quantity", Decoder::Value(Type::Int32))
        .build();
    pub(crate) static ref ORDER_DECODER: DocumentDecoder = DocumentDecoder::builder("Order")
        .member("Id", "_id", Decoder::Value(Type::ObjectId))
        .member("Name", "Name", Decoder::Value(Type::String))
        .member("Category", "Category", Decoder::Value(Type::String))
        .member("Amount", "Amount", Decoder::Value(Type::Int32))
        .member("Price", "Price", Decoder::Value(Type::Double))
        .member("CreatedAt", "CreatedAt", Decoder::Value(Type::DateTime))
        .member(
            "Tags",
            "Tags",
            Decoder::array(Decoder::Value(Type::String))
        )
        .member(
            "Items",
            "Items",
            Decoder::array(ITEM_DECODER.clone().into())
        )
        .member("Address", "address", ADDRESS_DECODER.clone().into())
        .member(
            "Discount",
            "Discount",
            Decoder::nullable(Decoder::Value(Type::Double))
        )
        .build();
    pub(crate) static ref REGISTRY: StandardDecoderRegistry = StandardDecoderRegistry::new()
        .with_class(ORDER_DECODER.clone())
        .with_class(ITEM_DECODER.clone())
        .with_class(ADDRESS_DECODER.clone());
}

pub(crate) fn order_type() -> Type {
    Type::class("Order")
}

pub(crate) fn item_type() -> Type {
    Type::class("Item")
}

pub(crate) fn order_decoder() -> Decoder {
    ORDER_DECODER.clone().into()
}

pub(crate) fn order_member_type(member: &str) -> Type {
    match member {
        "Id" => Type::ObjectId,
        "Name" | "Category" => Type::String,
        "Amount" => Type::Int32,
        "Price" => Type::Double,
        "CreatedAt" => Type::DateTime,
        "Tags" => Type::array(Type::String),
        "Items" => Type::array(item_type()),
        "Address" => Type::class("Address"),
        "Discount" => Type::nullable(Type::Double),
        _ => Type::Document,
    }
}

pub(crate) fn item_member_type(member: &str) -> Type {
    match member {
        "Name" => Type::String,
        "Quantity" => Type::Int32,
        _ => Type::Document,
    }
}

/// `o`, the unbound order parameter.
pub(crate) fn order() -> Expression {
    Expression::parameter("o", order_type())
}

/// `o.<member>`, unbound.
pub(crate) fn order_member(member: &str) -> Expression {
    order().member(member, order_member_type(member))
}

/// A bound field at `path`, decoded as `ty`.
pub(crate) fn field(path: &str, ty: Type) -> Expression {
    let decoder = REGISTRY
        .lookup(&ty)
        .unwrap_or_else(|| Decoder::Value(ty.clone()));
    Expression::Field(FieldExpression {
        path: path.into(),
        decoder,
        ty,
    })
}
