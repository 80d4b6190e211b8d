use crate::{
    expr::{
        Accumulator, AccumulatorFunction, BinaryOperator, DocumentExpression, Expression, Lambda,
        LiteralValue, New, Type,
    },
    fixtures::*,
    result::Error,
    serialization::{Decoder, DocumentDecoder},
    synthesizer::DecoderSynthesizer,
};

fn synthesize(expr: &Expression) -> Result<Decoder, Error> {
    DecoderSynthesizer::new(&*REGISTRY).synthesize(expr)
}

fn grouping() -> Expression {
    Expression::Document(DocumentExpression {
        expr: Box::new(Expression::parameter(
            "g",
            Type::grouping(Type::String, order_type()),
        )),
        path: None,
        decoder: Decoder::array(order_decoder()),
    })
}

#[test]
fn bound_field_reuses_its_decoder() {
    let address = Expression::Field(crate::expr::FieldExpression {
        path: "address".into(),
        decoder: ADDRESS_DECODER.clone().into(),
        ty: Type::class("Address"),
    });
    assert_eq!(Ok(ADDRESS_DECODER.clone().into()), synthesize(&address));
}

#[test]
fn construction_follows_constructor_order() {
    let shape = Expression::New(New::named(
        Type::class("Summary"),
        [
            ("Total", field("Amount", Type::Int32)),
            (
                "Label",
                Expression::binary(
                    BinaryOperator::Add,
                    field("Name", Type::String),
                    Expression::string("!"),
                    Type::String,
                ),
            ),
        ],
    ));
    let expected = DocumentDecoder::builder("Summary")
        .member("Total", "Total", Decoder::Value(Type::Int32))
        .member("Label", "Label", Decoder::Value(Type::String))
        .creator_parameter("Total")
        .creator_parameter("Label")
        .build();
    assert_eq!(Ok(expected.into()), synthesize(&shape));
}

#[test]
fn element_names_are_member_names() {
    let shape = Expression::New(New::named(
        Type::class("Shape"),
        [("City", field("address.city", Type::String))],
    ));
    let decoder = synthesize(&shape).unwrap();
    let member = decoder.member("City").unwrap();
    assert_eq!("City", member.element_name);
}

#[test]
fn nested_construction_is_synthesized_recursively() {
    let inner = New::named(
        Type::class("Inner"),
        [("Name", field("Name", Type::String))],
    );
    let outer = Expression::New(New::named(
        Type::class("Outer"),
        [("Inner", Expression::New(inner))],
    ));
    let decoder = synthesize(&outer).unwrap();
    let inner = decoder.member("Inner").unwrap();
    assert_eq!(
        Some(&Decoder::Value(Type::String)),
        inner.decoder.member("Name").map(|m| &m.decoder)
    );
}

#[test]
fn construction_without_members_fails() {
    let positional = Expression::New(New {
        ty: Type::class("Pair"),
        parameters: vec!["a".to_string()],
        arguments: vec![Expression::literal(LiteralValue::Int32(1))],
        members: None,
    });
    assert_eq!(
        Err(Error::ConstructionWithoutMembers(Type::class("Pair"))),
        synthesize(&positional)
    );
}

#[test]
fn unknown_class_has_no_decoder() {
    let unknown = Expression::parameter("x", Type::class("Unknown"));
    assert_eq!(
        Err(Error::NoDecoderForType(Type::class("Unknown"))),
        synthesize(&unknown)
    );
}

#[test]
fn push_wraps_selector_decoder_in_array() {
    let push = Expression::Accumulator(Accumulator {
        function: AccumulatorFunction::Push,
        source: Box::new(grouping()),
        selector: Some(Lambda::new(vec![], field("Name", Type::String))),
        ty: Type::array(Type::String),
    });
    assert_eq!(
        Ok(Decoder::array(Decoder::Value(Type::String))),
        synthesize(&push)
    );
}

#[test]
fn average_decodes_as_double() {
    let avg = Expression::Accumulator(Accumulator {
        function: AccumulatorFunction::Avg,
        source: Box::new(grouping()),
        selector: Some(Lambda::new(vec![], field("Amount", Type::Int32))),
        ty: Type::Double,
    });
    assert_eq!(Ok(Decoder::Value(Type::Double)), synthesize(&avg));
}

#[test]
fn first_without_selector_uses_item_decoder() {
    let first = Expression::Accumulator(Accumulator {
        function: AccumulatorFunction::First,
        source: Box::new(grouping()),
        selector: None,
        ty: order_type(),
    });
    assert_eq!(Ok(order_decoder()), synthesize(&first));
}

#[test]
fn select_into_construction_is_array_of_shape() {
    let select = Expression::sequence_call(
        "Select",
        field("Items", Type::array(item_type())),
        vec![Lambda::unary(
            "i",
            item_type(),
            Expression::New(New::named(
                Type::class("Line"),
                [("Qty", field("Items.Quantity", Type::Int32))],
            )),
        )
        .into()],
        Type::array(Type::class("Line")),
    );
    let line = DocumentDecoder::builder("Line")
        .member("Qty", "Qty", Decoder::Value(Type::Int32))
        .build();
    assert_eq!(Ok(Decoder::array(line.into())), synthesize(&select));
}

#[test]
fn conditional_construction_uses_first_branch() {
    let shape = |value: i32| {
        Expression::New(New::named(
            Type::class("Flag"),
            [("Value", Expression::literal(LiteralValue::Int32(value)))],
        ))
    };
    let conditional = Expression::conditional(
        Expression::literal(LiteralValue::Boolean(true)),
        shape(1),
        shape(2),
    );
    let expected = DocumentDecoder::builder("Flag")
        .member("Value", "Value", Decoder::Value(Type::Int32))
        .build();
    assert_eq!(Ok(expected.into()), synthesize(&conditional));
}

#[test]
fn scalar_expression_uses_registry() {
    let sum = Expression::binary(
        BinaryOperator::Add,
        field("Amount", Type::Int32),
        Expression::literal(LiteralValue::Int32(1)),
        Type::Int64,
    );
    assert_eq!(Ok(Decoder::Value(Type::Int64)), synthesize(&sum));
}

#[test]
fn member_declaration_order_does_not_move_arguments() {
    let shape = Expression::New(New {
        ty: Type::class("Pair"),
        parameters: vec!["A".to_string(), "B".to_string()],
        arguments: vec![field("Name", Type::String), field("Amount", Type::Int32)],
        members: Some(vec!["B".to_string(), "A".to_string()]),
    });
    let expected = DocumentDecoder::builder("Pair")
        .member("A", "A", Decoder::Value(Type::String))
        .member("B", "B", Decoder::Value(Type::Int32))
        .creator_parameter("A")
        .creator_parameter("B")
        .build();
    assert_eq!(Ok(expected.into()), synthesize(&shape));
}

#[test]
fn parameter_without_member_fails() {
    let shape = Expression::New(New {
        ty: Type::class("Pair"),
        parameters: vec!["A".to_string()],
        arguments: vec![field("Name", Type::String)],
        members: Some(vec!["B".to_string()]),
    });
    assert_eq!(
        Err(Error::UnsupportedTranslation(
            "constructor parameter 'A' of Pair has no matching member".to_string()
        )),
        synthesize(&shape)
    );
}
