use crate::{
    expr::{BinaryOperator, DocumentExpression, Expression, FieldPath, LiteralValue, Type},
    fixtures::*,
    rewrites::FieldPathRewriter,
    serialization::Decoder,
};

fn rewrite(expr: Expression) -> Expression {
    FieldPathRewriter::new(FieldPath::from("Items"), FieldPath::loop_variable("i")).rewrite(expr)
}

#[test]
fn field_under_prefix_is_moved() {
    assert_eq!(
        field("$i.Name", Type::String),
        rewrite(field("Items.Name", Type::String))
    );
}

#[test]
fn partial_segment_is_not_a_prefix() {
    assert_eq!(
        field("ItemsTotal", Type::Int32),
        rewrite(field("ItemsTotal", Type::Int32))
    );
}

#[test]
fn unrelated_field_is_untouched() {
    assert_eq!(
        field("Name", Type::String),
        rewrite(field("Name", Type::String))
    );
}

#[test]
fn document_path_is_moved() {
    let element = |path: &str| {
        Expression::Document(DocumentExpression {
            expr: Box::new(Expression::parameter("i", item_type())),
            path: Some(path.into()),
            decoder: ITEM_DECODER.clone().into(),
        })
    };
    assert_eq!(element("$i"), rewrite(element("Items")));
}

#[test]
fn current_document_has_no_path_to_move() {
    let root = Expression::Document(DocumentExpression {
        expr: Box::new(order()),
        path: None,
        decoder: order_decoder(),
    });
    assert_eq!(root.clone(), rewrite(root));
}

#[test]
fn nested_references_are_moved() {
    let sum = |left: &str| {
        Expression::binary(
            BinaryOperator::Add,
            field(left, Type::Int32),
            Expression::binary(
                BinaryOperator::Multiply,
                field("Items.Quantity", Type::Int32),
                Expression::literal(LiteralValue::Int32(2)),
                Type::Int32,
            ),
            Type::Int32,
        )
    };
    let expected = Expression::binary(
        BinaryOperator::Add,
        field("$i.Quantity", Type::Int32),
        Expression::binary(
            BinaryOperator::Multiply,
            field("$i.Quantity", Type::Int32),
            Expression::literal(LiteralValue::Int32(2)),
            Type::Int32,
        ),
        Type::Int32,
    );
    assert_eq!(expected, rewrite(sum("Items.Quantity")));
}

#[test]
fn computed_document_children_are_moved() {
    let wrapped = |path: &str| {
        Expression::Document(DocumentExpression {
            expr: Box::new(field(path, Type::String)),
            path: None,
            decoder: Decoder::Value(Type::String),
        })
    };
    assert_eq!(wrapped("$i.Name"), rewrite(wrapped("Items.Name")));
}
