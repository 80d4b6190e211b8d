use crate::expr::definitions::*;

/// Visitor over the expression grammar. The default methods walk into the
/// node's children and rebuild it, so implementors only override the node
/// shapes they care about.
pub trait Visitor: Sized {
    fn visit_expression(&mut self, node: Expression) -> Expression {
        node.walk(self)
    }

    fn visit_lambda(&mut self, node: Lambda) -> Lambda {
        node.walk(self)
    }
}

fn visit_boxed<V: Visitor>(visitor: &mut V, node: Box<Expression>) -> Box<Expression> {
    Box::new(visitor.visit_expression(*node))
}

impl Expression {
    pub fn walk<V>(self, visitor: &mut V) -> Self
    where
        V: Visitor,
    {
        match self {
            Expression::Literal(_) | Expression::Parameter(_) | Expression::Field(_) => self,
            Expression::Member(m) => Expression::Member(MemberAccess {
                expr: visit_boxed(visitor, m.expr),
                ..m
            }),
            Expression::Binary(b) => Expression::Binary(BinaryOperation {
                left: visit_boxed(visitor, b.left),
                right: visit_boxed(visitor, b.right),
                ..b
            }),
            Expression::Unary(u) => Expression::Unary(UnaryOperation {
                operand: visit_boxed(visitor, u.operand),
                ..u
            }),
            Expression::Conditional(c) => Expression::Conditional(Conditional {
                test: visit_boxed(visitor, c.test),
                if_true: visit_boxed(visitor, c.if_true),
                if_false: visit_boxed(visitor, c.if_false),
                ty: c.ty,
            }),
            Expression::Call(c) => Expression::Call(MethodCall {
                receiver: c.receiver.map(|r| visit_boxed(visitor, r)),
                arguments: c
                    .arguments
                    .into_iter()
                    .map(|a| visitor.visit_expression(a))
                    .collect(),
                ..c
            }),
            Expression::Lambda(l) => Expression::Lambda(visitor.visit_lambda(l)),
            Expression::New(n) => Expression::New(New {
                arguments: n
                    .arguments
                    .into_iter()
                    .map(|a| visitor.visit_expression(a))
                    .collect(),
                ..n
            }),
            Expression::Accumulator(a) => Expression::Accumulator(Accumulator {
                source: visit_boxed(visitor, a.source),
                selector: a.selector.map(|s| visitor.visit_lambda(s)),
                ..a
            }),
            Expression::Document(d) => Expression::Document(DocumentExpression {
                expr: visit_boxed(visitor, d.expr),
                ..d
            }),
        }
    }
}

impl Lambda {
    pub fn walk<V>(self, visitor: &mut V) -> Self
    where
        V: Visitor,
    {
        Lambda {
            parameters: self.parameters,
            body: visit_boxed(visitor, self.body),
        }
    }
}
