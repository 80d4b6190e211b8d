use crate::{
    expr::{
        Accumulator, AccumulatorFunction, BinaryOperation, BinaryOperator, DocumentExpression,
        Expression, Lambda, Literal, LiteralValue, New, NodeKind, UnaryOperation, UnaryOperator,
    },
    options::{StringTranslationMode, TranslationOptions},
    result::{Error, Result},
};
use bson::{bson, doc, spec::BinarySubtype, Bson};

mod members;
mod methods;

/// Lowers bound expressions to aggregation expression values.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ProjectionBuilder {
    options: TranslationOptions,
}

impl ProjectionBuilder {
    pub(crate) fn new(options: TranslationOptions) -> Self {
        ProjectionBuilder { options }
    }

    fn binary_operator(op: BinaryOperator) -> &'static str {
        use BinaryOperator::*;
        match op {
            // Arithmetic operators
            Add => "$add",
            Subtract => "$subtract",
            Multiply => "$multiply",
            Divide => "$divide",
            Modulo => "$mod",

            // Boolean operators
            And => "$and",
            Or => "$or",

            // Comparison operators
            Equal => "$eq",
            NotEqual => "$ne",
            LessThan => "$lt",
            LessThanOrEqual => "$lte",
            GreaterThan => "$gt",
            GreaterThanOrEqual => "$gte",

            Coalesce => "$ifNull",
            ArrayIndex => "$arrayElemAt",
        }
    }

    fn accumulator_operator(function: AccumulatorFunction) -> &'static str {
        use AccumulatorFunction::*;
        match function {
            First => "$first",
            Last => "$last",
            Min => "$min",
            Max => "$max",
            Avg => "$avg",
            Sum => "$sum",
            Push => "$push",
            AddToSet => "$addToSet",
        }
    }

    fn substr_operator(&self) -> &'static str {
        match self.options.string_translation_mode {
            StringTranslationMode::Bytes => "$substrBytes",
            StringTranslationMode::CodePoints => "$substrCP",
        }
    }

    fn str_len_operator(&self) -> &'static str {
        match self.options.string_translation_mode {
            StringTranslationMode::Bytes => "$strLenBytes",
            StringTranslationMode::CodePoints => "$strLenCP",
        }
    }

    fn index_of_operator(&self) -> &'static str {
        match self.options.string_translation_mode {
            StringTranslationMode::Bytes => "$indexOfBytes",
            StringTranslationMode::CodePoints => "$indexOfCP",
        }
    }

    /// Wraps a string value, s, in $literal if the condition, f, is true for the string.
    fn wrap_in_literal_if<F>(s: String, f: F) -> Bson
    where
        F: Fn(&str) -> bool,
    {
        if f(&s) {
            bson!({ "$literal": s })
        } else {
            Bson::String(s)
        }
    }

    pub(crate) fn codegen_expression(&self, expr: Expression) -> Result<Bson> {
        match expr {
            Expression::Field(f) => Ok(Bson::String(f.path.to_field_ref())),
            Expression::Document(d) => self.codegen_document(d),
            Expression::Literal(l) => Self::codegen_literal(l),
            Expression::Binary(b) => self.codegen_binary(b),
            Expression::Unary(u) => self.codegen_unary(u),
            Expression::Conditional(c) => {
                let test = self.codegen_expression(*c.test)?;
                let if_true = self.codegen_expression(*c.if_true)?;
                let if_false = self.codegen_expression(*c.if_false)?;
                Ok(bson!({ "$cond": [test, if_true, if_false] }))
            }
            Expression::Member(m) => self.codegen_member_access(m),
            Expression::Call(c) => self.codegen_method_call(c),
            Expression::New(n) => {
                let shape = self.codegen_shape(n)?;
                Ok(if shape.is_empty() {
                    bson!({ "$literal": {} })
                } else {
                    Bson::Document(shape)
                })
            }
            Expression::Accumulator(a) => self.codegen_accumulator(a),
            Expression::Parameter(_) | Expression::Lambda(_) => {
                Err(Error::UnsupportedNode(expr.kind(), expr.ty()))
            }
        }
    }

    /// Lowers a construction to a document keyed by its constructor
    /// parameter names, in declaration order.
    pub(crate) fn codegen_shape(&self, new: New) -> Result<bson::Document> {
        if new.parameters.len() != new.arguments.len() {
            return Err(Error::unsupported(format!(
                "construction of {} has {} parameters but {} arguments",
                new.ty,
                new.parameters.len(),
                new.arguments.len()
            )));
        }
        new.parameters
            .into_iter()
            .zip(new.arguments)
            .map(|(name, argument)| Ok((name, self.codegen_expression(argument)?)))
            .collect::<Result<bson::Document>>()
    }

    fn codegen_document(&self, d: DocumentExpression) -> Result<Bson> {
        match d.path {
            Some(path) => Ok(Bson::String(path.to_field_ref())),
            None => match *d.expr {
                // the current document
                Expression::Parameter(_) => Ok(Bson::String("$$ROOT".to_string())),
                expr => self.codegen_expression(expr),
            },
        }
    }

    fn codegen_literal(l: Literal) -> Result<Bson> {
        Ok(match l.value {
            LiteralValue::Null => Bson::Null,
            LiteralValue::Boolean(b) => Bson::Boolean(b),
            LiteralValue::Int32(i) => Bson::Int32(i),
            LiteralValue::Int64(i) => Bson::Int64(i),
            LiteralValue::Double(d) => Bson::Double(d),
            LiteralValue::Decimal128(d) => Bson::Decimal128(d),
            LiteralValue::String(s) => Self::wrap_in_literal_if(s, |s| s.starts_with('$')),
            LiteralValue::DateTime(d) => Bson::DateTime(d),
            LiteralValue::ObjectId(o) => Bson::ObjectId(o),
            LiteralValue::Binary(bytes) => Bson::Binary(bson::Binary {
                subtype: BinarySubtype::Generic,
                bytes,
            }),
            // only meaningful as an argument to a string comparison
            LiteralValue::StringComparison(_) => {
                return Err(Error::UnsupportedNode(NodeKind::Literal, l.ty))
            }
        })
    }

    fn codegen_binary(&self, b: BinaryOperation) -> Result<Bson> {
        use BinaryOperator::*;
        let operator = if b.op == Add && b.left.ty().is_string() {
            "$concat"
        } else {
            Self::binary_operator(b.op)
        };
        let flattenable = matches!(b.op, Add | Multiply | And | Or);
        let left = self.codegen_expression(*b.left)?;
        let right = self.codegen_expression(*b.right)?;
        match left {
            // (a + b) + c lowers to a single $add: [a, b, c]
            Bson::Document(mut left)
                if flattenable
                    && left.len() == 1
                    && matches!(left.get(operator), Some(Bson::Array(_))) =>
            {
                if let Some(Bson::Array(operands)) = left.get_mut(operator) {
                    operands.push(right);
                }
                Ok(Bson::Document(left))
            }
            left => Ok(bson!({ operator: [left, right] })),
        }
    }

    fn codegen_unary(&self, u: UnaryOperation) -> Result<Bson> {
        let operand = self.codegen_expression(*u.operand)?;
        Ok(match u.op {
            UnaryOperator::Not => match operand {
                operand @ Bson::Document(_) => bson!({ "$not": [operand] }),
                operand => bson!({ "$not": operand }),
            },
            UnaryOperator::Convert => operand,
            UnaryOperator::ArrayLength => bson!({ "$size": operand }),
        })
    }

    fn codegen_accumulator(&self, acc: Accumulator) -> Result<Bson> {
        let operator = Self::accumulator_operator(acc.function);
        let argument = match acc.selector {
            Some(Lambda { body, .. }) => self.codegen_expression(*body)?,
            None => self.codegen_expression(*acc.source)?,
        };
        Ok(doc! { operator: argument }.into())
    }
}
