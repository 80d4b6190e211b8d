use crate::{
    codegen::ProjectionBuilder,
    expr::{
        Expression, FieldPath, Lambda, Literal, LiteralValue, MethodCall, StringComparison, Type,
        ENUMERABLE, MATH,
    },
    result::{Error, Result},
    rewrites::FieldPathRewriter,
};
use bson::{bson, doc, Bson};

impl ProjectionBuilder {
    pub(crate) fn codegen_method_call(&self, call: MethodCall) -> Result<Bson> {
        if call.declaring_type.is_static_class(ENUMERABLE) {
            return self.codegen_sequence_method(call);
        }
        if call.declaring_type.is_static_class(MATH) {
            return self.codegen_math_method(call);
        }
        match call.declaring_type.underlying() {
            Type::String => self.codegen_string_method(call),
            Type::Array(_) | Type::Set(_) => self.codegen_collection_method(call),
            _ => self.codegen_generic_method(call),
        }
    }

    fn unsupported_method(call: &MethodCall) -> Error {
        Error::UnsupportedMethod(call.method.clone(), call.declaring_type.clone())
    }

    /// Lowers the receiver, if any, followed by the arguments.
    fn codegen_operands(
        &self,
        receiver: Option<Box<Expression>>,
        arguments: Vec<Expression>,
    ) -> Result<Vec<Bson>> {
        receiver
            .map(|r| *r)
            .into_iter()
            .chain(arguments)
            .map(|e| self.codegen_expression(e))
            .collect()
    }

    fn codegen_sequence_method(&self, call: MethodCall) -> Result<Bson> {
        let error = Self::unsupported_method(&call);
        let mut arguments = call.arguments.into_iter();
        let source = arguments.next().ok_or_else(|| error.clone())?;
        // whatever the binder did not turn into an accumulator has no
        // per-group equivalent
        if matches!(source, Expression::Accumulator(_))
            || matches!(source.ty().underlying(), Type::Grouping(_, _))
        {
            return Err(error);
        }
        let argument = arguments.next();
        if arguments.next().is_some() {
            return Err(error);
        }
        Ok(match (call.method.as_str(), argument) {
            ("Select", Some(Expression::Lambda(selector))) => self.codegen_map(source, selector)?,
            ("Where", Some(Expression::Lambda(predicate))) => {
                self.codegen_filter(source, predicate)?
            }
            ("Any", None) => {
                let source = self.codegen_expression(source)?;
                bson!({ "$gt": [{ "$size": source }, 0] })
            }
            ("Any", Some(Expression::Lambda(predicate))) => {
                bson!({ "$anyElementTrue": [self.codegen_map(source, predicate)?] })
            }
            ("All", Some(Expression::Lambda(predicate))) => {
                bson!({ "$allElementsTrue": [self.codegen_map(source, predicate)?] })
            }
            ("Count" | "LongCount", None) => {
                bson!({ "$size": self.codegen_expression(source)? })
            }
            ("Count" | "LongCount", Some(Expression::Lambda(predicate))) => {
                bson!({ "$size": self.codegen_filter(source, predicate)? })
            }
            ("Except" | "Intersect" | "Union", Some(other)) => {
                let operator = match call.method.as_str() {
                    "Except" => "$setDifference",
                    "Intersect" => "$setIntersection",
                    _ => "$setUnion",
                };
                let source = self.codegen_expression(source)?;
                let other = self.codegen_expression(other)?;
                bson!({ operator: [source, other] })
            }
            ("Distinct", None) => bson!({ "$setUnion": [self.codegen_expression(source)?] }),
            ("Contains", Some(item)) => {
                let source = self.codegen_expression(source)?;
                let item = self.codegen_expression(item)?;
                bson!({ "$in": [item, source] })
            }
            ("First", None) => bson!({ "$arrayElemAt": [self.codegen_expression(source)?, 0] }),
            ("First", Some(Expression::Lambda(predicate))) => {
                bson!({ "$arrayElemAt": [self.codegen_filter(source, predicate)?, 0] })
            }
            ("Last", None) => bson!({ "$arrayElemAt": [self.codegen_expression(source)?, -1] }),
            ("ElementAt", Some(index)) => {
                let source = self.codegen_expression(source)?;
                let index = self.codegen_expression(index)?;
                bson!({ "$arrayElemAt": [source, index] })
            }
            ("Take", Some(count)) => {
                let source = self.codegen_expression(source)?;
                let count = self.codegen_expression(count)?;
                bson!({ "$slice": [source, count] })
            }
            ("Sum" | "Min" | "Max" | "Average", selector) => {
                let operator = match call.method.as_str() {
                    "Sum" => "$sum",
                    "Min" => "$min",
                    "Max" => "$max",
                    _ => "$avg",
                };
                let values = match selector {
                    None => self.codegen_expression(source)?,
                    Some(Expression::Lambda(selector)) => self.codegen_map(source, selector)?,
                    Some(_) => return Err(error),
                };
                bson!({ operator: values })
            }
            ("ToList" | "ToArray" | "AsEnumerable", None) => self.codegen_expression(source)?,
            _ => return Err(error),
        })
    }

    /// The loop variable for `lambda` and its body, re-rooted from the
    /// source's path to the variable.
    fn codegen_loop_body(&self, source: &Expression, lambda: Lambda) -> Result<(String, Bson)> {
        let variable = match lambda.parameters.as_slice() {
            [parameter] => parameter.name.clone(),
            parameters => {
                return Err(Error::unsupported(format!(
                    "expected an element lambda with one parameter, found {}",
                    parameters.len()
                )))
            }
        };
        let body = match source.bound_path() {
            Some(path) => {
                FieldPathRewriter::new(path.clone(), FieldPath::loop_variable(&variable))
                    .rewrite(*lambda.body)
            }
            None => *lambda.body,
        };
        Ok((variable, self.codegen_expression(body)?))
    }

    /// Lowers `selector` applied to every item of `source`.
    fn codegen_map(&self, source: Expression, selector: Lambda) -> Result<Bson> {
        if let Some(path) = source.bound_path() {
            match selector.body.as_ref() {
                // "$xs.Name" already yields one Name per item
                Expression::Field(f) if f.path.starts_with(path) => {
                    return Ok(Bson::String(f.path.to_field_ref()))
                }
                Expression::Document(d) if d.path.as_ref() == Some(path) => {
                    return self.codegen_expression(source)
                }
                _ => {}
            }
        }
        let (variable, body) = self.codegen_loop_body(&source, selector)?;
        let input = self.codegen_expression(source)?;
        Ok(bson!({
            "$map": {
                "input": input,
                "as": variable,
                "in": body,
            }
        }))
    }

    fn codegen_filter(&self, source: Expression, predicate: Lambda) -> Result<Bson> {
        let (variable, cond) = self.codegen_loop_body(&source, predicate)?;
        let input = self.codegen_expression(source)?;
        Ok(bson!({
            "$filter": {
                "input": input,
                "as": variable,
                "cond": cond,
            }
        }))
    }

    fn codegen_math_method(&self, call: MethodCall) -> Result<Bson> {
        let operator = match (call.method.as_str(), call.arguments.len()) {
            ("Abs", 1) => "$abs",
            ("Ceiling", 1) => "$ceil",
            ("Floor", 1) => "$floor",
            ("Sqrt", 1) => "$sqrt",
            ("Exp", 1) => "$exp",
            ("Log", 1) => "$ln",
            ("Log", 2) => "$log",
            ("Log10", 1) => "$log10",
            ("Pow", 2) => "$pow",
            ("Truncate", 1) => "$trunc",
            _ => return Err(Self::unsupported_method(&call)),
        };
        let mut operands = self.codegen_operands(call.receiver, call.arguments)?;
        Ok(if operands.len() == 1 {
            bson!({ operator: operands.remove(0) })
        } else {
            bson!({ operator: operands })
        })
    }

    fn codegen_string_method(&self, call: MethodCall) -> Result<Bson> {
        match call.method.as_str() {
            "Substring" => self.codegen_substring(call),
            "ToLower" | "ToLowerInvariant" => self.codegen_string_function(call, "$toLower", 1),
            "ToUpper" | "ToUpperInvariant" => self.codegen_string_function(call, "$toUpper", 1),
            "Equals" => self.codegen_string_equals(call),
            "IndexOf" if matches!(call.arguments.len(), 1 | 2) => {
                let arity = call.arguments.len() + 1;
                self.codegen_string_function(call, self.index_of_operator(), arity)
            }
            "Split" => self.codegen_string_function(call, "$split", 2),
            "Trim" => self.codegen_trim(call, "$trim"),
            "TrimStart" => self.codegen_trim(call, "$ltrim"),
            "TrimEnd" => self.codegen_trim(call, "$rtrim"),
            _ => self.codegen_generic_method(call),
        }
    }

    /// `{operator: x}` for one operand, `{operator: [a, b, ...]}` otherwise.
    fn codegen_string_function(
        &self,
        call: MethodCall,
        operator: &str,
        arity: usize,
    ) -> Result<Bson> {
        let error = Self::unsupported_method(&call);
        let mut operands = self.codegen_operands(call.receiver, call.arguments)?;
        if operands.len() != arity {
            return Err(error);
        }
        Ok(match arity {
            1 => bson!({ operator: operands.remove(0) }),
            _ => bson!({ operator: operands }),
        })
    }

    fn codegen_substring(&self, call: MethodCall) -> Result<Bson> {
        let error = Self::unsupported_method(&call);
        let mut operands = self.codegen_operands(call.receiver, call.arguments)?;
        match operands.len() {
            // to the end of the string
            2 => operands.push(Bson::Int32(-1)),
            3 => {}
            _ => return Err(error),
        }
        let operator = self.substr_operator();
        Ok(bson!({ operator: operands }))
    }

    fn codegen_string_equals(&self, call: MethodCall) -> Result<Bson> {
        let error = Self::unsupported_method(&call);
        let mut operands: Vec<Expression> = call
            .receiver
            .map(|r| *r)
            .into_iter()
            .chain(call.arguments)
            .collect();
        let comparison = match operands.len() {
            2 => StringComparison::Ordinal,
            3 => match operands.pop() {
                Some(Expression::Literal(Literal {
                    value: LiteralValue::StringComparison(comparison),
                    ..
                })) => comparison,
                _ => return Err(error),
            },
            _ => return Err(error),
        };
        if !matches!(
            comparison,
            StringComparison::Ordinal | StringComparison::OrdinalIgnoreCase
        ) {
            return Err(Error::UnsupportedStringComparison(comparison));
        }
        let operands = operands
            .into_iter()
            .map(|e| self.codegen_expression(e))
            .collect::<Result<Vec<_>>>()?;
        Ok(match comparison {
            StringComparison::OrdinalIgnoreCase => {
                bson!({ "$eq": [{ "$strcasecmp": operands }, 0] })
            }
            _ => bson!({ "$eq": operands }),
        })
    }

    fn codegen_trim(&self, call: MethodCall, operator: &str) -> Result<Bson> {
        let error = Self::unsupported_method(&call);
        let mut operands = self
            .codegen_operands(call.receiver, call.arguments)?
            .into_iter();
        let input = operands.next().ok_or_else(|| error.clone())?;
        let spec = match (operands.next(), operands.next()) {
            (None, _) => doc! { "input": input },
            (Some(chars), None) => doc! { "input": input, "chars": chars },
            _ => return Err(error),
        };
        Ok(bson!({ operator: spec }))
    }

    fn codegen_collection_method(&self, call: MethodCall) -> Result<Bson> {
        let operator = match (call.method.as_str(), call.arguments.len()) {
            ("IsSubsetOf", 1) => "$setIsSubset",
            ("SetEquals", 1) => "$setEquals",
            ("Contains", 1) => "$in",
            _ => return self.codegen_generic_method(call),
        };
        let mut operands = self.codegen_operands(call.receiver, call.arguments)?;
        if operator == "$in" {
            // $in takes the item first
            operands.reverse();
        }
        Ok(bson!({ operator: operands }))
    }

    fn codegen_generic_method(&self, call: MethodCall) -> Result<Bson> {
        let operator = match (
            call.method.as_str(),
            call.receiver.is_some(),
            call.arguments.len(),
        ) {
            ("CompareTo", true, 1) => "$cmp",
            ("Equals", true, 1) => "$eq",
            _ => return Err(Self::unsupported_method(&call)),
        };
        let operands = self.codegen_operands(call.receiver, call.arguments)?;
        Ok(bson!({ operator: operands }))
    }
}
