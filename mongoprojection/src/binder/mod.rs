use crate::{
    expr::{
        visitor::Visitor, Accumulator, AccumulatorFunction, Conditional, DocumentExpression,
        Expression, FieldExpression, FieldPath, Lambda, Literal, LiteralValue, MemberAccess,
        MethodCall, New, Parameter, Type, ENUMERABLE,
    },
    result::{Error, Result},
    serialization::{Decoder, DecoderRegistry},
    synthesizer::DecoderSynthesizer,
};
use std::collections::BTreeMap;


/// The member of a grouping parameter that denotes the group's key.
const GROUP_KEY_MEMBER: &str = "Key";

/// Substitutions in effect while binding: what each lambda parameter is
/// bound to and, inside a group projector, the bound group key. Extending an
/// environment produces a new one; nothing is mutated in place.
#[derive(Debug, Clone, Default)]
pub(crate) struct Environment {
    parameters: BTreeMap<String, Expression>,
    group: Option<GroupScope>,
}

#[derive(Debug, Clone)]
struct GroupScope {
    parameter: String,
    key: Expression,
}

impl Environment {
    pub(crate) fn with_parameter(&self, name: impl Into<String>, bound: Expression) -> Self {
        let mut environment = self.clone();
        environment.parameters.insert(name.into(), bound);
        environment
    }

    pub(crate) fn with_group_key(&self, parameter: impl Into<String>, key: Expression) -> Self {
        Environment {
            parameters: self.parameters.clone(),
            group: Some(GroupScope {
                parameter: parameter.into(),
                key,
            }),
        }
    }

    fn without_parameter(&self, name: &str) -> Self {
        let mut environment = self.clone();
        environment.parameters.remove(name);
        environment
    }

    fn lookup(&self, name: &str) -> Option<&Expression> {
        self.parameters.get(name)
    }

    fn group_key(&self) -> Option<&Expression> {
        self.group.as_ref().map(|g| &g.key)
    }

    /// Whether `expr` is the grouping parameter, before or after binding.
    fn is_group_parameter(&self, expr: &Expression) -> bool {
        let Some(group) = &self.group else {
            return false;
        };
        match expr {
            Expression::Parameter(p) => p.name == group.parameter,
            Expression::Document(d) => {
                d.path.is_none()
                    && matches!(d.expr.as_ref(), Expression::Parameter(p) if p.name == group.parameter)
            }
            _ => false,
        }
    }
}

/// Replaces parameter references and the member chains rooted at them with
/// bound field and document nodes. Members that the decoders do not know are
/// left as plain member accesses for the stage builder to handle or reject.
/// The only failure binding reports itself is a collection whose items have
/// no decoder.
pub(crate) struct Binder<'a> {
    registry: &'a dyn DecoderRegistry,
    environment: Environment,
    failure: Option<Error>,
}

/// Binds the body of a single-parameter projector whose parameter is the
/// current document, decodable with `parameter_decoder`.
pub(crate) fn bind_projector(
    registry: &dyn DecoderRegistry,
    projector: Lambda,
    parameter_decoder: &Decoder,
) -> Result<Expression> {
    let parameter = single_parameter(&projector)?;
    let environment = Environment::default().with_parameter(
        parameter.name.clone(),
        root_document(parameter, parameter_decoder.clone()),
    );
    Binder::new(registry, environment).bind(*projector.body)
}

/// Binds the body of a group projector. Its parameter is the grouping, bound
/// as an array of source elements, and its `Key` member is replaced with the
/// already bound key expression.
pub(crate) fn bind_group_projector(
    registry: &dyn DecoderRegistry,
    projector: Lambda,
    element_decoder: &Decoder,
    key: Expression,
) -> Result<Expression> {
    let parameter = single_parameter(&projector)?;
    let name = parameter.name.clone();
    let grouping = root_document(parameter, Decoder::array(element_decoder.clone()));
    let environment = Environment::default()
        .with_parameter(name.clone(), grouping)
        .with_group_key(name, key);
    Binder::new(registry, environment).bind(*projector.body)
}

fn single_parameter(lambda: &Lambda) -> Result<Parameter> {
    match lambda.parameters.as_slice() {
        [parameter] => Ok(parameter.clone()),
        parameters => Err(Error::unsupported(format!(
            "expected a lambda with exactly one parameter, found {}",
            parameters.len()
        ))),
    }
}

fn root_document(parameter: Parameter, decoder: Decoder) -> Expression {
    Expression::Document(DocumentExpression {
        expr: Box::new(Expression::Parameter(parameter)),
        path: None,
        decoder,
    })
}

/// The argument a named-field construction supplies for `member`: the one
/// passed to the same-named constructor parameter.
fn constructed_member<'e>(new: &'e New, member: &str) -> Option<&'e Expression> {
    if !new.members.as_ref()?.iter().any(|m| m == member) {
        return None;
    }
    new.parameters
        .iter()
        .zip(&new.arguments)
        .find_map(|(parameter, argument)| (parameter == member).then_some(argument))
}

impl<'a> Binder<'a> {
    pub(crate) fn new(registry: &'a dyn DecoderRegistry, environment: Environment) -> Self {
        Binder {
            registry,
            environment,
            failure: None,
        }
    }

    pub(crate) fn bind(mut self, expr: Expression) -> Result<Expression> {
        let bound = self.visit_expression(expr);
        match self.failure {
            Some(e) => Err(e),
            None => Ok(bound),
        }
    }

    /// Keeps the first failure; binding carries on so the tree stays whole.
    fn fail(&mut self, error: Error) {
        self.failure.get_or_insert(error);
    }

    fn bind_member(&mut self, m: MemberAccess) -> Expression {
        if m.member == GROUP_KEY_MEMBER && self.environment.is_group_parameter(&m.expr) {
            if let Some(key) = self.environment.group_key() {
                return key.clone();
            }
        }
        let expr = self.visit_expression(*m.expr);
        if let Some(bound) = Self::resolve_member(&expr, &m.member, &m.ty) {
            return bound;
        }
        match expr {
            Expression::Accumulator(acc)
                if acc.selector.is_none()
                    && matches!(
                        acc.function,
                        AccumulatorFunction::First | AccumulatorFunction::Last
                    ) =>
            {
                self.fold_member_into_accumulator(acc, m.member, m.declaring_type, m.ty)
            }
            expr => Expression::Member(MemberAccess {
                expr: Box::new(expr),
                ..m
            }),
        }
    }

    /// Resolves `member` against a bound node using its decoder's member
    /// metadata, or against the arguments of a named-field construction.
    fn resolve_member(expr: &Expression, member: &str, ty: &Type) -> Option<Expression> {
        match expr {
            Expression::Field(f) => f.decoder.member(member).map(|info| {
                Expression::Field(FieldExpression {
                    path: f.path.child(info.element_name.clone()),
                    decoder: info.decoder.clone(),
                    ty: ty.clone(),
                })
            }),
            Expression::Document(d) => {
                if let Expression::New(new) = d.expr.as_ref() {
                    if let Some(argument) = constructed_member(new, member) {
                        return Some(argument.clone());
                    }
                }
                d.decoder.member(member).map(|info| {
                    let path = match &d.path {
                        Some(path) => path.child(info.element_name.clone()),
                        None => FieldPath::new([info.element_name.clone()]),
                    };
                    Expression::Field(FieldExpression {
                        path,
                        decoder: info.decoder.clone(),
                        ty: ty.clone(),
                    })
                })
            }
            Expression::New(new) => constructed_member(new, member).cloned(),
            _ => None,
        }
    }

    /// `g.First().Amount` accumulates `Amount` directly.
    fn fold_member_into_accumulator(
        &mut self,
        acc: Accumulator,
        member: String,
        declaring_type: Type,
        ty: Type,
    ) -> Expression {
        let element_type = acc.source.ty().item_type().cloned().unwrap_or(Type::Document);
        let element = self.element_binding(
            &acc.source,
            Parameter {
                name: "item".to_string(),
                ty: element_type,
            },
        );
        match element.and_then(|e| Self::resolve_member(&e, &member, &ty)) {
            Some(body) => Expression::Accumulator(Accumulator {
                selector: Some(Lambda::new(Vec::new(), body)),
                ty,
                ..acc
            }),
            None => Expression::Member(MemberAccess {
                expr: Box::new(Expression::Accumulator(acc)),
                member,
                declaring_type,
                ty,
            }),
        }
    }

    /// Binds `parameter` as one item of the collection `source`. Items of a
    /// bound array live under the array's own path; items of a computed array
    /// live under the loop variable named after the parameter.
    fn element_binding(
        &mut self,
        source: &Expression,
        parameter: Parameter,
    ) -> Option<Expression> {
        let (path, decoder) = match source {
            Expression::Field(f) => (Some(f.path.clone()), f.decoder.item_decoder()?.clone()),
            Expression::Document(d) => (d.path.clone(), d.decoder.item_decoder()?.clone()),
            _ => match DecoderSynthesizer::new(self.registry).item_decoder(source) {
                Ok(decoder) => (Some(FieldPath::loop_variable(&parameter.name)), decoder),
                Err(e) => {
                    self.fail(e);
                    return None;
                }
            },
        };
        Some(Expression::Document(DocumentExpression {
            expr: Box::new(Expression::Parameter(parameter)),
            path,
            decoder,
        }))
    }

    fn bind_nested_lambda(&mut self, lambda: Lambda, source: Option<&Expression>) -> Lambda {
        let environment = match lambda.parameters.as_slice() {
            [parameter] => match source.and_then(|s| self.element_binding(s, parameter.clone())) {
                Some(binding) => self
                    .environment
                    .with_parameter(parameter.name.clone(), binding),
                None => self.environment.without_parameter(&parameter.name),
            },
            _ => self.environment.clone(),
        };
        let mut nested = Binder::new(self.registry, environment);
        let lambda = lambda.walk(&mut nested);
        if let Some(e) = nested.failure {
            self.fail(e);
        }
        lambda
    }

    fn bind_call(&mut self, call: MethodCall) -> Expression {
        let receiver = call.receiver.map(|r| Box::new(self.visit_expression(*r)));
        let mut source = receiver.as_deref().cloned();
        let mut arguments = Vec::with_capacity(call.arguments.len());
        for argument in call.arguments {
            let bound = match argument {
                Expression::Lambda(lambda) => {
                    Expression::Lambda(self.bind_nested_lambda(lambda, source.as_ref()))
                }
                argument => self.visit_expression(argument),
            };
            if source.is_none() {
                source = Some(bound.clone());
            }
            arguments.push(bound);
        }
        let call = MethodCall {
            receiver,
            arguments,
            ..call
        };
        match self.accumulator_for(&call) {
            Some(accumulator) => accumulator,
            None => Expression::Call(call),
        }
    }

    /// Inside a group projector, sequence operators applied to the grouping
    /// become accumulators. Forms without an accumulator equivalent are left
    /// as calls, which the stage builder rejects.
    fn accumulator_for(&self, call: &MethodCall) -> Option<Expression> {
        self.environment.group.as_ref()?;
        if !call.declaring_type.is_static_class(ENUMERABLE) || call.arguments.len() > 2 {
            return None;
        }
        let source = call.arguments.first()?;
        if let Expression::Accumulator(acc) = source {
            if acc.function != AccumulatorFunction::Push || call.arguments.len() != 1 {
                return None;
            }
            // g.Select(sel).Op() accumulates sel directly
            let function = match call.method.as_str() {
                "Distinct" => AccumulatorFunction::AddToSet,
                "ToList" | "ToArray" | "AsEnumerable" => acc.function,
                "First" => AccumulatorFunction::First,
                "Last" => AccumulatorFunction::Last,
                "Min" => AccumulatorFunction::Min,
                "Max" => AccumulatorFunction::Max,
                "Sum" => AccumulatorFunction::Sum,
                "Average" => AccumulatorFunction::Avg,
                _ => return None,
            };
            return Some(Expression::Accumulator(Accumulator {
                function,
                ty: call.ty.clone(),
                ..acc.clone()
            }));
        }
        if !self.environment.is_group_parameter(source) {
            return None;
        }
        let selector = match call.arguments.get(1) {
            Some(Expression::Lambda(selector)) => Some(selector.clone()),
            Some(_) => return None,
            None => None,
        };
        let one = || {
            Expression::Literal(Literal {
                value: LiteralValue::Int32(1),
                ty: call.ty.clone(),
            })
        };
        let (function, selector) = match (call.method.as_str(), selector) {
            // a lambda passed to First/Last is a predicate, not a selector
            ("First", None) => (AccumulatorFunction::First, None),
            ("Last", None) => (AccumulatorFunction::Last, None),
            ("Min", selector) => (AccumulatorFunction::Min, selector),
            ("Max", selector) => (AccumulatorFunction::Max, selector),
            ("Sum", selector) => (AccumulatorFunction::Sum, selector),
            ("Average", selector) => (AccumulatorFunction::Avg, selector),
            ("Select", Some(selector)) => (AccumulatorFunction::Push, Some(selector)),
            ("Count" | "LongCount", None) => {
                (AccumulatorFunction::Sum, Some(Lambda::new(Vec::new(), one())))
            }
            ("Count" | "LongCount", Some(predicate)) => {
                let counted = Expression::Conditional(Conditional {
                    test: predicate.body,
                    if_true: Box::new(one()),
                    if_false: Box::new(Expression::Literal(Literal {
                        value: LiteralValue::Int32(0),
                        ty: call.ty.clone(),
                    })),
                    ty: call.ty.clone(),
                });
                (
                    AccumulatorFunction::Sum,
                    Some(Lambda::new(predicate.parameters, counted)),
                )
            }
            _ => return None,
        };
        Some(Expression::Accumulator(Accumulator {
            function,
            source: Box::new(source.clone()),
            selector,
            ty: call.ty.clone(),
        }))
    }

    fn bind_accumulator(&mut self, acc: Accumulator) -> Expression {
        let source = self.visit_expression(*acc.source);
        let selector = acc
            .selector
            .map(|s| self.bind_nested_lambda(s, Some(&source)));
        Expression::Accumulator(Accumulator {
            function: acc.function,
            source: Box::new(source),
            selector,
            ty: acc.ty,
        })
    }
}

impl Visitor for Binder<'_> {
    fn visit_expression(&mut self, node: Expression) -> Expression {
        match node {
            Expression::Parameter(p) => match self.environment.lookup(&p.name) {
                Some(bound) => bound.clone(),
                None => Expression::Parameter(p),
            },
            Expression::Member(m) => self.bind_member(m),
            Expression::Call(c) => self.bind_call(c),
            Expression::Accumulator(a) => self.bind_accumulator(a),
            // already bound
            Expression::Field(_) | Expression::Document(_) => node,
            _ => node.walk(self),
        }
    }
}
