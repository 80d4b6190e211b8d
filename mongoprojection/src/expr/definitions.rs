use crate::serialization::Decoder;
use itertools::Itertools;
use std::fmt;

/// Declaring type name of the static sequence operators (`Select`, `Where`, ...).
pub const ENUMERABLE: &str = "Enumerable";
/// Declaring type name of the static math functions.
pub const MATH: &str = "Math";

#[derive(PartialEq, Eq, Debug, Clone, Hash, PartialOrd, Ord)]
pub enum Type {
    Boolean,
    Int32,
    Int64,
    Double,
    Decimal128,
    String,
    DateTime,
    ObjectId,
    Binary,
    Document,
    Nullable(Box<Type>),
    Array(Box<Type>),
    Set(Box<Type>),
    Grouping(Box<Type>, Box<Type>),
    Class(String),
    Enum(String),
}

impl Type {
    pub fn class(name: impl Into<String>) -> Self {
        Type::Class(name.into())
    }

    pub fn array(item: Type) -> Self {
        Type::Array(Box::new(item))
    }

    pub fn set(item: Type) -> Self {
        Type::Set(Box::new(item))
    }

    pub fn nullable(inner: Type) -> Self {
        Type::Nullable(Box::new(inner))
    }

    pub fn grouping(key: Type, element: Type) -> Self {
        Type::Grouping(Box::new(key), Box::new(element))
    }

    /// Strips any number of Nullable wrappers.
    pub fn underlying(&self) -> &Type {
        match self {
            Type::Nullable(inner) => inner.underlying(),
            _ => self,
        }
    }

    pub fn is_string(&self) -> bool {
        *self.underlying() == Type::String
    }

    pub fn is_date(&self) -> bool {
        *self.underlying() == Type::DateTime
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self.underlying(),
            Type::Array(_) | Type::Set(_) | Type::Grouping(_, _)
        )
    }

    /// Element type of a collection type.
    pub fn item_type(&self) -> Option<&Type> {
        match self.underlying() {
            Type::Array(item) | Type::Set(item) => Some(item),
            Type::Grouping(_, element) => Some(element),
            _ => None,
        }
    }

    pub fn is_static_class(&self, name: &str) -> bool {
        matches!(self, Type::Class(n) if n == name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Boolean => write!(f, "Boolean"),
            Type::Int32 => write!(f, "Int32"),
            Type::Int64 => write!(f, "Int64"),
            Type::Double => write!(f, "Double"),
            Type::Decimal128 => write!(f, "Decimal128"),
            Type::String => write!(f, "String"),
            Type::DateTime => write!(f, "DateTime"),
            Type::ObjectId => write!(f, "ObjectId"),
            Type::Binary => write!(f, "Binary"),
            Type::Document => write!(f, "Document"),
            Type::Nullable(inner) => write!(f, "Nullable<{inner}>"),
            Type::Array(item) => write!(f, "Array<{item}>"),
            Type::Set(item) => write!(f, "Set<{item}>"),
            Type::Grouping(key, element) => write!(f, "Grouping<{key}, {element}>"),
            Type::Class(name) | Type::Enum(name) => write!(f, "{name}"),
        }
    }
}

/// An element path made of whole field-name segments. Prefix checks and
/// prefix replacement work segment by segment, so `foo` is never a prefix of
/// `foobar`.
#[derive(PartialEq, Eq, Debug, Clone, Hash, Default, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldPath {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// The path rooted at the variable bound by `$map`/`$filter`, which
    /// renders as `$$name`.
    pub fn loop_variable(name: &str) -> Self {
        FieldPath::new([format!("${name}")])
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        FieldPath { segments }
    }

    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Returns a copy of this path with `old` replaced by `new`, or None if
    /// `old` is not a prefix of this path.
    pub fn replace_prefix(&self, old: &FieldPath, new: &FieldPath) -> Option<FieldPath> {
        if !self.starts_with(old) {
            return None;
        }
        Some(FieldPath {
            segments: new
                .segments
                .iter()
                .chain(&self.segments[old.segments.len()..])
                .cloned()
                .collect(),
        })
    }

    /// The aggregation field reference for this path, e.g. `$a.b`.
    pub fn to_field_ref(&self) -> String {
        format!("${self}")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.iter().join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath::new(path.split('.').filter(|s| !s.is_empty()))
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum StringComparison {
    CurrentCulture,
    CurrentCultureIgnoreCase,
    InvariantCulture,
    InvariantCultureIgnoreCase,
    Ordinal,
    OrdinalIgnoreCase,
}

#[derive(PartialEq, Debug, Clone)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Decimal128(bson::Decimal128),
    String(String),
    DateTime(bson::DateTime),
    ObjectId(bson::oid::ObjectId),
    Binary(Vec<u8>),
    StringComparison(StringComparison),
}

impl LiteralValue {
    pub fn ty(&self) -> Type {
        match self {
            LiteralValue::Null => Type::nullable(Type::Document),
            LiteralValue::Boolean(_) => Type::Boolean,
            LiteralValue::Int32(_) => Type::Int32,
            LiteralValue::Int64(_) => Type::Int64,
            LiteralValue::Double(_) => Type::Double,
            LiteralValue::Decimal128(_) => Type::Decimal128,
            LiteralValue::String(_) => Type::String,
            LiteralValue::DateTime(_) => Type::DateTime,
            LiteralValue::ObjectId(_) => Type::ObjectId,
            LiteralValue::Binary(_) => Type::Binary,
            LiteralValue::StringComparison(_) => Type::Enum("StringComparison".to_string()),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Expression {
    Literal(Literal),
    Parameter(Parameter),
    Member(MemberAccess),
    Binary(BinaryOperation),
    Unary(UnaryOperation),
    Conditional(Conditional),
    Call(MethodCall),
    Lambda(Lambda),
    New(New),
    Accumulator(Accumulator),
    Field(FieldExpression),
    Document(DocumentExpression),
}

#[derive(PartialEq, Debug, Clone)]
pub struct Literal {
    pub value: LiteralValue,
    pub ty: Type,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
}

#[derive(PartialEq, Debug, Clone)]
pub struct MemberAccess {
    pub expr: Box<Expression>,
    pub member: String,
    pub declaring_type: Type,
    pub ty: Type,
}

#[derive(PartialEq, Debug, Clone)]
pub struct BinaryOperation {
    pub op: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub ty: Type,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum BinaryOperator {
    // Arithmetic operators
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // Boolean operators
    And,
    Or,

    // Comparison operators
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,

    Coalesce,
    ArrayIndex,
}

#[derive(PartialEq, Debug, Clone)]
pub struct UnaryOperation {
    pub op: UnaryOperator,
    pub operand: Box<Expression>,
    pub ty: Type,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum UnaryOperator {
    Not,
    Convert,
    ArrayLength,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Conditional {
    pub test: Box<Expression>,
    pub if_true: Box<Expression>,
    pub if_false: Box<Expression>,
    pub ty: Type,
}

/// A method call. Static methods (the sequence operators on `Enumerable`,
/// `Math`, static `String.Equals`) have no receiver and take their source as
/// the first argument.
#[derive(PartialEq, Debug, Clone)]
pub struct MethodCall {
    pub receiver: Option<Box<Expression>>,
    pub method: String,
    pub declaring_type: Type,
    pub arguments: Vec<Expression>,
    pub ty: Type,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Lambda {
    pub parameters: Vec<Parameter>,
    pub body: Box<Expression>,
}

/// Construction of a composite value. `parameters` are the constructor
/// parameter names and line up with `arguments`; `members` are the declared
/// output members, present only for named-field constructions.
#[derive(PartialEq, Debug, Clone)]
pub struct New {
    pub ty: Type,
    pub parameters: Vec<String>,
    pub arguments: Vec<Expression>,
    pub members: Option<Vec<String>>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Accumulator {
    pub function: AccumulatorFunction,
    pub source: Box<Expression>,
    pub selector: Option<Lambda>,
    pub ty: Type,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum AccumulatorFunction {
    First,
    Last,
    Min,
    Max,
    Avg,
    Sum,
    Push,
    AddToSet,
}

/// A bound reference to the value at `path`.
#[derive(PartialEq, Debug, Clone)]
pub struct FieldExpression {
    pub path: FieldPath,
    pub decoder: Decoder,
    pub ty: Type,
}

/// A bound document: `expr` annotated with the path it lives at (None for
/// the current document or a computed value) and its decoder.
#[derive(PartialEq, Debug, Clone)]
pub struct DocumentExpression {
    pub expr: Box<Expression>,
    pub path: Option<FieldPath>,
    pub decoder: Decoder,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum NodeKind {
    Literal,
    Parameter,
    MemberAccess,
    Binary(BinaryOperator),
    Unary(UnaryOperator),
    Conditional,
    Call,
    Lambda,
    New,
    Accumulator,
    Field,
    Document,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Binary(op) => write!(f, "Binary({op:?})"),
            NodeKind::Unary(op) => write!(f, "Unary({op:?})"),
            _ => write!(f, "{self:?}"),
        }
    }
}

impl Expression {
    /// The static type of the value this expression produces.
    pub fn ty(&self) -> Type {
        match self {
            Expression::Literal(l) => l.ty.clone(),
            Expression::Parameter(p) => p.ty.clone(),
            Expression::Member(m) => m.ty.clone(),
            Expression::Binary(b) => b.ty.clone(),
            Expression::Unary(u) => u.ty.clone(),
            Expression::Conditional(c) => c.ty.clone(),
            Expression::Call(c) => c.ty.clone(),
            Expression::Lambda(l) => l.body.ty(),
            Expression::New(n) => n.ty.clone(),
            Expression::Accumulator(a) => a.ty.clone(),
            Expression::Field(f) => f.ty.clone(),
            Expression::Document(d) => d.expr.ty(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Expression::Literal(_) => NodeKind::Literal,
            Expression::Parameter(_) => NodeKind::Parameter,
            Expression::Member(_) => NodeKind::MemberAccess,
            Expression::Binary(b) => NodeKind::Binary(b.op),
            Expression::Unary(u) => NodeKind::Unary(u.op),
            Expression::Conditional(_) => NodeKind::Conditional,
            Expression::Call(_) => NodeKind::Call,
            Expression::Lambda(_) => NodeKind::Lambda,
            Expression::New(_) => NodeKind::New,
            Expression::Accumulator(_) => NodeKind::Accumulator,
            Expression::Field(_) => NodeKind::Field,
            Expression::Document(_) => NodeKind::Document,
        }
    }

    /// The element path of a bound node, if it has one.
    pub fn bound_path(&self) -> Option<&FieldPath> {
        match self {
            Expression::Field(f) => Some(&f.path),
            Expression::Document(d) => d.path.as_ref(),
            _ => None,
        }
    }

    pub fn literal(value: LiteralValue) -> Self {
        let ty = value.ty();
        Expression::Literal(Literal { value, ty })
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expression::literal(LiteralValue::String(s.into()))
    }

    pub fn parameter(name: impl Into<String>, ty: Type) -> Self {
        Expression::Parameter(Parameter {
            name: name.into(),
            ty,
        })
    }

    /// Member access on this expression; the declaring type is this
    /// expression's static type.
    pub fn member(self, member: impl Into<String>, ty: Type) -> Self {
        Expression::Member(MemberAccess {
            declaring_type: self.ty(),
            expr: Box::new(self),
            member: member.into(),
            ty,
        })
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression, ty: Type) -> Self {
        Expression::Binary(BinaryOperation {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        })
    }

    pub fn unary(op: UnaryOperator, operand: Expression, ty: Type) -> Self {
        Expression::Unary(UnaryOperation {
            op,
            operand: Box::new(operand),
            ty,
        })
    }

    pub fn conditional(test: Expression, if_true: Expression, if_false: Expression) -> Self {
        Expression::Conditional(Conditional {
            ty: if_true.ty(),
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        })
    }

    /// A static call on `Enumerable` with `source` as the first argument.
    pub fn sequence_call(
        method: impl Into<String>,
        source: Expression,
        mut arguments: Vec<Expression>,
        ty: Type,
    ) -> Self {
        arguments.insert(0, source);
        Expression::Call(MethodCall {
            receiver: None,
            method: method.into(),
            declaring_type: Type::class(ENUMERABLE),
            arguments,
            ty,
        })
    }

    /// An instance call whose declaring type is the receiver's static type.
    pub fn instance_call(
        self,
        method: impl Into<String>,
        arguments: Vec<Expression>,
        ty: Type,
    ) -> Self {
        Expression::Call(MethodCall {
            declaring_type: self.ty().underlying().clone(),
            receiver: Some(Box::new(self)),
            method: method.into(),
            arguments,
            ty,
        })
    }
}

impl Lambda {
    pub fn new(parameters: Vec<Parameter>, body: Expression) -> Self {
        Lambda {
            parameters,
            body: Box::new(body),
        }
    }

    /// A single-parameter lambda.
    pub fn unary(name: impl Into<String>, ty: Type, body: Expression) -> Self {
        Lambda::new(
            vec![Parameter {
                name: name.into(),
                ty,
            }],
            body,
        )
    }
}

impl From<Lambda> for Expression {
    fn from(lambda: Lambda) -> Self {
        Expression::Lambda(lambda)
    }
}

impl New {
    /// A named-field construction whose constructor parameters and declared
    /// members are both the given field names.
    pub fn named<I, S>(ty: Type, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Expression)>,
        S: Into<String>,
    {
        let (parameters, arguments): (Vec<String>, Vec<Expression>) = fields
            .into_iter()
            .map(|(name, expr)| (name.into(), expr))
            .unzip();
        New {
            ty,
            members: Some(parameters.clone()),
            parameters,
            arguments,
        }
    }
}

impl From<New> for Expression {
    fn from(new: New) -> Self {
        Expression::New(new)
    }
}
