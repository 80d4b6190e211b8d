mod binder;
mod codegen;
pub mod expr;
#[cfg(test)]
mod fixtures;
pub mod options;
pub mod result;
mod rewrites;
pub mod serialization;
mod synthesizer;

use crate::{
    codegen::ProjectionBuilder,
    expr::{DocumentExpression, Expression, Lambda, Type},
    options::TranslationOptions,
    result::{Error, Result},
    serialization::{Decoder, DecoderRegistry},
    synthesizer::DecoderSynthesizer,
};
use bson::doc;
use tracing::debug;

/// The pipeline stage a translation produces.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StageKind {
    Project,
    Group,
}

impl StageKind {
    pub fn operator(&self) -> &'static str {
        match self {
            StageKind::Project => "$project",
            StageKind::Group => "$group",
        }
    }
}

/// A translated projection or grouping: the stage specification plus the
/// decoder that rebuilds each output document as the result type.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub kind: StageKind,
    pub specification: bson::Document,
    pub decoder: Decoder,
}

impl Translation {
    /// The full stage document, e.g. `{"$project": {...}}`.
    pub fn stage(&self) -> bson::Document {
        doc! { self.kind.operator(): self.specification.clone() }
    }
}

/// Translates projector and group-by lambdas against a decoder registry.
/// Lambdas are expected to be partially evaluated already: any
/// sub-expression that does not depend on the lambda parameter should be a
/// literal.
pub struct Translator<'a> {
    registry: &'a dyn DecoderRegistry,
    options: TranslationOptions,
}

impl<'a> Translator<'a> {
    pub fn new(registry: &'a dyn DecoderRegistry, options: TranslationOptions) -> Self {
        Translator { registry, options }
    }

    /// Translates `projector` into a `$project` specification. The projector
    /// body must construct a named shape; `_id` is suppressed unless the
    /// shape declares it.
    pub fn translate_projection(
        &self,
        projector: Lambda,
        source_decoder: &Decoder,
    ) -> Result<Translation> {
        let result_type = Self::constructed_type(&projector)?;
        debug!(stage = StageKind::Project.operator(), %result_type, "translating");

        let body = binder::bind_projector(self.registry, projector, source_decoder)?;
        let decoder = DecoderSynthesizer::new(self.registry).synthesize(&body)?;
        let mut specification = self.codegen_shape(body)?;
        if !specification.contains_key("_id") {
            // keep _id: 0 as the first element
            let mut suppressed = doc! { "_id": 0 };
            suppressed.extend(specification);
            specification = suppressed;
        }
        Ok(Translation {
            kind: StageKind::Project,
            specification,
            decoder,
        })
    }

    /// Translates a grouping by `key_selector` followed by `group_projector`
    /// into a `$group` specification. The projector's parameter is the
    /// grouping; its `Key` member is the bound key.
    ///
    /// `Key` is replaced by the key expression itself, so a body member such
    /// as `Category = g.Key` is emitted as `"$Category"` rather than as an
    /// accumulator. Sequence operators on the grouping that have no
    /// accumulator form (`Where`, `Any`, `First` with a predicate, ...) fail
    /// with `Error::UnsupportedMethod`.
    pub fn translate_group(
        &self,
        key_selector: Lambda,
        group_projector: Lambda,
        source_decoder: &Decoder,
    ) -> Result<Translation> {
        let result_type = Self::constructed_type(&group_projector)?;
        debug!(stage = StageKind::Group.operator(), %result_type, "translating");

        let synthesizer = DecoderSynthesizer::new(self.registry);
        let key = match binder::bind_projector(self.registry, key_selector, source_decoder)? {
            key @ (Expression::Field(_) | Expression::Document(_)) => key,
            computed => {
                let decoder = synthesizer.synthesize(&computed)?;
                Expression::Document(DocumentExpression {
                    expr: Box::new(computed),
                    path: None,
                    decoder,
                })
            }
        };
        let id = ProjectionBuilder::new(self.options).codegen_expression(key.clone())?;

        let body =
            binder::bind_group_projector(self.registry, group_projector, source_decoder, key)?;
        let decoder = synthesizer.synthesize(&body)?;
        let mut specification = self.codegen_shape(body)?;
        let id = specification.remove("_id").unwrap_or(id);
        let mut group = doc! { "_id": id };
        group.extend(specification);
        Ok(Translation {
            kind: StageKind::Group,
            specification: group,
            decoder,
        })
    }

    /// The type a projector constructs, or an error if its body is anything
    /// but a construction.
    fn constructed_type(projector: &Lambda) -> Result<Type> {
        match projector.body.as_ref() {
            Expression::New(new) => Ok(new.ty.clone()),
            body => Err(Error::unsupported(format!(
                "projector must construct a named shape, found {} of type {}",
                body.kind(),
                body.ty()
            ))),
        }
    }

    fn codegen_shape(&self, body: Expression) -> Result<bson::Document> {
        match body {
            Expression::New(shape) => ProjectionBuilder::new(self.options).codegen_shape(shape),
            body => Err(Error::UnsupportedNode(body.kind(), body.ty())),
        }
    }
}

/// Translates a projection with default options.
pub fn translate_projection(
    projector: Lambda,
    source_decoder: &Decoder,
    registry: &dyn DecoderRegistry,
) -> Result<Translation> {
    Translator::new(registry, TranslationOptions::default())
        .translate_projection(projector, source_decoder)
}

/// Translates a grouping with default options.
pub fn translate_group(
    key_selector: Lambda,
    group_projector: Lambda,
    source_decoder: &Decoder,
    registry: &dyn DecoderRegistry,
) -> Result<Translation> {
    Translator::new(registry, TranslationOptions::default()).translate_group(
        key_selector,
        group_projector,
        source_decoder,
    )
}
