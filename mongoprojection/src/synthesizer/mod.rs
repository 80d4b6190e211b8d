use crate::{
    expr::{AccumulatorFunction, BinaryOperator, Expression, New, Type, ENUMERABLE},
    result::{Error, Result},
    serialization::{Decoder, DecoderRegistry, DocumentDecoder},
};
use tracing::trace;

#[cfg(test)]
mod test;

/// Produces the decoder for any expression. Bound nodes already know their
/// decoder; constructions get a structural decoder built on the spot; every
/// other shape is looked up in the registry by its static type.
///
/// Synthesized decoders are never cached: two constructions of the same type
/// can decode their members differently.
pub(crate) struct DecoderSynthesizer<'a> {
    registry: &'a dyn DecoderRegistry,
}

impl<'a> DecoderSynthesizer<'a> {
    pub(crate) fn new(registry: &'a dyn DecoderRegistry) -> Self {
        DecoderSynthesizer { registry }
    }

    pub(crate) fn synthesize(&self, expr: &Expression) -> Result<Decoder> {
        match expr {
            Expression::Field(f) => Ok(f.decoder.clone()),
            Expression::Document(d) => Ok(d.decoder.clone()),
            Expression::New(new) => self.synthesize_new(new),
            Expression::Accumulator(acc) => {
                let element = match &acc.selector {
                    Some(selector) => self.synthesize(&selector.body)?,
                    None => self.item_decoder(&acc.source)?,
                };
                Ok(match acc.function {
                    AccumulatorFunction::Push | AccumulatorFunction::AddToSet => {
                        Decoder::array(element)
                    }
                    AccumulatorFunction::Avg => self.lookup(&Type::Double)?,
                    AccumulatorFunction::First
                    | AccumulatorFunction::Last
                    | AccumulatorFunction::Min
                    | AccumulatorFunction::Max
                    | AccumulatorFunction::Sum => element,
                })
            }
            Expression::Call(call)
                if call.method == "Select" && call.declaring_type.is_static_class(ENUMERABLE) =>
            {
                match call.arguments.get(1) {
                    Some(Expression::Lambda(selector)) if Self::constructs(&selector.body) => {
                        Ok(Decoder::array(self.synthesize(&selector.body)?))
                    }
                    _ => self.lookup(&call.ty),
                }
            }
            Expression::Conditional(c) if Self::constructs(&c.if_true) => {
                self.synthesize(&c.if_true)
            }
            Expression::Binary(b)
                if b.op == BinaryOperator::Coalesce && Self::constructs(&b.left) =>
            {
                self.synthesize(&b.left)
            }
            _ => self.lookup(&expr.ty()),
        }
    }

    /// The decoder for one item of a collection-valued expression.
    pub(crate) fn item_decoder(&self, expr: &Expression) -> Result<Decoder> {
        let decoder = self.synthesize(expr)?;
        decoder
            .item_decoder()
            .cloned()
            .ok_or_else(|| Error::NoDecoderForType(expr.ty()))
    }

    fn constructs(expr: &Expression) -> bool {
        matches!(expr, Expression::New(_))
    }

    fn lookup(&self, ty: &Type) -> Result<Decoder> {
        self.registry
            .lookup(ty)
            .ok_or_else(|| Error::NoDecoderForType(ty.clone()))
    }

    fn synthesize_new(&self, new: &New) -> Result<Decoder> {
        let members = new
            .members
            .as_ref()
            .ok_or_else(|| Error::ConstructionWithoutMembers(new.ty.clone()))?;
        let type_name = match &new.ty {
            Type::Class(name) => name.clone(),
            ty => ty.to_string(),
        };
        if new.parameters.len() != new.arguments.len() {
            return Err(Error::unsupported(format!(
                "construction of {} has {} parameters but {} arguments",
                new.ty,
                new.parameters.len(),
                new.arguments.len()
            )));
        }
        let mut builder = DocumentDecoder::builder(type_name);
        for (parameter, argument) in new.parameters.iter().zip(&new.arguments) {
            if !members.contains(parameter) {
                return Err(Error::unsupported(format!(
                    "constructor parameter '{parameter}' of {} has no matching member",
                    new.ty
                )));
            }
            let decoder = match argument {
                Expression::Field(f) => f.decoder.clone(),
                _ => self.synthesize(argument)?,
            };
            builder = builder
                .member(parameter.clone(), parameter.clone(), decoder)
                .creator_parameter(parameter.clone());
        }
        let decoder = builder.build();
        trace!(
            type_name = decoder.type_name(),
            members = decoder.creator().len(),
            "synthesized document decoder"
        );
        Ok(Decoder::Document(decoder))
    }
}
