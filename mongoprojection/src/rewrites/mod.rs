use crate::expr::{visitor::Visitor, DocumentExpression, Expression, FieldExpression, FieldPath};

#[cfg(test)]
mod test;

/// Moves bound references from one path prefix to another. Any bound field or
/// document whose path starts with `old_prefix` has that prefix replaced by
/// `new_prefix`; everything else is rebuilt unchanged.
///
/// The stage builder uses this to re-root element references under a
/// `$map`/`$filter` loop variable, e.g. `xs.Name` becomes `$e.Name` and
/// renders as `$$e.Name`.
pub(crate) struct FieldPathRewriter {
    old_prefix: FieldPath,
    new_prefix: FieldPath,
}

impl FieldPathRewriter {
    pub(crate) fn new(old_prefix: FieldPath, new_prefix: FieldPath) -> Self {
        FieldPathRewriter {
            old_prefix,
            new_prefix,
        }
    }

    pub(crate) fn rewrite(mut self, expr: Expression) -> Expression {
        self.visit_expression(expr)
    }

    fn rewrite_path(&self, path: FieldPath) -> FieldPath {
        path.replace_prefix(&self.old_prefix, &self.new_prefix)
            .unwrap_or(path)
    }
}

impl Visitor for FieldPathRewriter {
    fn visit_expression(&mut self, node: Expression) -> Expression {
        match node {
            Expression::Field(f) => Expression::Field(FieldExpression {
                path: self.rewrite_path(f.path),
                ..f
            }),
            Expression::Document(d) => {
                let d = DocumentExpression {
                    path: d.path.map(|p| self.rewrite_path(p)),
                    ..d
                };
                Expression::Document(d).walk(self)
            }
            _ => node.walk(self),
        }
    }
}
