use crate::{
    codegen::ProjectionBuilder,
    expr::{MemberAccess, Type},
    result::{Error, Result},
};
use bson::{bson, Bson};
use lazy_static::lazy_static;
use std::collections::BTreeMap;

lazy_static! {
    static ref DATE_PART_OPERATORS: BTreeMap<&'static str, &'static str> = [
        ("Day", "$dayOfMonth"),
        ("DayOfYear", "$dayOfYear"),
        ("Hour", "$hour"),
        ("Millisecond", "$millisecond"),
        ("Minute", "$minute"),
        ("Month", "$month"),
        ("Second", "$second"),
        ("Year", "$year"),
    ]
    .into_iter()
    .collect();
}

impl ProjectionBuilder {
    /// Lowers member accesses the binder left unresolved. Only a fixed set of
    /// computed members has an aggregation equivalent.
    pub(crate) fn codegen_member_access(&self, m: MemberAccess) -> Result<Bson> {
        let operand_type = m.expr.ty();
        if operand_type.is_date() {
            if m.member == "DayOfWeek" {
                // $dayOfWeek counts from 1 (Sunday), the member from 0
                let operand = self.codegen_expression(*m.expr)?;
                return Ok(bson!({ "$subtract": [{ "$dayOfWeek": operand }, 1] }));
            }
            if let Some(&operator) = DATE_PART_OPERATORS.get(m.member.as_str()) {
                let operand = self.codegen_expression(*m.expr)?;
                return Ok(bson!({ operator: operand }));
            }
        }
        let operator = match m.member.as_str() {
            "Count" | "Length" if operand_type.is_collection() => "$size",
            "Length" if operand_type.is_string() => self.str_len_operator(),
            "Value" if matches!(operand_type, Type::Nullable(_)) => {
                return self.codegen_expression(*m.expr)
            }
            _ => return Err(Error::UnsupportedMember(m.member, m.declaring_type)),
        };
        let operand = self.codegen_expression(*m.expr)?;
        Ok(bson!({ operator: operand }))
    }
}
