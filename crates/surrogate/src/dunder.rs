//! The catalog of special ("dunder") method names and the operator families they belong to.
//!
//! Every name a proxy can forward or a specialization can override is a [`Dunder`] variant.
//! The strum serialization is the Python spelling, so `Dunder::from_str("__iadd__")` and
//! `Dunder::Iadd.as_str()` round-trip.

use std::cmp::Ordering;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Special method names understood by the object model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
pub enum Dunder {
    // --- textual forms ---
    #[strum(serialize = "__repr__")]
    Repr,
    #[strum(serialize = "__str__")]
    Str,
    #[strum(serialize = "__bytes__")]
    Bytes,
    #[strum(serialize = "__format__")]
    Format,

    // --- comparisons ---
    #[strum(serialize = "__lt__")]
    Lt,
    #[strum(serialize = "__le__")]
    Le,
    #[strum(serialize = "__eq__")]
    Eq,
    #[strum(serialize = "__ne__")]
    Ne,
    #[strum(serialize = "__gt__")]
    Gt,
    #[strum(serialize = "__ge__")]
    Ge,
    /// Legacy three-way comparison.
    #[strum(serialize = "__cmp__")]
    Cmp,

    #[strum(serialize = "__hash__")]
    Hash,
    #[strum(serialize = "__bool__")]
    Bool,
    /// Legacy spelling of `__bool__`.
    #[strum(serialize = "__nonzero__")]
    Nonzero,

    // --- attribute access ---
    #[strum(serialize = "__getattribute__")]
    Getattribute,
    #[strum(serialize = "__getattr__")]
    Getattr,
    #[strum(serialize = "__setattr__")]
    Setattr,
    #[strum(serialize = "__delattr__")]
    Delattr,
    #[strum(serialize = "__dir__")]
    Dir,

    // --- descriptor protocol ---
    #[strum(serialize = "__get__")]
    Get,
    #[strum(serialize = "__set__")]
    Set,
    #[strum(serialize = "__delete__")]
    Delete,

    #[strum(serialize = "__call__")]
    Call,

    // --- containers ---
    #[strum(serialize = "__len__")]
    Len,
    #[strum(serialize = "__length_hint__")]
    LengthHint,
    #[strum(serialize = "__getitem__")]
    Getitem,
    #[strum(serialize = "__setitem__")]
    Setitem,
    #[strum(serialize = "__delitem__")]
    Delitem,
    #[strum(serialize = "__iter__")]
    Iter,
    #[strum(serialize = "__next__")]
    Next,
    #[strum(serialize = "__reversed__")]
    Reversed,
    #[strum(serialize = "__contains__")]
    Contains,

    // --- binary arithmetic ---
    #[strum(serialize = "__add__")]
    Add,
    #[strum(serialize = "__sub__")]
    Sub,
    #[strum(serialize = "__mul__")]
    Mul,
    #[strum(serialize = "__matmul__")]
    Matmul,
    #[strum(serialize = "__truediv__")]
    Truediv,
    #[strum(serialize = "__floordiv__")]
    Floordiv,
    #[strum(serialize = "__mod__")]
    Mod,
    #[strum(serialize = "__divmod__")]
    Divmod,
    #[strum(serialize = "__pow__")]
    Pow,
    #[strum(serialize = "__lshift__")]
    Lshift,
    #[strum(serialize = "__rshift__")]
    Rshift,
    #[strum(serialize = "__and__")]
    And,
    #[strum(serialize = "__xor__")]
    Xor,
    #[strum(serialize = "__or__")]
    Or,

    // --- reflected arithmetic ---
    #[strum(serialize = "__radd__")]
    Radd,
    #[strum(serialize = "__rsub__")]
    Rsub,
    #[strum(serialize = "__rmul__")]
    Rmul,
    #[strum(serialize = "__rmatmul__")]
    Rmatmul,
    #[strum(serialize = "__rtruediv__")]
    Rtruediv,
    #[strum(serialize = "__rfloordiv__")]
    Rfloordiv,
    #[strum(serialize = "__rmod__")]
    Rmod,
    #[strum(serialize = "__rdivmod__")]
    Rdivmod,
    #[strum(serialize = "__rpow__")]
    Rpow,
    #[strum(serialize = "__rlshift__")]
    Rlshift,
    #[strum(serialize = "__rrshift__")]
    Rrshift,
    #[strum(serialize = "__rand__")]
    Rand,
    #[strum(serialize = "__rxor__")]
    Rxor,
    #[strum(serialize = "__ror__")]
    Ror,

    // --- in-place arithmetic ---
    #[strum(serialize = "__iadd__")]
    Iadd,
    #[strum(serialize = "__isub__")]
    Isub,
    #[strum(serialize = "__imul__")]
    Imul,
    #[strum(serialize = "__imatmul__")]
    Imatmul,
    #[strum(serialize = "__itruediv__")]
    Itruediv,
    #[strum(serialize = "__ifloordiv__")]
    Ifloordiv,
    #[strum(serialize = "__imod__")]
    Imod,
    #[strum(serialize = "__ipow__")]
    Ipow,
    #[strum(serialize = "__ilshift__")]
    Ilshift,
    #[strum(serialize = "__irshift__")]
    Irshift,
    #[strum(serialize = "__iand__")]
    Iand,
    #[strum(serialize = "__ixor__")]
    Ixor,
    #[strum(serialize = "__ior__")]
    Ior,

    // --- unary ---
    #[strum(serialize = "__neg__")]
    Neg,
    #[strum(serialize = "__pos__")]
    Pos,
    #[strum(serialize = "__abs__")]
    Abs,
    #[strum(serialize = "__invert__")]
    Invert,

    // --- numeric conversions ---
    #[strum(serialize = "__complex__")]
    Complex,
    #[strum(serialize = "__int__")]
    Int,
    #[strum(serialize = "__float__")]
    Float,
    #[strum(serialize = "__index__")]
    Index,
    #[strum(serialize = "__round__")]
    Round,
    #[strum(serialize = "__trunc__")]
    Trunc,
    #[strum(serialize = "__floor__")]
    Floor,
    #[strum(serialize = "__ceil__")]
    Ceil,
    #[strum(serialize = "__oct__")]
    Oct,
    #[strum(serialize = "__hex__")]
    Hex,
    /// Legacy mixed-type coercion.
    #[strum(serialize = "__coerce__")]
    Coerce,

    // --- context managers ---
    #[strum(serialize = "__enter__")]
    Enter,
    #[strum(serialize = "__exit__")]
    Exit,
}

impl Dunder {
    /// The Python spelling, e.g. `"__iadd__"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// The operator for a forward binary dunder (`__add__` -> `Add`).
    #[must_use]
    pub fn binary(self) -> Option<BinaryOp> {
        BinaryOp::ALL.into_iter().find(|op| op.dunder() == self)
    }

    /// The operator for a reflected binary dunder (`__radd__` -> `Add`).
    #[must_use]
    pub fn reflected(self) -> Option<BinaryOp> {
        BinaryOp::ALL.into_iter().find(|op| op.reflected_dunder() == self)
    }

    /// The operator for an in-place dunder (`__iadd__` -> `Add`).
    #[must_use]
    pub fn inplace(self) -> Option<BinaryOp> {
        BinaryOp::ALL.into_iter().find(|op| op.inplace_dunder() == Some(self))
    }

    #[must_use]
    pub fn is_inplace(self) -> bool {
        self.inplace().is_some()
    }

    #[must_use]
    pub fn compare(self) -> Option<CompareOp> {
        match self {
            Self::Lt => Some(CompareOp::Lt),
            Self::Le => Some(CompareOp::Le),
            Self::Eq => Some(CompareOp::Eq),
            Self::Ne => Some(CompareOp::Ne),
            Self::Gt => Some(CompareOp::Gt),
            Self::Ge => Some(CompareOp::Ge),
            _ => None,
        }
    }

    #[must_use]
    pub fn unary(self) -> Option<UnaryOp> {
        match self {
            Self::Neg => Some(UnaryOp::Neg),
            Self::Pos => Some(UnaryOp::Pos),
            Self::Abs => Some(UnaryOp::Abs),
            Self::Invert => Some(UnaryOp::Invert),
            _ => None,
        }
    }

    #[must_use]
    pub fn conversion(self) -> Option<Conversion> {
        match self {
            Self::Int => Some(Conversion::Int),
            Self::Float => Some(Conversion::Float),
            Self::Complex => Some(Conversion::Complex),
            Self::Index => Some(Conversion::Index),
            Self::Trunc => Some(Conversion::Trunc),
            Self::Floor => Some(Conversion::Floor),
            Self::Ceil => Some(Conversion::Ceil),
            Self::Oct => Some(Conversion::Oct),
            Self::Hex => Some(Conversion::Hex),
            _ => None,
        }
    }
}

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    MatMul,
    TrueDiv,
    FloorDiv,
    Mod,
    DivMod,
    Pow,
    LShift,
    RShift,
    And,
    Xor,
    Or,
}

impl BinaryOp {
    pub const ALL: [Self; 14] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::MatMul,
        Self::TrueDiv,
        Self::FloorDiv,
        Self::Mod,
        Self::DivMod,
        Self::Pow,
        Self::LShift,
        Self::RShift,
        Self::And,
        Self::Xor,
        Self::Or,
    ];

    /// Operator spelling used in error messages.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::MatMul => "@",
            Self::TrueDiv => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::DivMod => "divmod()",
            Self::Pow => "** or pow()",
            Self::LShift => "<<",
            Self::RShift => ">>",
            Self::And => "&",
            Self::Xor => "^",
            Self::Or => "|",
        }
    }

    /// Augmented-assignment spelling used in error messages.
    #[must_use]
    pub fn inplace_symbol(self) -> &'static str {
        match self {
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Mul => "*=",
            Self::MatMul => "@=",
            Self::TrueDiv => "/=",
            Self::FloorDiv => "//=",
            Self::Mod => "%=",
            Self::DivMod => "divmod()",
            Self::Pow => "**=",
            Self::LShift => "<<=",
            Self::RShift => ">>=",
            Self::And => "&=",
            Self::Xor => "^=",
            Self::Or => "|=",
        }
    }

    #[must_use]
    pub fn dunder(self) -> Dunder {
        match self {
            Self::Add => Dunder::Add,
            Self::Sub => Dunder::Sub,
            Self::Mul => Dunder::Mul,
            Self::MatMul => Dunder::Matmul,
            Self::TrueDiv => Dunder::Truediv,
            Self::FloorDiv => Dunder::Floordiv,
            Self::Mod => Dunder::Mod,
            Self::DivMod => Dunder::Divmod,
            Self::Pow => Dunder::Pow,
            Self::LShift => Dunder::Lshift,
            Self::RShift => Dunder::Rshift,
            Self::And => Dunder::And,
            Self::Xor => Dunder::Xor,
            Self::Or => Dunder::Or,
        }
    }

    #[must_use]
    pub fn reflected_dunder(self) -> Dunder {
        match self {
            Self::Add => Dunder::Radd,
            Self::Sub => Dunder::Rsub,
            Self::Mul => Dunder::Rmul,
            Self::MatMul => Dunder::Rmatmul,
            Self::TrueDiv => Dunder::Rtruediv,
            Self::FloorDiv => Dunder::Rfloordiv,
            Self::Mod => Dunder::Rmod,
            Self::DivMod => Dunder::Rdivmod,
            Self::Pow => Dunder::Rpow,
            Self::LShift => Dunder::Rlshift,
            Self::RShift => Dunder::Rrshift,
            Self::And => Dunder::Rand,
            Self::Xor => Dunder::Rxor,
            Self::Or => Dunder::Ror,
        }
    }

    /// The in-place dunder, `None` for `divmod` which has no augmented form.
    #[must_use]
    pub fn inplace_dunder(self) -> Option<Dunder> {
        match self {
            Self::Add => Some(Dunder::Iadd),
            Self::Sub => Some(Dunder::Isub),
            Self::Mul => Some(Dunder::Imul),
            Self::MatMul => Some(Dunder::Imatmul),
            Self::TrueDiv => Some(Dunder::Itruediv),
            Self::FloorDiv => Some(Dunder::Ifloordiv),
            Self::Mod => Some(Dunder::Imod),
            Self::DivMod => None,
            Self::Pow => Some(Dunder::Ipow),
            Self::LShift => Some(Dunder::Ilshift),
            Self::RShift => Some(Dunder::Irshift),
            Self::And => Some(Dunder::Iand),
            Self::Xor => Some(Dunder::Ixor),
            Self::Or => Some(Dunder::Ior),
        }
    }
}

/// Rich comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
}

impl CompareOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// The operator to try on the right operand when the left one declines.
    #[must_use]
    pub fn swapped(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
        }
    }

    #[must_use]
    pub fn dunder(self) -> Dunder {
        match self {
            Self::Lt => Dunder::Lt,
            Self::Le => Dunder::Le,
            Self::Eq => Dunder::Eq,
            Self::Ne => Dunder::Ne,
            Self::Gt => Dunder::Gt,
            Self::Ge => Dunder::Ge,
        }
    }

    /// Evaluates this operator against an already computed ordering.
    #[must_use]
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            Self::Lt => ordering.is_lt(),
            Self::Le => ordering.is_le(),
            Self::Eq => ordering.is_eq(),
            Self::Ne => ordering.is_ne(),
            Self::Gt => ordering.is_gt(),
            Self::Ge => ordering.is_ge(),
        }
    }
}

/// Unary operators, `abs()` included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UnaryOp {
    Neg,
    Pos,
    Abs,
    Invert,
}

impl UnaryOp {
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "unary -",
            Self::Pos => "unary +",
            Self::Abs => "abs()",
            Self::Invert => "unary ~",
        }
    }

    #[must_use]
    pub fn dunder(self) -> Dunder {
        match self {
            Self::Neg => Dunder::Neg,
            Self::Pos => Dunder::Pos,
            Self::Abs => Dunder::Abs,
            Self::Invert => Dunder::Invert,
        }
    }
}

/// Numeric conversions reached through the conversion builtins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Conversion {
    Int,
    Float,
    Complex,
    Index,
    Trunc,
    Floor,
    Ceil,
    Oct,
    Hex,
}

impl Conversion {
    #[must_use]
    pub fn dunder(self) -> Dunder {
        match self {
            Self::Int => Dunder::Int,
            Self::Float => Dunder::Float,
            Self::Complex => Dunder::Complex,
            Self::Index => Dunder::Index,
            Self::Trunc => Dunder::Trunc,
            Self::Floor => Dunder::Floor,
            Self::Ceil => Dunder::Ceil,
            Self::Oct => Dunder::Oct,
            Self::Hex => Dunder::Hex,
        }
    }

    /// Name of the builtin that performs the conversion, used in error messages.
    #[must_use]
    pub fn builtin_name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Complex => "complex",
            Self::Index => "index",
            Self::Trunc => "math.trunc",
            Self::Floor => "math.floor",
            Self::Ceil => "math.ceil",
            Self::Oct => "oct",
            Self::Hex => "hex",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn names_round_trip() {
        for dunder in Dunder::iter() {
            let name = dunder.as_str();
            assert!(name.starts_with("__") && name.ends_with("__"), "{name}");
            assert_eq!(Dunder::from_str(name), Ok(dunder));
        }
    }

    #[test]
    fn operator_families() {
        assert_eq!(Dunder::Iadd.inplace(), Some(BinaryOp::Add));
        assert_eq!(Dunder::Rpow.reflected(), Some(BinaryOp::Pow));
        assert_eq!(Dunder::Floordiv.binary(), Some(BinaryOp::FloorDiv));
        assert!(!Dunder::Add.is_inplace());
        assert_eq!(BinaryOp::DivMod.inplace_dunder(), None);
        assert_eq!(CompareOp::Le.swapped(), CompareOp::Ge);
    }
}
