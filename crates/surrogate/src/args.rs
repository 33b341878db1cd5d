use indexmap::IndexMap;

use crate::{
    exception::{ExcType, RunResult},
    value::Value,
};

/// Keyword arguments, in call order.
pub type Kwargs = IndexMap<String, Value>;

/// Type for call arguments.
///
/// Uses specific variants for common cases (0-2 arguments).
/// Most slot and method calls have at most 2 arguments, so this
/// avoids the Vec allocation for the vast majority of calls.
#[derive(Debug, Clone, Default)]
pub enum ArgValues {
    #[default]
    Empty,
    One(Value),
    Two(Value, Value),
    ArgsKargs { args: Vec<Value>, kwargs: Kwargs },
}

impl ArgValues {
    /// Builds arguments from positional values, picking the smallest variant.
    #[must_use]
    pub fn from_vec(args: Vec<Value>) -> Self {
        let mut iter = args.into_iter();
        match (iter.next(), iter.next(), iter.next()) {
            (None, _, _) => Self::Empty,
            (Some(a), None, _) => Self::One(a),
            (Some(a), Some(b), None) => Self::Two(a, b),
            (Some(a), Some(b), Some(c)) => {
                let mut args = vec![a, b, c];
                args.extend(iter);
                Self::ArgsKargs {
                    args,
                    kwargs: Kwargs::new(),
                }
            }
        }
    }

    /// Builds arguments with keyword values.
    #[must_use]
    pub fn with_kwargs(args: Vec<Value>, kwargs: Kwargs) -> Self {
        if kwargs.is_empty() {
            Self::from_vec(args)
        } else {
            Self::ArgsKargs { args, kwargs }
        }
    }

    /// Number of positional arguments.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::One(_) => 1,
            Self::Two(..) => 2,
            Self::ArgsKargs { args, .. } => args.len(),
        }
    }

    #[must_use]
    pub fn has_kwargs(&self) -> bool {
        matches!(self, Self::ArgsKargs { kwargs, .. } if !kwargs.is_empty())
    }

    /// Splits into positional and keyword parts.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Value>, Kwargs) {
        match self {
            Self::Empty => (Vec::new(), Kwargs::new()),
            Self::One(a) => (vec![a], Kwargs::new()),
            Self::Two(a, b) => (vec![a, b], Kwargs::new()),
            Self::ArgsKargs { args, kwargs } => (args, kwargs),
        }
    }

    /// Puts `first` in front of the positional arguments, as a bound method does with its receiver.
    #[must_use]
    pub fn prepend(self, first: Value) -> Self {
        match self {
            Self::Empty => Self::One(first),
            Self::One(a) => Self::Two(first, a),
            other => {
                let (mut args, kwargs) = other.into_parts();
                args.insert(0, first);
                Self::ArgsKargs { args, kwargs }
            }
        }
    }

    /// Removes and returns the first positional argument.
    pub fn split_first(self, name: &str) -> RunResult<(Value, Self)> {
        let (args, kwargs) = self.into_parts();
        let mut iter = args.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| ExcType::type_error(format!("{name}() needs an argument")))?;
        Ok((first, Self::with_kwargs(iter.collect(), kwargs)))
    }

    fn reject_kwargs(&self, name: &str) -> RunResult<()> {
        if self.has_kwargs() {
            Err(ExcType::type_error_no_kwargs(name))
        } else {
            Ok(())
        }
    }

    /// Checks that zero arguments were passed.
    pub fn check_zero_args(self, name: &str) -> RunResult<()> {
        self.reject_kwargs(name)?;
        match self {
            Self::Empty => Ok(()),
            other => Err(ExcType::type_error_no_args(name, other.count())),
        }
    }

    /// Checks that exactly one positional argument was passed, returning it.
    pub fn get_one_arg(self, name: &str) -> RunResult<Value> {
        self.reject_kwargs(name)?;
        match self {
            Self::One(a) => Ok(a),
            other => Err(ExcType::type_error_arg_count(name, 1, other.count())),
        }
    }

    /// Checks that exactly two positional arguments were passed, returning them as a tuple.
    pub fn get_two_args(self, name: &str) -> RunResult<(Value, Value)> {
        self.reject_kwargs(name)?;
        match self {
            Self::Two(a, b) => Ok((a, b)),
            other => Err(ExcType::type_error_arg_count(name, 2, other.count())),
        }
    }

    /// Checks that exactly three positional arguments were passed, returning them as a tuple.
    pub fn get_three_args(self, name: &str) -> RunResult<(Value, Value, Value)> {
        self.reject_kwargs(name)?;
        let count = self.count();
        let (args, _) = self.into_parts();
        match <[Value; 3]>::try_from(args) {
            Ok([a, b, c]) => Ok((a, b, c)),
            Err(_) => Err(ExcType::type_error_arg_count(name, 3, count)),
        }
    }

    /// Accepts zero or one positional argument.
    pub fn get_zero_one_arg(self, name: &str) -> RunResult<Option<Value>> {
        self.reject_kwargs(name)?;
        match self {
            Self::Empty => Ok(None),
            Self::One(a) => Ok(Some(a)),
            other => Err(ExcType::type_error_at_most(name, 1, other.count())),
        }
    }

    /// Accepts one or two positional arguments.
    pub fn get_one_two_args(self, name: &str) -> RunResult<(Value, Option<Value>)> {
        self.reject_kwargs(name)?;
        match self {
            Self::One(a) => Ok((a, None)),
            Self::Two(a, b) => Ok((a, Some(b))),
            Self::Empty => Err(ExcType::type_error(format!(
                "{name} expected at least 1 argument, got 0"
            ))),
            other => Err(ExcType::type_error_at_most(name, 2, other.count())),
        }
    }
}

impl From<Vec<Value>> for ArgValues {
    fn from(args: Vec<Value>) -> Self {
        Self::from_vec(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_picks_smallest_variant() {
        assert!(matches!(ArgValues::from_vec(vec![]), ArgValues::Empty));
        assert!(matches!(ArgValues::from_vec(vec![Value::int(1)]), ArgValues::One(_)));
        let three = ArgValues::from_vec(vec![Value::int(1), Value::int(2), Value::int(3)]);
        assert_eq!(three.count(), 3);
    }

    #[test]
    fn prepend_keeps_order() {
        let args = ArgValues::Two(Value::int(2), Value::int(3)).prepend(Value::int(1));
        let (values, _) = args.into_parts();
        let ints: Vec<_> = values.iter().filter_map(Value::as_int).collect();
        assert_eq!(ints, vec![1, 2, 3]);
    }

    #[test]
    fn arg_count_errors() {
        let err = ArgValues::Empty.get_one_arg("len").unwrap_err();
        assert_eq!(err.arg(), Some("len() takes exactly one argument (0 given)"));
        let err = ArgValues::One(Value::none()).check_zero_args("keys").unwrap_err();
        assert_eq!(err.exc_type(), ExcType::TypeError);
    }
}
