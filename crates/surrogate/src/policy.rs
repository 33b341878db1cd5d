//! Declarative masking configuration.
//!
//! A [`MaskPolicy`] is usually loaded from JSON:
//!
//! ```json
//! { "masked": ["password"], "expose": ["name", "email"] }
//! ```
//!
//! `masked` hides the listed names. `expose` is an allow-list: every other name in
//! [`get_api`](crate::public::get_api) of the object is hidden too. Both may be given.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    exception::{ExcType, RunResult},
    masking::masking_proxy,
    public::get_api,
    value::Value,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaskPolicy {
    #[serde(default)]
    pub masked: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose: Option<Vec<String>>,
}

impl MaskPolicy {
    /// Parses a policy, reporting malformed input as a `ValueError`.
    pub fn from_json(json: &str) -> RunResult<Self> {
        serde_json::from_str(json).map_err(|err| ExcType::value_error(format!("invalid mask policy: {err}")))
    }

    /// The names this policy hides on `obj`.
    pub fn masked_names(&self, obj: &Value) -> RunResult<BTreeSet<String>> {
        let mut names: BTreeSet<String> = self.masked.iter().cloned().collect();
        if let Some(expose) = &self.expose {
            let exposed: BTreeSet<&str> = expose.iter().map(String::as_str).collect();
            names.extend(get_api(obj)?.into_iter().filter(|name| !exposed.contains(name.as_str())));
        }
        Ok(names)
    }

    /// Wraps `obj` in a masking proxy configured by this policy.
    pub fn apply(&self, obj: &Value) -> RunResult<Value> {
        masking_proxy(obj.clone(), self.masked_names(obj)?)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let policy = MaskPolicy::from_json(r#"{"masked": ["password"]}"#).unwrap();
        assert_eq!(
            policy,
            MaskPolicy {
                masked: vec!["password".to_owned()],
                expose: None,
            }
        );
        assert_eq!(MaskPolicy::from_json("{}").unwrap(), MaskPolicy::default());
    }

    #[test]
    fn malformed_policy_is_a_value_error() {
        let err = MaskPolicy::from_json(r#"{"hidden": []}"#).unwrap_err();
        assert_eq!(err.exc_type(), ExcType::ValueError);
        assert!(err.arg().is_some_and(|msg| msg.starts_with("invalid mask policy")));
    }

    #[test]
    fn round_trips_through_json() {
        let policy = MaskPolicy {
            masked: vec!["a".to_owned()],
            expose: Some(vec!["b".to_owned()]),
        };
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(MaskPolicy::from_json(&json).unwrap(), policy);
    }
}
