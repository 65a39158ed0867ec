//! Player directives
//!
//! A directive is one instruction for one nation for one turn. Nothing here
//! mutates state; `Registry::apply_directive` does that.

use serde::{Deserialize, Serialize};

use crate::core::error::{NacioError, Result};
use crate::core::types::NationId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Directive {
    /// Raise tech level by one, paid from the treasury
    RaiseTech,
    /// Raise industry level by one, paid from the treasury
    RaiseIndustry,
    /// Move treasury into GDP
    Invest { amount: f64 },
    /// Move treasury into military strength
    Mobilize { amount: f64 },
    /// Move treasury into stability and approval
    Stabilize { amount: f64 },
    /// Commit forces against another nation this turn
    Attack { target: NationId, force: f64 },
}

impl Directive {
    /// Stable directive-type name, matching the serialized tag
    pub fn kind(&self) -> &'static str {
        match self {
            Directive::RaiseTech => "raise_tech",
            Directive::RaiseIndustry => "raise_industry",
            Directive::Invest { .. } => "invest",
            Directive::Mobilize { .. } => "mobilize",
            Directive::Stabilize { .. } => "stabilize",
            Directive::Attack { .. } => "attack",
        }
    }

    /// Build a directive from a type name and positional parameters
    ///
    /// `attack` takes `<target> <force>`; the spending directives take
    /// `<amount>`; level-ups take nothing.
    pub fn from_parts(kind: &str, params: &[&str]) -> Result<Directive> {
        let directive = match kind {
            "raise_tech" | "tech" => Directive::RaiseTech,
            "raise_industry" | "industry" => Directive::RaiseIndustry,
            "invest" => Directive::Invest {
                amount: parse_amount(kind, params.first())?,
            },
            "mobilize" => Directive::Mobilize {
                amount: parse_amount(kind, params.first())?,
            },
            "stabilize" => Directive::Stabilize {
                amount: parse_amount(kind, params.first())?,
            },
            "attack" => {
                let target = params.first().ok_or_else(|| {
                    NacioError::Validation("attack needs a target nation".into())
                })?;
                Directive::Attack {
                    target: NationId::from(*target),
                    force: parse_amount(kind, params.get(1))?,
                }
            }
            other => {
                return Err(NacioError::Validation(format!(
                    "Unknown directive type: {}",
                    other
                )))
            }
        };
        Ok(directive)
    }

    /// Treasury spending directives carry an amount
    pub fn spend(&self) -> Option<f64> {
        match self {
            Directive::Invest { amount }
            | Directive::Mobilize { amount }
            | Directive::Stabilize { amount } => Some(*amount),
            _ => None,
        }
    }
}

fn parse_amount(kind: &str, raw: Option<&&str>) -> Result<f64> {
    let raw = raw.ok_or_else(|| NacioError::Validation(format!("{} needs an amount", kind)))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| NacioError::Validation(format!("{}: '{}' is not a number", kind, raw)))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts() {
        assert_eq!(
            Directive::from_parts("tech", &[]).unwrap(),
            Directive::RaiseTech
        );
        assert_eq!(
            Directive::from_parts("invest", &["12.5"]).unwrap(),
            Directive::Invest { amount: 12.5 }
        );
        assert_eq!(
            Directive::from_parts("attack", &["fra", "40"]).unwrap(),
            Directive::Attack {
                target: NationId::from("fra"),
                force: 40.0
            }
        );
    }

    #[test]
    fn test_from_parts_errors() {
        assert!(Directive::from_parts("annex", &[]).is_err());
        assert!(Directive::from_parts("invest", &[]).is_err());
        assert!(Directive::from_parts("invest", &["lots"]).is_err());
        assert!(Directive::from_parts("attack", &[]).is_err());
    }

    #[test]
    fn test_serialized_tag_matches_kind() {
        let directive = Directive::Mobilize { amount: 3.0 };
        let json = serde_json::to_value(&directive).unwrap();
        assert_eq!(json["type"], directive.kind());
    }
}
