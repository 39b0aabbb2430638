//! Objectives.

use crate::expr::Expr;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Handle to an objective owned by a [`crate::Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectiveId(pub(crate) usize);

impl ObjectiveId {
    pub fn id(&self) -> usize {
        self.0
    }
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    #[default]
    Minimize,
    Maximize,
}

impl Sense {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sense::Minimize => "minimize",
            Sense::Maximize => "maximize",
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Sense {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "min" | "minimize" => Ok(Sense::Minimize),
            "max" | "maximize" => Ok(Sense::Maximize),
            other => Err(format!("unknown objective sense '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveData {
    pub name: String,
    pub expr: Expr,
    pub sense: Sense,
    pub active: bool,
}

impl ObjectiveData {
    pub fn new(name: &str, expr: Expr, sense: Sense) -> Self {
        Self {
            name: name.to_string(),
            expr,
            sense,
            active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sense_parses_short_and_long_forms() {
        assert_eq!("min".parse::<Sense>().unwrap(), Sense::Minimize);
        assert_eq!("Maximize".parse::<Sense>().unwrap(), Sense::Maximize);
        assert!("up".parse::<Sense>().is_err());
        assert_eq!(Sense::Maximize.to_string(), "maximize");
    }
}
