//! Addressable model parameters.
//!
//! Every numeric field the fitter may vary has an explicit tag. Parameters are
//! named by scope (spin, a specific orbit, or the sky position) plus a field,
//! so a misspelt name is an error instead of a silently ignored attribute.

use std::fmt;
use std::str::FromStr;

use crate::error::TimingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpinField {
    P0,
    P1,
    Pepoch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrbitField {
    Pb,
    Asini,
    T0,
    Ecc,
    Om,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkyField {
    RaOffset,
    DecOffset,
}

impl SpinField {
    /// Declaration order.
    pub const ALL: [SpinField; 3] = [SpinField::P0, SpinField::P1, SpinField::Pepoch];

    pub fn name(self) -> &'static str {
        match self {
            SpinField::P0 => "p0",
            SpinField::P1 => "p1",
            SpinField::Pepoch => "pepoch",
        }
    }
}

impl OrbitField {
    /// Declaration order.
    pub const ALL: [OrbitField; 5] = [
        OrbitField::Pb,
        OrbitField::Asini,
        OrbitField::T0,
        OrbitField::Ecc,
        OrbitField::Om,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OrbitField::Pb => "pb",
            OrbitField::Asini => "asini",
            OrbitField::T0 => "t0",
            OrbitField::Ecc => "ecc",
            OrbitField::Om => "om",
        }
    }
}

impl SkyField {
    /// Declaration order.
    pub const ALL: [SkyField; 2] = [SkyField::RaOffset, SkyField::DecOffset];

    pub fn name(self) -> &'static str {
        match self {
            SkyField::RaOffset => "ra_offset",
            SkyField::DecOffset => "dec_offset",
        }
    }
}

fn lookup<T: Copy>(all: &[T], name_of: fn(T) -> &'static str, s: &str) -> Option<T> {
    let s = s.trim();
    all.iter().copied().find(|&f| name_of(f).eq_ignore_ascii_case(s))
}

/// Which component of the model a parameter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Spin,
    Orbit(usize),
    Sky,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Spin => write!(f, "spin"),
            Scope::Orbit(i) => write!(f, "orbit[{i}]"),
            Scope::Sky => write!(f, "sky"),
        }
    }
}

impl Scope {
    /// Resolve a field name within this scope.
    ///
    /// Only checks the name; whether the model actually has orbit `i` or a sky
    /// block is checked by the model itself.
    pub fn field(self, name: &str) -> Result<ParamId, TimingError> {
        let found = match self {
            Scope::Spin => lookup(&SpinField::ALL, SpinField::name, name).map(ParamId::Spin),
            Scope::Orbit(i) => {
                lookup(&OrbitField::ALL, OrbitField::name, name).map(|f| ParamId::Orbit(i, f))
            }
            Scope::Sky => lookup(&SkyField::ALL, SkyField::name, name).map(ParamId::Sky),
        };
        found.ok_or_else(|| TimingError::UnknownParameter {
            scope: self.to_string(),
            name: name.to_string(),
        })
    }
}

/// A single addressable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    Spin(SpinField),
    Orbit(usize, OrbitField),
    Sky(SkyField),
}

impl ParamId {
    pub fn scope(self) -> Scope {
        match self {
            ParamId::Spin(_) => Scope::Spin,
            ParamId::Orbit(i, _) => Scope::Orbit(i),
            ParamId::Sky(_) => Scope::Sky,
        }
    }

    pub fn field_name(self) -> &'static str {
        match self {
            ParamId::Spin(f) => f.name(),
            ParamId::Orbit(_, f) => f.name(),
            ParamId::Sky(f) => f.name(),
        }
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamId::Spin(field) => write!(f, "{}", field.name()),
            ParamId::Orbit(i, field) => write!(f, "orbit[{i}].{}", field.name()),
            ParamId::Sky(field) => write!(f, "sky.{}", field.name()),
        }
    }
}

/// Parses the label forms:
///
/// - `p0`, `p1`, `pepoch`
/// - `pb` (orbit 0), `orbit[1].pb`, `orbit1.pb`
/// - `ra_offset`, `sky.ra_offset`
impl FromStr for ParamId {
    type Err = TimingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((scope, name)) = s.split_once('.') else {
            // Bare names: try each scope in order.
            return Scope::Spin
                .field(s)
                .or_else(|_| Scope::Orbit(0).field(s))
                .or_else(|_| Scope::Sky.field(s))
                .map_err(|_| TimingError::UnknownParameter {
                    scope: "any".to_string(),
                    name: s.to_string(),
                });
        };

        let scope_lc = scope.trim().to_ascii_lowercase();
        let scope = match scope_lc.as_str() {
            "spin" => Scope::Spin,
            "sky" => Scope::Sky,
            other => {
                let index = other
                    .strip_prefix("orbit")
                    .map(|rest| rest.trim_start_matches('[').trim_end_matches(']'))
                    .and_then(|idx| idx.parse::<usize>().ok())
                    .ok_or_else(|| TimingError::UnknownParameter {
                        scope: other.to_string(),
                        name: name.to_string(),
                    })?;
                Scope::Orbit(index)
            }
        };
        scope.field(name)
    }
}
