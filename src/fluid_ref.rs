//! Parsing of fluid reference strings.
//!
//! Accepted forms:
//!
//! * `Water`: pure fluid or predefined mixture (`Air`, `R410A`), resolved
//!   by the engine;
//! * `REFPROP::R134A`: explicit backend prefix;
//! * `Nitrogen[0.79]&Oxygen[0.21]`: mixture with inline mole fractions.
//!
//! The batched entry point passes names and fractions separately; see
//! [`FluidRef::from_parts`].

use std::fmt;

use crate::engine::Backend;
use crate::error::{FacadeError, Result};

/// Tolerance on the fraction sum before renormalisation.
pub const FRACTION_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    /// Mole fraction.
    pub fraction: f64,
}

/// A resolved reference to a pure fluid or a mixture.
#[derive(Debug, Clone, PartialEq)]
pub struct FluidRef {
    /// `None` selects the configured default backend.
    pub backend: Option<Backend>,
    pub components: Vec<Component>,
}

impl FluidRef {
    /// Parse a scalar-query reference string.
    pub fn parse(reference: &str) -> Result<Self> {
        let (backend, body) = split_backend(reference)?;
        let components = parse_components(reference, body)?;
        Ok(Self { backend, components })
    }

    /// Build a reference from the batched form: backend selector, `&`-list
    /// of names, and a fraction vector.
    ///
    /// An empty `fractions` slice means compositions come from `names`
    /// (pure fluid, predefined mixture or bracketed fractions). Otherwise
    /// its length must equal the component count and the names must be
    /// bare.
    pub fn from_parts(backend: &str, names: &str, fractions: &[f64]) -> Result<Self> {
        let selected = match backend.trim() {
            "" | "?" => None,
            b if b.eq_ignore_ascii_case("DEFAULT") => None,
            b => Some(Backend::parse(b)?),
        };
        let (prefixed, body) = split_backend(names)?;
        let backend = match (selected, prefixed) {
            (Some(a), Some(b)) if a != b => {
                return Err(invalid(names, "backend selector and prefix disagree"));
            }
            (a, b) => a.or(b),
        };

        if fractions.is_empty() {
            let components = parse_components(names, body)?;
            return Ok(Self { backend, components });
        }

        let tokens = split_names(names, body)?;
        if tokens.iter().any(|t| t.contains('[')) {
            return Err(invalid(
                names,
                "inline fractions cannot be combined with a fraction vector",
            ));
        }
        if tokens.len() != fractions.len() {
            return Err(FacadeError::FractionCountMismatch {
                components: tokens.len(),
                fractions: fractions.len(),
            });
        }
        let components = tokens
            .into_iter()
            .zip(fractions)
            .map(|(name, &fraction)| Component { name: name.to_string(), fraction })
            .collect();
        Ok(Self { backend, components: normalize(components)? })
    }

    /// Single component with no inline composition.
    pub fn pure(backend: Option<Backend>, name: &str) -> Self {
        Self {
            backend,
            components: vec![Component { name: name.to_string(), fraction: 1.0 }],
        }
    }

    pub fn is_pure(&self) -> bool {
        self.components.len() == 1
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|c| c.name.as_str())
    }

    pub fn fractions(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.fraction).collect()
    }
}

impl fmt::Display for FluidRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(b) = self.backend {
            write!(f, "{}::", b.name())?;
        }
        if self.is_pure() {
            return f.write_str(&self.components[0].name);
        }
        let parts: Vec<String> = self
            .components
            .iter()
            .map(|c| format!("{}[{}]", c.name, c.fraction))
            .collect();
        f.write_str(&parts.join("&"))
    }
}

// ── helpers ─────────────────────────────────────────────────────────

fn invalid(reference: &str, reason: &str) -> FacadeError {
    FacadeError::InvalidFluidReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    }
}

fn split_backend(reference: &str) -> Result<(Option<Backend>, &str)> {
    match reference.split_once("::") {
        Some((prefix, body)) => {
            if prefix.trim().is_empty() {
                return Err(invalid(reference, "empty backend prefix"));
            }
            Ok((Some(Backend::parse(prefix)?), body))
        }
        None => Ok((None, reference)),
    }
}

fn split_names<'a>(reference: &str, body: &'a str) -> Result<Vec<&'a str>> {
    if body.trim().is_empty() {
        return Err(invalid(reference, "no fluid name"));
    }
    body.split('&')
        .map(|t| {
            let t = t.trim();
            if t.is_empty() {
                Err(invalid(reference, "empty component"))
            } else {
                Ok(t)
            }
        })
        .collect()
}

fn parse_components(reference: &str, body: &str) -> Result<Vec<Component>> {
    let tokens = split_names(reference, body)?;
    let mut components = Vec::with_capacity(tokens.len());
    let mut bracketed = 0usize;

    for token in &tokens {
        match token.split_once('[') {
            Some((name, rest)) => {
                let value = rest
                    .strip_suffix(']')
                    .ok_or_else(|| invalid(reference, "unterminated '['"))?;
                let fraction: f64 = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(reference, &format!("bad fraction \"{value}\"")))?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(invalid(reference, "fraction without a name"));
                }
                bracketed += 1;
                components.push(Component { name: name.to_string(), fraction });
            }
            None => components.push(Component { name: token.to_string(), fraction: 1.0 }),
        }
    }

    if bracketed != 0 && bracketed != components.len() {
        return Err(invalid(reference, "either every component or none carries a fraction"));
    }
    if bracketed == 0 && components.len() > 1 {
        return Err(invalid(reference, "mixture components need fractions"));
    }
    normalize(components)
}

/// Check fractions and rescale them to sum to exactly one.
fn normalize(mut components: Vec<Component>) -> Result<Vec<Component>> {
    let mut sum = 0.0;
    for c in &components {
        if !c.fraction.is_finite() || c.fraction < 0.0 {
            return Err(FacadeError::InvalidComposition(format!(
                "fraction of {} is {}",
                c.name, c.fraction
            )));
        }
        sum += c.fraction;
    }
    if (sum - 1.0).abs() > FRACTION_SUM_TOLERANCE {
        return Err(FacadeError::InvalidComposition(format!(
            "fractions sum to {sum}, expected 1"
        )));
    }
    for c in &mut components {
        c.fraction /= sum;
    }
    Ok(components)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_fluid() {
        let r = FluidRef::parse("Water").unwrap();
        assert!(r.is_pure());
        assert_eq!(r.backend, None);
        assert_eq!(r.components[0].fraction, 1.0);
    }

    #[test]
    fn backend_prefix() {
        let r = FluidRef::parse("REFPROP::R134A").unwrap();
        assert_eq!(r.backend, Some(Backend::Refprop));
        assert_eq!(r.names().collect::<Vec<_>>(), vec!["R134A"]);
        assert!(FluidRef::parse("NOPE::Water").is_err());
        assert!(FluidRef::parse("::Water").is_err());
    }

    #[test]
    fn inline_mixture() {
        let r = FluidRef::parse("Nitrogen[0.79]&Oxygen[0.21]").unwrap();
        assert_eq!(r.components.len(), 2);
        assert!((r.components[1].fraction - 0.21).abs() < 1e-12);
        assert_eq!(r.to_string(), "Nitrogen[0.79]&Oxygen[0.21]");
    }

    #[test]
    fn malformed_mixtures() {
        assert!(FluidRef::parse("Nitrogen&Oxygen").is_err());
        assert!(FluidRef::parse("Nitrogen[0.79]&Oxygen").is_err());
        assert!(FluidRef::parse("Nitrogen[0.7]&Oxygen[0.2]").is_err());
        assert!(FluidRef::parse("Nitrogen[0.79&Oxygen[0.21]").is_err());
        assert!(FluidRef::parse("Nitrogen[-0.1]&Oxygen[1.1]").is_err());
        assert!(FluidRef::parse("").is_err());
        assert!(FluidRef::parse("Water&").is_err());
    }

    #[test]
    fn batched_parts() {
        let r = FluidRef::from_parts("", "Nitrogen&Oxygen", &[0.79, 0.21]).unwrap();
        assert_eq!(r.components.len(), 2);

        let err = FluidRef::from_parts("?", "Nitrogen&Oxygen", &[1.0]).unwrap_err();
        assert_eq!(
            err,
            FacadeError::FractionCountMismatch { components: 2, fractions: 1 }
        );

        let r = FluidRef::from_parts("BUILTIN", "Water", &[]).unwrap();
        assert_eq!(r.backend, Some(Backend::Builtin));

        assert!(FluidRef::from_parts("REFPROP", "BUILTIN::Water", &[]).is_err());
        assert!(FluidRef::from_parts("", "Nitrogen[0.5]&Oxygen[0.5]", &[0.5, 0.5]).is_err());
    }
}
