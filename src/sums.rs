//! Typed enumerations (sum types) usable as path constraints.
//!
//! # Responsibilities
//! - Describe a closed set of named values with string serializations
//! - Match raw captured text back to a variant
//! - Track contract-term implementations per variant and check completeness
//! - Build exhaustive inline matches over the variants
//!
//! # Design Decisions
//! - Identity is the dotted path (e.g. `shop.Color`), which is what route patterns reference
//! - Variant names are UPPER_CASE; short-form variants serialize as the lowercased name
//! - Term implementations are identified by name; rebinding the same name is accepted,
//!   a different one is rejected

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

/// One named value of a sum type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SumVariant {
    pub name: String,
    pub value: String,
}

/// Raw value that is not part of a sum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SumMismatch {
    pub value: String,
    pub sum: String,
    pub accepted: Vec<String>,
}

impl fmt::Display for SumMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Variant value \"{}\" is not a part of the type {}: {}",
            self.value,
            self.sum,
            self.accepted.join(", ")
        )
    }
}

impl std::error::Error for SumMismatch {}

/// A closed enumeration of string-serialized variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SumType {
    path: String,
    variants: Vec<SumVariant>,
    contract: Vec<String>,
}

impl SumType {
    /// Start building a sum type identified by a dotted path.
    pub fn builder(path: impl Into<String>) -> SumTypeBuilder {
        SumTypeBuilder {
            path: path.into(),
            variants: Vec::new(),
            contract: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn variants(&self) -> &[SumVariant] {
        &self.variants
    }

    /// Names of the contract terms every variant must implement.
    pub fn contract(&self) -> &[String] {
        &self.contract
    }

    /// Serialized values in declaration order.
    pub fn values(&self) -> Vec<&str> {
        self.variants.iter().map(|v| v.value.as_str()).collect()
    }

    pub fn variant(&self, name: &str) -> Option<&SumVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Resolve a serialized value to its variant.
    pub fn match_value(&self, raw: &str) -> Result<&SumVariant, SumMismatch> {
        self.variants
            .iter()
            .find(|v| v.value == raw)
            .ok_or_else(|| self.mismatch(raw))
    }

    fn mismatch(&self, raw: &str) -> SumMismatch {
        SumMismatch {
            value: raw.to_string(),
            sum: self.path.clone(),
            accepted: self
                .variants
                .iter()
                .map(|v| format!("{} => {}", v.value, v.name))
                .collect(),
        }
    }

    /// Build a match with one case per variant name.
    ///
    /// Fails on names that are not variants of this type, on repeated names,
    /// and when some variant has no case.
    pub fn inline_match<T, I, S>(&self, cases: I) -> ConfigResult<InlineMatch<T>>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
    {
        let mut checked: IndexMap<String, T> = IndexMap::new();
        for (name, case) in cases {
            let name = name.into();
            if self.variant(&name).is_none() {
                return Err(ConfigError::InvalidVariant {
                    sum: self.path.clone(),
                    variant: name,
                    reason: "variant does not belong to the type".into(),
                });
            }
            if checked.insert(name.clone(), case).is_some() {
                return Err(ConfigError::InvalidVariant {
                    sum: self.path.clone(),
                    variant: name,
                    reason: "variant is matched more than once".into(),
                });
            }
        }
        if let Some(missing) = self.variants.iter().find(|v| !checked.contains_key(&v.name)) {
            return Err(ConfigError::NonExhaustiveMatch {
                sum: self.path.clone(),
                variant: missing.name.clone(),
            });
        }
        Ok(InlineMatch {
            sum: self.clone(),
            cases: checked,
        })
    }
}

/// Exhaustive per-variant cases built by [`SumType::inline_match`].
#[derive(Debug, Clone)]
pub struct InlineMatch<T> {
    sum: SumType,
    cases: IndexMap<String, T>,
}

impl<T> InlineMatch<T> {
    /// Case for the variant serialized as `raw`.
    pub fn matches(&self, raw: &str) -> Result<&T, SumMismatch> {
        let variant = self.sum.match_value(raw)?;
        self.cases.get(&variant.name).ok_or_else(|| self.sum.mismatch(raw))
    }

    /// Case for a variant already resolved.
    pub fn case(&self, variant: &SumVariant) -> Option<&T> {
        self.cases.get(&variant.name)
    }
}

/// Builder for [`SumType`].
#[derive(Debug)]
pub struct SumTypeBuilder {
    path: String,
    variants: Vec<(String, Option<String>)>,
    contract: Vec<String>,
}

impl SumTypeBuilder {
    /// Add a variant with an explicit serialized value.
    pub fn variant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variants.push((name.into(), Some(value.into())));
        self
    }

    /// Add a variant whose value is its lowercased name.
    pub fn short_variant(mut self, name: impl Into<String>) -> Self {
        self.variants.push((name.into(), None));
        self
    }

    pub fn contract_term(mut self, term: impl Into<String>) -> Self {
        self.contract.push(term.into());
        self
    }

    pub fn build(self) -> ConfigResult<SumType> {
        let name_re = Regex::new("^[A-Z][0-9A-Z_]*$").map_err(|e| ConfigError::InvalidVariant {
            sum: self.path.clone(),
            variant: String::new(),
            reason: e.to_string(),
        })?;

        let mut variants: Vec<SumVariant> = Vec::with_capacity(self.variants.len());
        for (name, value) in self.variants {
            if !name_re.is_match(&name) {
                return Err(ConfigError::InvalidVariant {
                    sum: self.path,
                    variant: name,
                    reason: "variant names must match ^[A-Z][0-9A-Z_]*$".into(),
                });
            }
            let value = value.unwrap_or_else(|| name.to_lowercase());
            if variants.iter().any(|v| v.name == name || v.value == value) {
                return Err(ConfigError::InvalidVariant {
                    sum: self.path,
                    variant: name,
                    reason: "duplicate variant name or value".into(),
                });
            }
            variants.push(SumVariant { name, value });
        }

        if variants.is_empty() {
            return Err(ConfigError::InvalidVariant {
                sum: self.path,
                variant: String::new(),
                reason: "a sum type needs at least one variant".into(),
            });
        }

        Ok(SumType {
            path: self.path,
            variants,
            contract: self.contract,
        })
    }
}

/// Callable behind a contract term: receives the variant and an input value.
pub type TermFn = Arc<dyn Fn(&SumVariant, &Value) -> Value + Send + Sync>;

/// A named implementation of a contract term.
#[derive(Clone)]
pub struct TermImpl {
    name: String,
    func: TermFn,
}

impl TermImpl {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&SumVariant, &Value) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, variant: &SumVariant, input: &Value) -> Value {
        (self.func)(variant, input)
    }
}

impl fmt::Debug for TermImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TermImpl").field(&self.name).finish()
    }
}

/// Frozen view of a sum type together with its contract implementations.
#[derive(Debug, Clone)]
pub struct SumTypeMeta {
    pub sum: Arc<SumType>,
    /// variant name -> (contract term -> implementation)
    pub matches: IndexMap<String, IndexMap<String, TermImpl>>,
}

impl SumTypeMeta {
    pub fn implementation(&self, variant: &str, term: &str) -> Option<&TermImpl> {
        self.matches.get(variant)?.get(term)
    }

    /// Run `term` for the variant serialized as `raw`.
    pub fn apply(&self, raw: &str, term: &str, input: &Value) -> Result<Option<Value>, SumMismatch> {
        let variant = self.sum.match_value(raw)?;
        Ok(self
            .implementation(&variant.name, term)
            .map(|implementation| implementation.call(variant, input)))
    }
}

/// Build-phase registry of sum types.
#[derive(Debug, Default)]
pub struct SumTypeRegistry {
    types: IndexMap<String, Arc<SumType>>,
    bindings: IndexMap<String, IndexMap<String, IndexMap<String, TermImpl>>>,
}

impl SumTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sum: SumType) -> ConfigResult<Arc<SumType>> {
        if self.types.contains_key(sum.path()) {
            return Err(ConfigError::DuplicateSumType(sum.path().to_string()));
        }
        let sum = Arc::new(sum);
        tracing::debug!(sum = %sum.path(), variants = sum.variants().len(), "Sum type registered");
        self.types.insert(sum.path().to_string(), sum.clone());
        Ok(sum)
    }

    /// Look up a sum type by dotted path.
    pub fn resolve(&self, path: &str) -> ConfigResult<Arc<SumType>> {
        self.types
            .get(path)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownSumType(path.to_string()))
    }

    /// Bind an implementation to a contract term of one variant.
    pub fn bind(
        &mut self,
        path: &str,
        variant: &str,
        term: &str,
        implementation: TermImpl,
    ) -> ConfigResult<()> {
        let sum = self.resolve(path)?;
        let qualified = format!("{}::{}", path, variant);

        if sum.variant(variant).is_none() {
            return Err(ConfigError::InvalidVariant {
                sum: path.to_string(),
                variant: variant.to_string(),
                reason: "no such variant".into(),
            });
        }
        if !sum.contract().iter().any(|t| t == term) {
            return Err(ConfigError::InvalidVariant {
                sum: path.to_string(),
                variant: variant.to_string(),
                reason: format!("contract has no term \"{}\"", term),
            });
        }

        let terms = self
            .bindings
            .entry(path.to_string())
            .or_default()
            .entry(variant.to_string())
            .or_default();

        if let Some(existing) = terms.get(term) {
            if existing.name() != implementation.name() {
                return Err(ConfigError::ConflictingBinding {
                    variant: qualified,
                    term: term.to_string(),
                    existing: existing.name().to_string(),
                    new: implementation.name().to_string(),
                });
            }
            return Ok(());
        }

        tracing::debug!(variant = %qualified, term, implementation = %implementation.name(), "Contract term bound");
        terms.insert(term.to_string(), implementation);
        Ok(())
    }

    /// Every variant of every registered sum type must implement every contract term.
    pub fn check_consistency(&self) -> ConfigResult<()> {
        for (path, sum) in &self.types {
            for variant in sum.variants() {
                for term in sum.contract() {
                    let bound = self
                        .bindings
                        .get(path)
                        .and_then(|v| v.get(&variant.name))
                        .is_some_and(|t| t.contains_key(term));
                    if !bound {
                        return Err(ConfigError::IncompleteContract {
                            sum: path.clone(),
                            term: term.clone(),
                            variant: format!("{}::{}", path, variant.name),
                        });
                    }
                }
            }
            tracing::debug!(sum = %path, "Checked sum type contract");
        }
        Ok(())
    }

    /// Consume the registry into frozen metadata.
    pub fn into_meta(mut self) -> IndexMap<String, SumTypeMeta> {
        self.types
            .into_iter()
            .map(|(path, sum)| {
                let mut matches = self.bindings.swap_remove(&path).unwrap_or_default();
                for variant in sum.variants() {
                    matches.entry(variant.name.clone()).or_default();
                }
                (path, SumTypeMeta { sum, matches })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color() -> SumType {
        SumType::builder("shop.Color")
            .variant("RED", "r")
            .short_variant("GREEN")
            .build()
            .unwrap()
    }

    #[test]
    fn test_short_variant_value_is_lowercase() {
        let sum = color();
        assert_eq!(sum.values(), vec!["r", "green"]);
        assert_eq!(sum.match_value("green").unwrap().name, "GREEN");
    }

    #[test]
    fn test_match_mismatch_lists_values() {
        let err = color().match_value("blue").unwrap_err();
        assert!(err.to_string().contains("r => RED"));
        assert!(err.to_string().contains("shop.Color"));
    }

    #[test]
    fn test_invalid_variant_name() {
        let err = SumType::builder("x.Y").variant("red", "r").build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVariant { .. }));
    }

    fn price(amount: i64) -> TermImpl {
        TermImpl::new(format!("price_{}", amount), move |_, qty| {
            Value::from(amount * qty.as_i64().unwrap_or(1))
        })
    }

    #[test]
    fn test_contract_consistency() {
        let mut registry = SumTypeRegistry::new();
        let sum = SumType::builder("shop.Size")
            .short_variant("SMALL")
            .short_variant("LARGE")
            .contract_term("price")
            .build()
            .unwrap();
        registry.register(sum).unwrap();

        registry.bind("shop.Size", "SMALL", "price", price(5)).unwrap();
        assert!(matches!(
            registry.check_consistency(),
            Err(ConfigError::IncompleteContract { .. })
        ));

        registry.bind("shop.Size", "LARGE", "price", price(9)).unwrap();
        // same implementation again is fine
        registry.bind("shop.Size", "LARGE", "price", price(9)).unwrap();
        assert!(matches!(
            registry.bind("shop.Size", "LARGE", "price", price(10)),
            Err(ConfigError::ConflictingBinding { .. })
        ));
        registry.check_consistency().unwrap();

        let meta = registry.into_meta();
        let size = &meta["shop.Size"];
        assert_eq!(size.implementation("SMALL", "price").unwrap().name(), "price_5");
        assert_eq!(size.apply("large", "price", &Value::from(2)).unwrap(), Some(Value::from(18)));
        assert_eq!(size.apply("small", "weight", &Value::Null).unwrap(), None);
        assert!(size.apply("medium", "price", &Value::Null).is_err());
    }

    #[test]
    fn test_inline_match_is_exhaustive() {
        let sum = color();
        let labels = sum.inline_match([("RED", "stop"), ("GREEN", "go")]).unwrap();
        assert_eq!(*labels.matches("r").unwrap(), "stop");
        assert_eq!(*labels.matches("green").unwrap(), "go");
        assert!(labels.matches("blue").is_err());

        assert!(matches!(
            sum.inline_match([("RED", 1)]),
            Err(ConfigError::NonExhaustiveMatch { variant, .. }) if variant == "GREEN"
        ));
        assert!(matches!(
            sum.inline_match([("RED", 1), ("GREEN", 2), ("BLUE", 3)]),
            Err(ConfigError::InvalidVariant { .. })
        ));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = SumTypeRegistry::new();
        registry.register(color()).unwrap();
        assert!(matches!(
            registry.register(color()),
            Err(ConfigError::DuplicateSumType(_))
        ));
    }
}
