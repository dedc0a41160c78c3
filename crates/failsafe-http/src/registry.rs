//! Versioned method registry.
//!
//! Each operation name maps to a list of bindings, each covering an
//! inclusive version range. Ranges under one name never overlap, so a
//! `(name, version)` pair selects at most one binding.

use std::collections::HashMap;

use failsafe_model::ApiVersion;

/// Errors raised while building a registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Versioned method {name} has overlapping version ranges")]
    OverlappingVersionRange { name: String },

    #[error("Versioned method {name} has an empty version range ({min} > {max})")]
    InvalidVersionRange {
        name: String,
        min: ApiVersion,
        max: ApiVersion,
    },
}

/// An inclusive version range; `None` bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionRange {
    pub min: Option<ApiVersion>,
    pub max: Option<ApiVersion>,
}

impl VersionRange {
    /// Covers every version.
    pub const ALL: Self = Self {
        min: None,
        max: None,
    };

    #[must_use]
    pub const fn new(min: Option<ApiVersion>, max: Option<ApiVersion>) -> Self {
        Self { min, max }
    }

    /// `[min, ∞)`.
    #[must_use]
    pub const fn starting_at(min: ApiVersion) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// `[min, max]`.
    #[must_use]
    pub const fn between(min: ApiVersion, max: ApiVersion) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    #[must_use]
    pub fn contains(&self, version: ApiVersion) -> bool {
        version.matches(self.min, self.max)
    }

    fn lower_key(&self) -> (u32, u32) {
        self.min.map_or((0, 0), |v| (v.major, v.minor))
    }

    fn upper_key(&self) -> (u32, u32) {
        self.max.map_or((u32::MAX, u32::MAX), |v| (v.major, v.minor))
    }
}

/// One handler bound to a version range.
#[derive(Debug, Clone)]
pub struct VersionedBinding<H> {
    pub name: String,
    pub range: VersionRange,
    pub handler: H,
}

/// Operation name → version-ranged handlers.
#[derive(Debug, Clone)]
pub struct VersionedMethodRegistry<H> {
    bindings: HashMap<String, Vec<VersionedBinding<H>>>,
}

impl<H> Default for VersionedMethodRegistry<H> {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

impl<H> VersionedMethodRegistry<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `name` for the versions in `range`.
    ///
    /// Fails with [`RegistryError::OverlappingVersionRange`] if the range
    /// intersects another range registered under the same name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        range: VersionRange,
        handler: H,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if let (Some(min), Some(max)) = (range.min, range.max) {
            if min > max {
                return Err(RegistryError::InvalidVersionRange { name, min, max });
            }
        }

        let existing = self.bindings.get(&name).map(Vec::as_slice).unwrap_or_default();
        let ranges: Vec<VersionRange> = existing
            .iter()
            .map(|b| b.range)
            .chain(std::iter::once(range))
            .collect();
        if has_overlap(&ranges) {
            return Err(RegistryError::OverlappingVersionRange { name });
        }

        let entries = self.bindings.entry(name.clone()).or_default();
        entries.push(VersionedBinding {
            name,
            range,
            handler,
        });
        entries.sort_by_key(|b| std::cmp::Reverse(b.range.lower_key()));
        Ok(())
    }

    /// The binding of `name` whose range contains `version`.
    #[must_use]
    pub fn resolve(&self, name: &str, version: ApiVersion) -> Option<&H> {
        self.bindings
            .get(name)?
            .iter()
            .find(|b| b.range.contains(version))
            .map(|b| &b.handler)
    }

    /// Whether any binding exists under `name`, whatever its version.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// All bindings of `name`, newest first.
    pub fn bindings(&self, name: &str) -> impl Iterator<Item = &VersionedBinding<H>> {
        self.bindings.get(name).into_iter().flatten()
    }

    /// The highest bound mentioned by any binding.
    #[must_use]
    pub fn max_known_version(&self) -> Option<ApiVersion> {
        self.bindings
            .values()
            .flatten()
            .flat_map(|b| [b.range.min, b.range.max])
            .flatten()
            .max()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Sweep-line overlap check over inclusive ranges.
///
/// Start events sort before end events at the same version so that
/// `[a, b]` and `[b, c]` count as overlapping.
fn has_overlap(ranges: &[VersionRange]) -> bool {
    let mut events: Vec<((u32, u32), i8)> = ranges
        .iter()
        .flat_map(|r| [(r.lower_key(), 1), (r.upper_key(), -1)])
        .collect();
    events.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    let mut open = 0i32;
    for (_, delta) in events {
        open += i32::from(delta);
        if open > 1 {
            return true;
        }
    }
    false
}
