//! Ordered scheme preference sources consulted by the arbiter.
//!
//! Sources are asked in insertion order and the first one to name a usable
//! scheme wins. [`BranchPreference`] derives a scheme from the current
//! source-control branch so parallel checkouts of a project each claim their
//! own scheme.

use tracing::warn;

use hermes_config::FALLBACK_SCHEME;

use crate::scheme::Scheme;

const PREFERENCE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::preference");

/// Supplies an optional preferred scheme.
pub trait SchemePreference {
    /// Returns the preferred scheme, or `None` to defer to later sources.
    fn preferred_scheme(&self) -> Option<String>;
}

/// Handle identifying a registered preference source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

/// Membership change reported to the change callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceChange {
    /// A source was appended.
    Added(SourceId),
    /// A source was removed.
    Removed(SourceId),
}

type ChangeCallback = Box<dyn FnMut(SourceChange)>;

/// Preference sources in insertion order.
#[derive(Default)]
pub struct PreferenceSources {
    sources: Vec<(SourceId, Box<dyn SchemePreference>)>,
    next_id: u64,
    on_change: Option<ChangeCallback>,
}

impl PreferenceSources {
    /// Builds an empty source list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `callback`, invoked after every add and every successful
    /// remove. Replaces any previous callback.
    pub fn set_change_callback(&mut self, callback: impl FnMut(SourceChange) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    /// Appends `source` and returns its handle.
    pub fn add(&mut self, source: Box<dyn SchemePreference>) -> SourceId {
        let id = SourceId(self.next_id);
        self.next_id += 1;
        self.sources.push((id, source));
        self.notify(SourceChange::Added(id));
        id
    }

    /// Removes the source registered under `id`. Returns whether it existed.
    pub fn remove(&mut self, id: SourceId) -> bool {
        let before = self.sources.len();
        self.sources.retain(|(existing, _)| *existing != id);
        let removed = self.sources.len() != before;
        if removed {
            self.notify(SourceChange::Removed(id));
        }
        removed
    }

    /// Asks each source in order and returns the first usable preference.
    ///
    /// Empty answers defer to the next source. Answers that sanitize to
    /// nothing are logged and skipped.
    #[must_use]
    pub fn first_preference(&self) -> Option<Scheme> {
        self.sources.iter().find_map(|(id, source)| {
            let preferred = source.preferred_scheme()?;
            if preferred.is_empty() {
                return None;
            }
            let scheme = Scheme::sanitize(&preferred);
            if scheme.is_none() {
                warn!(
                    target: PREFERENCE_TARGET,
                    source = ?id,
                    preferred = %preferred,
                    "ignoring preferred scheme with no usable characters"
                );
            }
            scheme
        })
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Reports whether no sources are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn notify(&mut self, change: SourceChange) {
        if let Some(callback) = self.on_change.as_mut() {
            callback(change);
        }
    }
}

/// A source that always answers with the same value.
#[derive(Debug, Clone, Default)]
pub struct FixedPreference(Option<String>);

impl FixedPreference {
    /// Prefers `scheme`.
    #[must_use]
    pub fn new(scheme: impl Into<String>) -> Self {
        Self(Some(scheme.into()))
    }

    /// Expresses no preference.
    #[must_use]
    pub fn none() -> Self {
        Self(None)
    }
}

impl SchemePreference for FixedPreference {
    fn preferred_scheme(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Literal token substitution applied to a branch name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenReplacement {
    /// Text searched for in the branch name.
    pub token: String,
    /// Text substituted for every occurrence.
    pub replacement: String,
}

/// Derives a scheme from a source-control branch name.
#[derive(Debug, Clone)]
pub struct BranchPreference {
    branch: String,
    replacements: Vec<TokenReplacement>,
}

impl BranchPreference {
    /// Builds a preference applying `replacements` in order to `branch`.
    #[must_use]
    pub fn new(branch: impl Into<String>, replacements: Vec<TokenReplacement>) -> Self {
        Self {
            branch: branch.into(),
            replacements,
        }
    }

    /// Builds a preference using the depot-style default replacement.
    ///
    /// Branches shaped like `++Depot+Stream+Name` have everything up to the
    /// last `+` replaced by the sanitized project name followed by `-`, so
    /// `++Depot+Stream+Main` in project `MyGame` yields `mygame-main`.
    #[must_use]
    pub fn with_default_replacements(branch: impl Into<String>, project: Option<&str>) -> Self {
        let branch = branch.into();
        let replacements = default_replacement(&branch, project).into_iter().collect();
        Self::new(branch, replacements)
    }

    /// The sanitized scheme this branch maps to.
    #[must_use]
    pub fn scheme(&self) -> Option<Scheme> {
        let replaced = self
            .replacements
            .iter()
            .filter(|replacement| !replacement.token.is_empty())
            .fold(self.branch.clone(), |branch, replacement| {
                branch.replace(&replacement.token, &replacement.replacement)
            });
        Scheme::sanitize(&replaced)
    }
}

impl SchemePreference for BranchPreference {
    fn preferred_scheme(&self) -> Option<String> {
        self.scheme().map(String::from)
    }
}

fn default_replacement(branch: &str, project: Option<&str>) -> Option<TokenReplacement> {
    if !branch.starts_with("++") {
        return None;
    }
    let last_plus = branch.rfind('+')?;
    if last_plus <= 2 || last_plus + 1 >= branch.len() {
        return None;
    }
    let prefix = project
        .and_then(Scheme::sanitize)
        .map_or_else(|| FALLBACK_SCHEME.to_owned(), String::from);
    Some(TokenReplacement {
        token: branch.get(..=last_plus)?.to_owned(),
        replacement: format!("{prefix}-"),
    })
}
