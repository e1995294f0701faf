//! Public suffix awareness.
//!
//! A public suffix is a domain under which unrelated parties can register
//! names, such as `com` or `co.uk`. Cookie scoping must refuse to set
//! domain cookies on such suffixes, which could otherwise be exploited
//! maliciously, so the jar consults a pluggable provider for them.

/// A provider of public suffix information.
///
/// The jar works without one, in which case the last label of a domain is
/// assumed to be its public suffix. Any concrete list is external to this
/// crate; with the `psl` feature enabled, [`publicsuffix::List`] implements
/// this trait directly.
pub trait PublicSuffixList: Send + Sync {
    /// The longest suffix of `domain` that is a public suffix, if any.
    ///
    /// `domain` is lowercase, ASCII-encoded and has no leading dot, and the
    /// returned suffix must be in the same form.
    fn public_suffix(&self, domain: &str) -> Option<String>;

    /// A short string identifying the provider and the revision of its
    /// data, so that jars backed by different list versions can be told
    /// apart.
    fn description(&self) -> String;
}

#[cfg(feature = "psl")]
impl PublicSuffixList for publicsuffix::List {
    fn public_suffix(&self, domain: &str) -> Option<String> {
        use publicsuffix::Psl;

        self.suffix(domain.as_bytes())
            .and_then(|suffix| std::str::from_utf8(suffix.as_bytes()).ok())
            .map(str::to_owned)
    }

    fn description(&self) -> String {
        "publicsuffix.org list".to_owned()
    }
}
