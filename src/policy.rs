//! Scoping decisions for cookie domains.

use crate::error::Error;
use crate::host::{has_dot_suffix, is_ip};
use crate::psl::PublicSuffixList;

/// Applies the domain rules of RFC 6265 section 5.3 using an optional
/// public suffix list.
pub(crate) struct Policy {
    psl: Option<Box<dyn PublicSuffixList>>,
}

impl Policy {
    pub fn new(psl: Option<Box<dyn PublicSuffixList>>) -> Self {
        Self { psl }
    }

    /// The public suffix of `domain`. Without a configured list the last
    /// label is assumed to be the suffix.
    fn public_suffix(&self, domain: &str) -> String {
        self.psl
            .as_ref()
            .and_then(|list| list.public_suffix(domain))
            .unwrap_or_else(|| last_label(domain).to_owned())
    }

    /// Derive the effective domain and host-only flag for a cookie set on
    /// the canonical request host `host` with the `Domain` attribute
    /// `domain` (empty when the attribute was absent).
    pub fn domain_and_type(&self, host: &str, domain: &str) -> Result<(String, bool), Error> {
        if domain.is_empty() {
            // No Domain attribute: a host cookie.
            return Ok((host.to_owned(), true));
        }

        if domain.bytes().all(|b| b == b'.') {
            // The attribute consists solely of dots.
            return Err(Error::MalformedDomain);
        }

        let domain = domain.to_lowercase();

        if is_ip(host) {
            // There are no subdomains of an IP address, so the only
            // acceptable Domain attribute is the address itself.
            if let Some(rest) = domain.strip_prefix('.') {
                if rest == host {
                    return Err(Error::NoHostname);
                }
                return Err(Error::IllegalDomain);
            }
            if domain == host {
                return Ok((host.to_owned(), true));
            }
            return Err(Error::IllegalDomain);
        }

        let domain = domain.strip_prefix('.').unwrap_or(&domain);
        if domain.is_empty() || domain.starts_with('.') || domain.ends_with('.') {
            // "Domain=." was handled above; this catches "Domain=..x.com"
            // and "Domain=x.com.".
            return Err(Error::MalformedDomain);
        }

        let suffix = self.public_suffix(domain);
        if !suffix.is_empty() && !has_dot_suffix(domain, &suffix) {
            if host == domain {
                // A host may still set a host cookie on itself even when
                // it is a public suffix.
                return Ok((host.to_owned(), true));
            }
            return Err(Error::IllegalDomain);
        }

        // The domain must be authoritative for the host:
        // www.mycompany.com cannot set cookies for .ourcompetitors.com.
        if host != domain && !has_dot_suffix(host, domain) {
            return Err(Error::IllegalDomain);
        }

        Ok((domain.to_owned(), false))
    }

    /// The bucket key for `host`: its registrable domain, one label below
    /// the public suffix. IP literals key on themselves, and the whole
    /// host is used whenever nothing shorter is sound.
    pub fn bucket_key(&self, host: &str) -> String {
        if is_ip(host) {
            return host.to_owned();
        }

        let i = match &self.psl {
            None => match host.rfind('.') {
                Some(i) if i > 0 => i,
                _ => return host.to_owned(),
            },
            Some(list) => {
                let suffix = list
                    .public_suffix(host)
                    .unwrap_or_else(|| last_label(host).to_owned());
                if suffix.is_empty() || suffix == host {
                    return host.to_owned();
                }

                let i = host.len().saturating_sub(suffix.len());
                if i == 0 || host.as_bytes()[i - 1] != b'.' {
                    // The list returned something that is not a proper
                    // suffix of the host; keying on the whole host is a
                    // safe stopgap.
                    return host.to_owned();
                }
                i - 1
            }
        };

        match host[..i].rfind('.') {
            Some(prev_dot) => host[prev_dot + 1..].to_owned(),
            None => host.to_owned(),
        }
    }

    /// A short description of the configured public suffix list, if any.
    pub fn psl_description(&self) -> Option<String> {
        self.psl.as_ref().map(|list| list.description())
    }
}

fn last_label(domain: &str) -> &str {
    match domain.rfind('.') {
        Some(i) => &domain[i + 1..],
        None => domain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    /// The minimal two-rule fake: `co.uk` is a public suffix, and
    /// otherwise the last label is.
    struct TestList;

    impl PublicSuffixList for TestList {
        fn public_suffix(&self, domain: &str) -> Option<String> {
            if domain == "co.uk" || domain.ends_with(".co.uk") {
                Some("co.uk".to_owned())
            } else {
                Some(last_label(domain).to_owned())
            }
        }

        fn description(&self) -> String {
            "two-rule test list".to_owned()
        }
    }

    fn with_list() -> Policy {
        Policy::new(Some(Box::new(TestList)))
    }

    fn without_list() -> Policy {
        Policy::new(None)
    }

    #[test_case("www.example.com", "", "www.example.com", true ; "no attribute is host only")]
    #[test_case("www.example.com", "www.example.com", "www.example.com", false ; "attribute equal to host")]
    #[test_case("www.example.com", "example.com", "example.com", false ; "parent domain")]
    #[test_case("www.example.com", ".example.com", "example.com", false ; "leading dot stripped")]
    #[test_case("www.example.com", "EXAMPLE.com", "example.com", false ; "attribute lowercased")]
    #[test_case("www.bbc.co.uk", "bbc.co.uk", "bbc.co.uk", false ; "registrable domain")]
    #[test_case("co.uk", "co.uk", "co.uk", true ; "host cookie on public suffix")]
    #[test_case("127.0.0.1", "127.0.0.1", "127.0.0.1", true ; "ip equal to host is host only")]
    fn accepted(host: &str, attr: &str, domain: &str, host_only: bool) {
        let got = with_list().domain_and_type(host, attr).unwrap();
        assert_eq!(got, (domain.to_owned(), host_only));
    }

    #[test_case("www.example.com", "." ; "single dot")]
    #[test_case("www.example.com", "..." ; "all dots")]
    #[test_case("www.example.com", "..example.com" ; "double leading dot")]
    #[test_case("www.example.com", "example.com." ; "trailing dot")]
    fn malformed(host: &str, attr: &str) {
        assert!(matches!(
            with_list().domain_and_type(host, attr),
            Err(Error::MalformedDomain)
        ));
    }

    #[test_case("www.example.com", "other.com" ; "unrelated domain")]
    #[test_case("example.com", "www.example.com" ; "subdomain of host")]
    #[test_case("www.bbc.co.uk", "co.uk" ; "public suffix")]
    #[test_case("www.bbc.co.uk", ".co.uk" ; "dotted public suffix")]
    #[test_case("127.0.0.1", "0.0.1" ; "ip fragment")]
    #[test_case("127.0.0.1", "127.0.0.2" ; "other ip")]
    fn illegal(host: &str, attr: &str) {
        assert!(matches!(
            with_list().domain_and_type(host, attr),
            Err(Error::IllegalDomain)
        ));
    }

    #[test]
    fn ip_subdomain_scoping_has_no_hostname() {
        assert!(matches!(
            with_list().domain_and_type("127.0.0.1", ".127.0.0.1"),
            Err(Error::NoHostname)
        ));
    }

    #[test]
    fn single_label_is_suffix_without_list() {
        // Degraded mode treats "com" as a public suffix.
        assert!(matches!(
            without_list().domain_and_type("www.example.com", "com"),
            Err(Error::IllegalDomain)
        ));
        assert!(without_list()
            .domain_and_type("www.example.com", "example.com")
            .is_ok());
    }

    #[test_case("www.bbc.co.uk", "bbc.co.uk" ; "below two rule suffix")]
    #[test_case("bbc.co.uk", "bbc.co.uk" ; "registrable itself")]
    #[test_case("co.uk", "co.uk" ; "suffix itself")]
    #[test_case("a.b.example.com", "example.com" ; "below one rule suffix")]
    #[test_case("127.0.0.1", "127.0.0.1" ; "ipv4")]
    #[test_case("::1", "::1" ; "ipv6")]
    fn bucket_keys(host: &str, key: &str) {
        assert_eq!(with_list().bucket_key(host), key);
    }

    #[test]
    fn bucket_keys_without_list() {
        let policy = without_list();

        assert_eq!(policy.bucket_key("www.example.com"), "example.com");
        assert_eq!(policy.bucket_key("example.com"), "example.com");
        assert_eq!(policy.bucket_key("localhost"), "localhost");
    }

    #[test]
    fn list_description_is_surfaced() {
        assert_eq!(
            with_list().psl_description().as_deref(),
            Some("two-rule test list")
        );
        assert!(without_list().psl_description().is_none());
    }
}
