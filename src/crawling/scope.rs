//! Target-domain predicate

use url::Url;

use crate::infrastructure::config::ScopeSettings;

/// Decides whether a URL belongs to the site being scraped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetScope {
    allowed_hosts: Vec<String>,
}

impl TargetScope {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn from_settings(settings: &ScopeSettings) -> Self {
        Self::new(&settings.allowed_hosts)
    }

    /// Accepts iff the URL parses and its host exactly matches an allowed host
    pub fn is_target(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
            .is_some_and(|host| self.allowed_hosts.iter().any(|allowed| *allowed == host))
    }

    pub fn allowed_hosts(&self) -> &[String] {
        &self.allowed_hosts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://example.com/tyre/1", true)]
    #[case("http://EXAMPLE.com/tyre/2?x=1", true)]
    #[case("https://example.com:8443/tyre/3", true)]
    #[case("https://other.com/x", false)]
    #[case("https://shop.example.com/x", false)]
    #[case("https://example.com.evil.test/x", false)]
    #[case("not a url", false)]
    #[case("", false)]
    fn exact_host_match(#[case] url: &str, #[case] expected: bool) {
        let scope = TargetScope::new(["example.com"]);
        assert_eq!(scope.is_target(url), expected);
    }

    #[test]
    fn blank_hosts_are_ignored() {
        let scope = TargetScope::new(["  ", "www.tyremarket.ae"]);
        assert_eq!(scope.allowed_hosts(), &["www.tyremarket.ae".to_string()]);
    }
}
