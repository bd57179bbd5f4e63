use crate::error::{CdpError, Result};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

/// How many patches get injected into a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StealthLevel {
    /// Essentials only: webdriver, chrome object and user agent basics
    Minimum,
    /// Everything except patches marked experimental
    #[default]
    Balanced,
    /// All registered patches
    Maximum,
}

impl StealthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StealthLevel::Minimum => "minimum",
            StealthLevel::Balanced => "balanced",
            StealthLevel::Maximum => "maximum",
        }
    }
}

impl std::str::FromStr for StealthLevel {
    type Err = CdpError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "minimum" => Ok(StealthLevel::Minimum),
            "balanced" => Ok(StealthLevel::Balanced),
            "maximum" => Ok(StealthLevel::Maximum),
            other => Err(CdpError::msg(format!(
                "invalid stealth level `{other}`, expected minimum, balanced or maximum"
            ))),
        }
    }
}

/// The browser personality a stealth page presents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StealthProfile {
    level: StealthLevel,
    user_agent: String,
    window_size: (u32, u32),
    languages: Vec<String>,
}

impl Default for StealthProfile {
    fn default() -> Self {
        Self {
            level: StealthLevel::Balanced,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            window_size: (1920, 1080),
            languages: vec!["en-US".to_string(), "en".to_string()],
        }
    }
}

impl StealthProfile {
    pub fn new(level: StealthLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn builder() -> StealthProfileBuilder {
        StealthProfileBuilder::default()
    }

    pub fn level(&self) -> StealthLevel {
        self.level
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    /// The Accept-Language header value matching [`Self::languages`].
    pub fn accept_language(&self) -> String {
        let mut out = String::new();
        for (i, lang) in self.languages.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(lang);
            if i > 0 {
                // descending preference, floored at 0.1
                let q = (10usize.saturating_sub(i)).max(1) as f64 / 10.0;
                out.push_str(&format!(";q={q:.1}"));
            }
        }
        out
    }
}

/// Validating builder for [`StealthProfile`].
#[derive(Debug, Clone, Default)]
pub struct StealthProfileBuilder {
    level: StealthLevel,
    user_agent: Option<String>,
    window_size: Option<(u32, u32)>,
    languages: Option<Vec<String>>,
}

impl StealthProfileBuilder {
    pub fn level(mut self, level: StealthLevel) -> Self {
        self.level = level;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = Some((width, height));
        self
    }

    pub fn languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = Some(languages.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Result<StealthProfile> {
        let defaults = StealthProfile::default();
        let profile = StealthProfile {
            level: self.level,
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            window_size: self.window_size.unwrap_or(defaults.window_size),
            languages: self.languages.unwrap_or(defaults.languages),
        };
        if profile.user_agent.trim().is_empty() {
            return Err(CdpError::msg("user agent must not be empty"));
        }
        let (w, h) = profile.window_size;
        if w == 0 || h == 0 {
            return Err(CdpError::msg("window size must be non-zero"));
        }
        if profile.languages.is_empty() || profile.languages.iter().any(|l| l.trim().is_empty()) {
            return Err(CdpError::msg("languages must be a non-empty list"));
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn default_profile_is_valid() {
        let profile = StealthProfile::default();
        assert_eq!(profile.level(), StealthLevel::Balanced);
        assert!(profile.user_agent().contains("Chrome/"));
        assert_eq!(profile.window_size(), (1920, 1080));
    }

    #[test]
    fn builder_rejects_zero_window() {
        let err = StealthProfile::builder().window_size(0, 1080).build();
        assert!(err.is_err());
    }

    #[test]
    fn builder_rejects_empty_languages() {
        let err = StealthProfile::builder()
            .languages(Vec::<String>::new())
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn level_parses_all_names() {
        assert_eq!(
            StealthLevel::from_str("minimum").unwrap(),
            StealthLevel::Minimum
        );
        assert_eq!(
            StealthLevel::from_str("maximum").unwrap(),
            StealthLevel::Maximum
        );
        assert!(StealthLevel::from_str("paranoid").is_err());
    }

    #[test]
    fn accept_language_ranks_secondary_languages() {
        let profile = StealthProfile::default();
        assert_eq!(profile.accept_language(), "en-US,en;q=0.9");
    }
}
