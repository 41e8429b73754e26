//! Abstract path templates such as `/items/{0}/{1}/`.
//!
//! Each `{N}` matches one non-empty path segment (no `/`); everything else
//! in the template matches literally. The template is anchored at both
//! ends, so `/items/{0}/` does not match `/items/1/reviews/`.

use regex::Regex;
use std::sync::OnceLock;

static POSITIONAL_REGEX: OnceLock<Regex> = OnceLock::new();

fn positional_regex() -> &'static Regex {
    POSITIONAL_REGEX.get_or_init(|| Regex::new(r"\{\d+\}").unwrap())
}

/// A compiled abstract path template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    regex: Regex,
}

impl PathPattern {
    pub fn compile(template: &str) -> Result<Self, regex::Error> {
        let mut pattern = String::with_capacity(template.len() + 16);
        pattern.push('^');
        let mut last = 0;
        for placeholder in positional_regex().find_iter(template) {
            pattern.push_str(&regex::escape(&template[last..placeholder.start()]));
            pattern.push_str("([^/]+)");
            last = placeholder.end();
        }
        pattern.push_str(&regex::escape(&template[last..]));
        pattern.push('$');

        Ok(Self {
            regex: Regex::new(&pattern)?,
        })
    }

    /// Captured segments in order of appearance, or `None` if `path` does not
    /// match.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        self.regex.captures(path).map(|caps| {
            caps.iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect()
        })
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}
