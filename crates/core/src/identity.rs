//! Resolving a verified user identity to mart rows by email.
//!
//! An identity containing `@` matches rows whose email equals it, or whose
//! email matches the pattern `<identity>@%`. A bare username or subject id
//! only matches `<identity>@%`.

/// Email predicate for one identity, expressed as SQL `LIKE` parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityFilter {
    identity: String,
    exact: Option<String>,
    pattern: String,
}

impl IdentityFilter {
    pub fn new(identity: impl Into<String>) -> Self {
        let identity = identity.into();
        let exact = identity.contains('@').then(|| identity.clone());
        let pattern = format!("{identity}@%");

        Self {
            identity,
            exact,
            pattern,
        }
    }

    /// The identity string the filter was built from.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Exact-equality operand, present only for qualified identities.
    pub fn exact(&self) -> Option<&str> {
        self.exact.as_deref()
    }

    /// `LIKE` operand.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, email: &str) -> bool {
        self.exact.as_deref() == Some(email) || like(email, &self.pattern)
    }
}

/// SQL `LIKE`: `%` matches any run of characters, `_` exactly one.
pub fn like(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // Greedy wildcard matching with single-star backtracking.
    let (mut v, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while v < value.len() {
        match pattern.get(p) {
            Some('%') => {
                star = Some((p, v));
                p += 1;
            }
            Some('_') => {
                v += 1;
                p += 1;
            }
            Some(c) if *c == value[v] => {
                v += 1;
                p += 1;
            }
            _ => match star {
                Some((sp, sv)) => {
                    p = sp + 1;
                    v = sv + 1;
                    star = Some((sp, sv + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}
