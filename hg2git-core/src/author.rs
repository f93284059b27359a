use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// `Name <user@host>`, with a non-empty name
static FULL_AUTHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([^<>\s][^<>]*?)\s*<([^<>\s@]+@[^<>\s]+)>\s*$")
        .expect("author pattern is valid")
});

/// Author identity in the form git expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

impl Signature {
    /// Normalize a Mercurial user string.
    ///
    /// `Name <user@host>` is kept, a bare `user@host` gets its local part as
    /// name, and anything else gets a `@localhost` address.
    pub fn from_hg_user(user: &str) -> Self {
        if let Some(caps) = FULL_AUTHOR.captures(user) {
            return Self {
                name: caps[1].to_string(),
                email: caps[2].to_string(),
            };
        }

        let user = user.trim();
        let (name, inner) = match user.find('<') {
            Some(open) => {
                let inner = user[open + 1..].split('>').next().unwrap_or_default();
                (user[..open].trim(), inner.trim())
            }
            None => (user, ""),
        };

        let email = if !inner.is_empty() {
            if inner.contains('@') {
                inner.to_string()
            } else {
                format!("{inner}@localhost")
            }
        } else if name.contains('@') && !name.contains(char::is_whitespace) {
            name.to_string()
        } else {
            format!("{}@localhost", local_part(name))
        };

        let name = if name.is_empty() || name == email {
            email.split('@').next().unwrap_or_default().to_string()
        } else {
            name.to_string()
        };

        Self { name, email }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

fn local_part(name: &str) -> String {
    let joined = name.split_whitespace().collect::<Vec<_>>().join(".");
    if joined.is_empty() {
        "unknown".to_string()
    } else {
        joined
    }
}
