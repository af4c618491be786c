use rand::seq::IndexedRandom;
use std::env;
use std::fmt;

use crate::error::GenerationError;

const KEY_PREFIX: &str = "GEMINI_API_KEY";

#[derive(Clone)]
pub struct Credential {
    pub name: String,
    secret: String,
}

impl Credential {
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("secret", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
}

impl CredentialPool {
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self { credentials }
    }

    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Collects `GEMINI_API_KEY` and `GEMINI_API_KEY_<n>` values, ordered by
    /// suffix. Blank values are ignored.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut found: Vec<(u32, Credential)> = Vec::new();
        for (name, value) in vars {
            let secret = value.trim();
            if secret.is_empty() {
                continue;
            }
            let order = if name == KEY_PREFIX {
                0
            } else {
                let Some(suffix) = name
                    .strip_prefix(KEY_PREFIX)
                    .and_then(|rest| rest.strip_prefix('_'))
                else {
                    continue;
                };
                match suffix.parse::<u32>() {
                    Ok(n) => n,
                    Err(_) => continue,
                }
            };
            found.push((order, Credential::new(name, secret)));
        }
        found.sort_by_key(|(order, _)| *order);
        Self::new(found.into_iter().map(|(_, c)| c).collect())
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Uniform random pick. Successive calls are independent, so a retry may
    /// land on the credential that just failed.
    pub fn next(&self) -> Result<&Credential, GenerationError> {
        self.credentials
            .choose(&mut rand::rng())
            .ok_or(GenerationError::Configuration)
    }
}
