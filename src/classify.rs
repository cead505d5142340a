use std::collections::BTreeMap;
use std::fmt;

pub const POLICY_KEY_PREFIXES: [&str; 2] = ["IAM_POLICY_", "iamPolicy"];
pub const SECRET_VALUE_PREFIX: &str = "secret://";

/// Secret material taken from a `secret://` value, prefix already stripped.
///
/// `Debug` is redacted and there is no `Serialize`, so the plaintext only
/// leaves through `expose`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        return Self(value.into());
    }

    pub fn expose(&self) -> &str {
        return &self.0;
    }

    /// The configuration value this secret was read from.
    pub fn to_reference_string(&self) -> String {
        return format!("{}{}", SECRET_VALUE_PREFIX, self.0);
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classified {
    pub plain: BTreeMap<String, String>,
    pub secret: BTreeMap<String, SecretValue>,
    pub policy: BTreeMap<String, String>,
}

pub fn is_policy_key(key: &str) -> bool {
    return POLICY_KEY_PREFIXES
        .iter()
        .any(|prefix| key.starts_with(prefix));
}

/// First pass: split off policy entries by key. Returns `(policy, rest)`.
pub fn partition_policy(
    entries: BTreeMap<String, String>,
) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    return entries.into_iter().partition(|(key, _)| is_policy_key(key));
}

/// Second pass: split what is left by value. Returns `(secret, plain)`.
pub fn partition_secrets(
    entries: BTreeMap<String, String>,
) -> (BTreeMap<String, SecretValue>, BTreeMap<String, String>) {
    let mut secret = BTreeMap::new();
    let mut plain = BTreeMap::new();
    for (key, value) in entries {
        match value.strip_prefix(SECRET_VALUE_PREFIX) {
            Some(stripped) => {
                secret.insert(key, SecretValue::new(stripped));
            }
            None => {
                plain.insert(key, value);
            }
        }
    }

    return (secret, plain);
}

/// Key prefixes are checked before value prefixes, so a policy key is never
/// looked at as a secret.
pub fn classify_configuration(entries: BTreeMap<String, String>) -> Classified {
    let (policy, rest) = partition_policy(entries);
    let (secret, plain) = partition_secrets(rest);

    return Classified {
        plain,
        secret,
        policy,
    };
}
