use serde_json::Value;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("Malformed policy `{key}`: {reason}")]
pub struct MalformedPolicyError {
    pub key: String,
    pub reason: String,
}

/// A policy-bucket entry as it was configured. The document stays opaque
/// until the backend asks for its statements.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicySource {
    pub key: String,
    pub document: String,
}

impl PolicySource {
    pub fn new(key: impl Into<String>, document: impl Into<String>) -> Self {
        return Self {
            key: key.into(),
            document: document.into(),
        };
    }

    /// Statements to grant to the task role. The document must be an object
    /// with a `Statement` array of objects.
    pub fn statements(&self) -> Result<Vec<Value>, MalformedPolicyError> {
        let document: Value = match serde_json::from_str(&self.document) {
            Ok(document) => document,
            Err(error) => return Err(self.malformed(error.to_string())),
        };

        let statements = match document.get("Statement") {
            Some(Value::Array(statements)) => statements,
            Some(_) => return Err(self.malformed("`Statement` is not an array")),
            None => return Err(self.malformed("missing `Statement`")),
        };

        if let Some(index) = statements.iter().position(|statement| !statement.is_object()) {
            return Err(self.malformed(format!("statement {} is not an object", index)));
        }

        return Ok(statements.clone());
    }

    fn malformed(&self, reason: impl Into<String>) -> MalformedPolicyError {
        return MalformedPolicyError {
            key: self.key.clone(),
            reason: reason.into(),
        };
    }
}
