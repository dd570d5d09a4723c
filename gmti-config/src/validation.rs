//! Non-fatal findings gathered while loading console settings.

/// One rejected or adjusted setting. The loader keeps going and the caller
/// decides how loudly to report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }

    /// Emit every warning through `tracing`.
    pub fn log(&self) {
        for warning in &self.items {
            match &warning.hint {
                Some(hint) => {
                    tracing::warn!(hint = %hint, "{}", warning.message)
                }
                None => tracing::warn!("{}", warning.message),
            }
        }
    }
}

/// Parse a millisecond setting, rejecting zero and garbage.
///
/// Returns `None` and records a warning when the raw value is unusable.
pub(crate) fn parse_millis(
    key: &str,
    raw: &str,
    warnings: &mut ConfigWarnings,
) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) => {
            warnings.push_with_hint(
                format!("{key} must be greater than zero; keeping default"),
                format!(
                    "Unset {key} or give it a positive number of milliseconds"
                ),
            );
            None
        }
        Ok(value) => Some(value),
        Err(_) => {
            warnings.push_with_hint(
                format!(
                    "{key}='{raw}' is not a number of milliseconds; \
                     keeping default"
                ),
                format!("Unset {key} or give it a positive integer"),
            );
            None
        }
    }
}
