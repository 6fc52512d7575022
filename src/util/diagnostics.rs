use std::fmt::{Display, Formatter};

use super::{DiagLevel, Diagnostic, Diagnostics};

impl Display for DiagLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagLevel::Warning => write!(f, "warning"),
            DiagLevel::Error => write!(f, "error"),
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.level, self.message)
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.messages.push(Diagnostic {
            level: DiagLevel::Warning,
            message: message.into(),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.messages.push(Diagnostic {
            level: DiagLevel::Error,
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|d| d.level == DiagLevel::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    /// Appends every message from `other` in order, leaving `other` empty.
    /// Used to fold a stage's local diagnostics into the pipeline's running
    /// list without losing emission order across stages.
    pub fn extend(&mut self, other: &mut Diagnostics) {
        self.messages.append(&mut other.messages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_errors_only_true_with_an_error_message() {
        let mut d = Diagnostics::new();
        assert!(!d.has_errors());
        d.warn("just a warning");
        assert!(!d.has_errors());
        d.error("now an error");
        assert!(d.has_errors());
    }

    #[test]
    fn extend_preserves_order_and_drains_source() {
        let mut a = Diagnostics::new();
        a.warn("first");
        let mut b = Diagnostics::new();
        b.warn("second");
        a.extend(&mut b);
        let msgs: Vec<_> = a.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(msgs, vec!["first", "second"]);
        assert!(b.is_empty());
    }
}
