//! Signature contexts.

/// Context attached to newly created signatures.
#[derive(Debug, Clone)]
pub(crate) struct SigningContext {
    pub(crate) value: String,
    pub(crate) critical: bool,
}

impl SigningContext {
    pub(crate) const fn new(value: String, critical: bool) -> Self {
        Self { value, critical }
    }
}

/// Context a verifier expects signatures to carry.
#[derive(Debug, Clone)]
pub(crate) struct VerificationContext {
    pub(crate) value: String,
    pub(crate) required: bool,
    /// Unix milliseconds; `<= 0` means "always".
    pub(crate) required_after_millis: i64,
}

impl VerificationContext {
    pub(crate) const fn new(value: String, required: bool, required_after_millis: i64) -> Self {
        Self {
            value,
            required,
            required_after_millis,
        }
    }

    /// Whether a signature created at `created` (unix seconds) must carry
    /// this context.
    pub(crate) const fn required_at(&self, created: i64) -> bool {
        self.required
            && (self.required_after_millis <= 0
                || created.saturating_mul(1000) >= self.required_after_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_after_threshold() {
        let ctx = VerificationContext::new("mail".into(), true, 2_000_000);
        assert!(!ctx.required_at(1_999));
        assert!(ctx.required_at(2_000));
    }

    #[test]
    fn not_required_is_never_required() {
        let ctx = VerificationContext::new("mail".into(), false, 0);
        assert!(!ctx.required_at(i64::MAX));
    }

    #[test]
    fn required_always() {
        let ctx = VerificationContext::new("mail".into(), true, 0);
        assert!(ctx.required_at(0));
    }
}
