//! IAB consent predicate.

pub trait ConsentManager: Send + Sync {
    fn is_iab_consented(&self, iab_id: i32, consent_string: &str) -> bool;
}

/// Used until the host supplies a real TCF evaluator. Never reports consent.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConsentManager;

impl ConsentManager for NullConsentManager {
    fn is_iab_consented(&self, _iab_id: i32, _consent_string: &str) -> bool {
        false
    }
}
