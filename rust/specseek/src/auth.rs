use specquery::models::SpectrumCategory;

/// Write-permission check consumed by the engine before any mutation.
///
/// The engine only asks yes/no; policy (users, projects, sessions)
/// lives entirely on the other side of this trait.
pub trait Authorizer: Send + Sync {
    fn can_write(&self, identity: &str, category: SpectrumCategory) -> bool;
}

/// Permits everything. The right choice for single-user tools and
/// tests; servers plug in their own policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn can_write(&self, _identity: &str, _category: SpectrumCategory) -> bool {
        true
    }
}

/// Rejects everything. Handy for read-only deployments.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

impl Authorizer for DenyAll {
    fn can_write(&self, _identity: &str, _category: SpectrumCategory) -> bool {
        false
    }
}
