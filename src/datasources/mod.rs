//! Data source handlers: read-only lookups by natural key.

pub mod backup_retention_policy;
pub mod environment;
pub mod stack;

pub use backup_retention_policy::BackupRetentionPolicyDataSource;
pub use environment::EnvironmentDataSource;
pub use stack::StackDataSource;
