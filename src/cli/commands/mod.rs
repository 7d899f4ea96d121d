pub mod provision;

pub use provision::{print_summary, ProvisionCommand, ProvisioningInputs, UsageError};
