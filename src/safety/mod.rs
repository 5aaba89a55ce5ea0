pub mod confirmation;
pub mod policy;
pub mod risk;
pub mod validator;

pub use confirmation::apply_confirmation;
pub use policy::{
    check_write_volume, confine, deny_if_sensitive, deny_option_like, partition_sensitive,
    scan_forbidden_arguments, PolicyViolation, FORBIDDEN_FRAGMENTS, MAX_WRITE_STEPS,
    SENSITIVE_BASENAMES,
};
pub use risk::{assess, Assessment};
pub use validator::{is_write_capability, preflight_policy, validate, WRITE_CAPABILITIES};
