// Directory commands: apply, diff
pub mod declarative;

// Offline input checks
pub mod validate;
