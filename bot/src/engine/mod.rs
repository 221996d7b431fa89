pub mod case_locks;
pub mod escalation;
pub mod guild;
pub mod guild_store;
pub mod model;
pub mod overwrites;
pub mod permissions;
pub mod validation;
