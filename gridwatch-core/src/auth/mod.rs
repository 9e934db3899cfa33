// =============================================================================
// gridwatch-core/src/auth/mod.rs
// =============================================================================

pub mod token_cache;

pub use token_cache::TokenCache;
