//! Authorization: rule shapes, claims context, token decoding and the
//! predicate compiler.

pub mod compiler;
pub mod context;
pub mod jwt;
pub mod rules;

pub use compiler::compile_rules;
pub use context::AuthContext;
pub use jwt::{AuthError, JwtDecoder, VerificationPolicy};
pub use rules::{AuthOperation, AuthRule, RulePredicate};
