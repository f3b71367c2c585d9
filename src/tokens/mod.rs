//! Design tokens: layered sources, the value model and resolution.
//!
//! A build loads several [`TokenLayer`]s (core, org, channel, ...), merges
//! them leaf by leaf and resolves `{a.b}` references:
//!
//! ```
//! use stylestack::tokens::{LayerKind, ResolutionContext, TokenLayer, TokenResolver};
//!
//! let core = TokenLayer::from_json_str(
//!     "core",
//!     LayerKind::Core,
//!     r##"{"colors": {"primary": "#0066CC"}, "typography": {"color": "{colors.primary}"}}"##,
//! )?;
//! let tokens = TokenResolver::new().resolve_flat(&[core], &ResolutionContext::new())?;
//! assert_eq!(tokens.get_str("typography.color"), Some("#0066CC"));
//! # Ok::<(), stylestack::Error>(())
//! ```

pub mod context;
pub mod layer;
pub mod resolved;
pub mod resolver;
pub mod value;

pub use context::ResolutionContext;
pub use layer::{LayerFormat, LayerKind, TokenLayer};
pub use resolved::{ResolvedTokenSet, ResolvedTokens};
pub use resolver::TokenResolver;
pub use value::{Conditional, Predicate, Scalar, TokenValue};
