//! Kubegrade Parse - manifest decoding
//!
//! Turns named YAML inputs into the typed `ObjectSet` the scoring engine
//! consumes:
//! - multi-document splitting with per-document line numbers
//! - Helm `# Source:` attribution for rendered chart output
//! - typed decoding through k8s-openapi, metadata-only fallback for
//!   unknown kinds
//! - skip expressions for excluding whole documents

pub mod error;
pub mod parser;
pub mod skip;

pub use error::ParseError;
pub use parser::{NamedSource, Parser};
pub use skip::SkipExpression;
