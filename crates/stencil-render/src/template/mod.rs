//! Template sources and the template registry.
//!
//! Templates are loaded from [`TemplateSource`]s into one [`Templates`]
//! registry. All templates in a registry share the same delimiters and the
//! same [`FunctionRegistry`](crate::funcs::FunctionRegistry), and are
//! rendered against the same variables.
//!
//! ```text
//! sources ──load──► Templates { names: [a, b, c], exclude, separator }
//!                        │
//!                        ├── render(exclude, separator, out)  a | b | c
//!                        └── render_to_dir(exclude, dir)      dir/a, dir/b, dir/c
//! ```
//!
//! Template text uses MiniJinja syntax with configurable variable
//! delimiters. Missing variables render as empty text.

mod registry;
mod source;

pub use registry::{Delimiters, Templates};
pub use source::{TemplateSource, TemplateSourceKind};
