//! Service definition parsing from raw `.proto` text
//!
//! The compiler's descriptor output drops comments and keeps HTTP rules only
//! as opaque extension bytes, so service blocks are re-read from source:
//!
//! - [`Scanner`] splits characters into raw units,
//! - [`Lexer`] buffers classified tokens and supports rewinding,
//! - [`ServiceParser`] builds the `Service` tree.

mod lexer;
mod parser;
mod scanner;

pub use lexer::{clean_description, strip_comment, Checkpoint, Lexer, Token, TokenKind};
pub use parser::{Bindings, ServiceParser};
pub use scanner::{Scanner, Unit};
