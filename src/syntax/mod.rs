pub mod erase;
pub mod lexer;
pub mod statements;

pub use erase::{erase, erase_with, EraseOptions};
pub use lexer::LexError;
pub use statements::{parse_source, single_return_expression, SourceUnit, Statement, StatementKind};
