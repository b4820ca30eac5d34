pub mod epsilon;
pub mod error;
pub mod follow;
pub mod grammar;
pub mod item;
pub mod parser;
pub mod stack;
pub mod symbol;
pub mod table;
pub mod token;
pub mod tree;

pub use epsilon::eliminate_epsilon;
pub use error::Error;
pub use grammar::{Grammar, Labels, RawRule, Rule};
pub use item::{Family, Item, ItemSet};
pub use parser::{AcceptAll, MatchMode, ParseRun, Parser, ParserConfig, ReduceValidator, Reduction};
pub use symbol::{AUGMENTED_START, END, Symbol};
pub use table::{Action, Table};
pub use token::Token;
pub use tree::SyntaxTree;
