#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum Error {
    #[error("Error parsing productions, line: {line}, cause: {cause:?}.")]
    ParseProductionError {
        line: usize,
        cause: ParseProductionError,
    },
    #[error("Production of {left} has an empty tail, epsilon rules must be eliminated first.")]
    EmptyRightHandSide { left: String },
    #[error("Grammar does not define the non-terminal: {0}.")]
    UndefinedNonTerminal(String),
    #[error("Symbol {0} is reserved by the parser.")]
    ReservedSymbol(String),
    #[error("Production of {left} has {labels} label maps for {symbols} tail symbols.")]
    LabelArity {
        left: String,
        labels: usize,
        symbols: usize,
    },
    #[error("Production of {left} has an invalid weight: {weight}.")]
    InvalidWeight { left: String, weight: String },
    #[error("Epsilon rules left after elimination: {0:?}, this should not present.")]
    EpsilonEliminationBug(Vec<String>),
}

#[derive(thiserror::Error, Debug, Eq, PartialEq)]
pub enum ParseProductionError {
    #[error("No arrow in production line")]
    NoArrow,
    #[error("Empty production head")]
    EmptyHead,
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
}

impl Error {
    pub(crate) fn parse_production_error(line: usize, cause: ParseProductionError) -> Self {
        Self::ParseProductionError { line, cause }
    }
}
