use std::io::{self, Read};

use bumpalo::Bump;
use clap::Parser as _;
use glr_analysis::*;
use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, fmt, layer::SubscriberExt, registry, util::SubscriberInitExt};

/// 从标准输入读取箭头形式的文法, 输出 LR(0) 项集族和分析表, 并用 GLR 分析给定的 tokens.
#[derive(clap::Parser)]
struct AppArgs {
    /// 文法的起始符.
    #[clap(short, long)]
    start: String,
    /// 以空格分隔的 tokens, 每个形如 `n` 或者 `n:dog` (终结符:值), 末尾自动补上 `$`.
    #[clap(short, long)]
    tokens: Option<String>,
    /// 输出输入中所有能归约为起始符的片段, 而不是要求整个输入是一个句子.
    #[clap(short, long)]
    partial: bool,
    /// 输出分析过程的日志.
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = AppArgs::parse();
    let layer = fmt::layer()
        .without_time()
        .with_writer(io::stderr)
        .with_filter(if args.verbose {
            LevelFilter::TRACE
        } else {
            LevelFilter::WARN
        });
    registry().with(layer).init();

    let mut inp = String::new();
    io::stdin().read_to_string(&mut inp)?;
    let bump = Bump::new();
    let grammar = Grammar::with_epsilon_elimination(RawRule::from_cfg(&inp)?, &args.start, &bump)?;
    print!("{grammar}");
    println!();
    let config = ParserConfig {
        mode: if args.partial {
            MatchMode::Partial
        } else {
            MatchMode::Full
        },
    };
    let parser = Parser::with_config(&grammar, config);
    print!("{}", parser.family().format(&grammar));
    println!();
    println!("--- Table ---");
    println!("{}", parser.table().to_markdown());

    let Some(tokens) = &args.tokens else {
        return Ok(());
    };
    let input: Vec<Token> = tokens
        .split_whitespace()
        .map(|t| match t.split_once(':') {
            Some((symbol, value)) => Token::new(symbol, value),
            None => Token::from(t),
        })
        .chain(std::iter::once(Token::end()))
        .collect();
    let trees = parser.parse(input);
    if trees.is_empty() {
        warn!("input rejected");
    }
    for (i, tree) in trees.iter().enumerate() {
        println!();
        println!("--- Tree {} (weight {}) ---", i + 1, tree.weight(&grammar));
        print!("{tree}");
    }
    Ok(())
}
