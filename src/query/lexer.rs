use super::parser::{AggregateFunc, CompareOp};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // 키워드
    Select, // SELECT
    From,   // FROM
    Where,  // WHERE
    And,    // AND
    Or,     // OR
    // 선택 목록
    Star, // *
    Aggregate {
        func: AggregateFunc,
        arg: String,
    },
    // 조건식, 예: C_CUSTKEY=525
    Compare {
        left: String,
        op: CompareOp,
        right: String,
    },
    // 식별자
    Ident(String),
}

/// Splits a query on whitespace and classifies each word on its own.
/// Identifiers are never quoted, so one word is always one token.
pub struct Lexer<'a> {
    src: VecDeque<&'a str>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src: src.split_whitespace().collect(),
        }
    }

    pub fn finished(&self) -> bool {
        self.src.is_empty()
    }

    pub fn next(&mut self) -> Option<Token> {
        let word = self.src.pop_front()?;
        Some(Self::classify(word))
    }

    fn classify(word: &str) -> Token {
        match word.to_uppercase().as_str() {
            "SELECT" => return Token::Select,
            "FROM" => return Token::From,
            "WHERE" => return Token::Where,
            "AND" => return Token::And,
            "OR" => return Token::Or,
            _ => {}
        }
        if let Some(token) = Self::lex_compare(word) {
            return token;
        }
        let word = word.strip_suffix(',').unwrap_or(word);
        if word == "*" {
            return Token::Star;
        }
        if let Some(token) = Self::lex_aggregate(word) {
            return token;
        }
        Token::Ident(word.to_string())
    }

    // `>=` and `<=` are checked before `>`/`<`/`=` so they are not split early
    fn lex_compare(word: &str) -> Option<Token> {
        CompareOp::ALL.iter().find_map(|op| {
            word.split_once(op.symbol()).map(|(left, right)| Token::Compare {
                left: left.to_string(),
                op: *op,
                right: right.to_string(),
            })
        })
    }

    fn lex_aggregate(word: &str) -> Option<Token> {
        let lower = word.to_lowercase();
        AggregateFunc::ALL.iter().find_map(|func| {
            let prefix_len = func.name().len() + 1;
            if !lower.starts_with(&format!("{}(", func.name())) || !word.ends_with(')') {
                return None;
            }
            let arg = word.get(prefix_len..word.len() - 1)?;
            Some(Token::Aggregate {
                func: *func,
                arg: arg.to_string(),
            })
        })
    }
}
