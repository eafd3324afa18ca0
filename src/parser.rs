use crate::ast::*;
use crate::error::{Error, Result};
use crate::tokenizer::{Token, TokenKind};
use crate::{ColumnDef, DataType, Value};

/// Recursive-descent parser turning one statement's tokens into a [Statement].
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Creates a parser over the tokenizer's output. A missing trailing
    /// [TokenKind::Eof] is added so the cursor never runs past the end.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let position = tokens.last().map_or(0, |t| t.position + 1);
            tokens.push(Token {
                kind: TokenKind::Eof,
                position,
            });
        }
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parses exactly one statement, optionally followed by `;`.
    ///
    /// # Errors
    /// Returns a parse error naming the expected token, the token found and
    /// its position on the first mismatch.
    pub fn parse(&mut self) -> Result<Statement> {
        let statement = match self.current_token() {
            TokenKind::Create => self.parse_create_table(),
            TokenKind::Insert => self.parse_insert(),
            TokenKind::Select => self.parse_select(),
            TokenKind::Update => self.parse_update(),
            TokenKind::Delete => self.parse_delete(),
            _ => Err(self.unexpected("CREATE, INSERT, SELECT, UPDATE or DELETE")),
        }?;

        // semicolon is optional so skip it
        if matches!(self.current_token(), TokenKind::Semicolon) {
            self.advance();
        }

        // Check we are at the end of the statement
        if !self.is_at_end() {
            return Err(self.unexpected("end of input"));
        }

        Ok(statement)
    }

    //helpers
    fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn current_token(&self) -> &TokenKind {
        &self.current().kind
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), TokenKind::Eof)
    }

    fn unexpected(&self, expected: &str) -> Error {
        let token = self.current();
        Error::parse(expected, &token.kind, token.position)
    }

    fn consume(&mut self, expected: TokenKind) -> Result<()> {
        if *self.current_token() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    /// Consumes the token if it matches, reporting whether it did.
    fn consume_if(&mut self, expected: TokenKind) -> bool {
        if *self.current_token() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_ident(&mut self) -> Result<String> {
        match self.current_token() {
            TokenKind::Ident(string) => {
                let string = string.clone(); // Get the name
                self.advance();
                Ok(string)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Comma-separated list of one or more identifiers.
    fn parse_ident_list(&mut self) -> Result<Vec<String>> {
        let mut names = vec![self.consume_ident()?];
        while self.consume_if(TokenKind::Comma) {
            names.push(self.consume_ident()?);
        }
        Ok(names)
    }

    fn parse_literal(&mut self) -> Result<Value> {
        let value = match self.current_token() {
            TokenKind::Number(n) => Value::Int(*n),
            TokenKind::String(s) => Value::from(s.as_str()),
            TokenKind::True => Value::Bool(true),
            TokenKind::False => Value::Bool(false),
            _ => return Err(self.unexpected("literal")),
        };
        self.advance();
        Ok(value)
    }

    fn consume_data_type(&mut self) -> Result<DataType> {
        match self.current_token() {
            TokenKind::Int => {
                self.advance();
                Ok(DataType::Int)
            }
            TokenKind::Boolean => {
                self.advance();
                Ok(DataType::Bool)
            }
            TokenKind::Varchar => {
                self.advance();
                self.consume(TokenKind::LeftParen)?;
                let len = match self.current_token() {
                    TokenKind::Number(n) if *n > 0 => *n as usize,
                    _ => return Err(self.unexpected("positive VARCHAR length")),
                };
                self.advance();
                self.consume(TokenKind::RightParen)?;
                Ok(DataType::Varchar(len))
            }
            _ => Err(self.unexpected("column type")),
        }
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.consume_ident()?;

        let data_type = self.consume_data_type()?;

        Ok(ColumnDef { name, data_type })
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Create)?; // advance if CREATE
        self.consume(TokenKind::Table)?; // advance if TABLE
        let name = self.consume_ident()?;
        self.consume(TokenKind::LeftParen)?;
        let mut columns = vec![];
        loop {
            columns.push(self.parse_column_def()?);
            match self.current_token() {
                TokenKind::RightParen => {
                    self.advance();
                    break;
                }
                TokenKind::Comma => {
                    self.advance();
                    continue;
                }
                _ => return Err(self.unexpected("',' or ')'")),
            }
        }
        Ok(Statement::CreateTable(CreateTable { name, columns }))
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Insert)?;
        self.consume(TokenKind::Into)?;
        let table = self.consume_ident()?;

        let columns = if self.consume_if(TokenKind::LeftParen) {
            let names = self.parse_ident_list()?;
            self.consume(TokenKind::RightParen)?;
            Some(names)
        } else {
            None
        };

        self.consume(TokenKind::Values)?;
        let mut rows = Vec::new();
        loop {
            self.consume(TokenKind::LeftParen)?;
            let mut row = vec![self.parse_literal()?];
            while self.consume_if(TokenKind::Comma) {
                row.push(self.parse_literal()?);
            }
            self.consume(TokenKind::RightParen)?;
            rows.push(row);

            if !self.consume_if(TokenKind::Comma) {
                break;
            }
        }

        Ok(Statement::InsertInto(InsertInto {
            table,
            columns,
            rows,
        }))
    }

    fn parse_select(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Select)?;

        let columns = if self.consume_if(TokenKind::Star) {
            ColumnsSelect::Star
        } else {
            ColumnsSelect::ColumnsNames(self.parse_ident_list()?)
        };

        self.consume(TokenKind::From)?;
        let table = self.consume_ident()?;

        // Clause order is fixed: WHERE, ORDER BY, LIMIT. Anything else is
        // left for `parse` to reject as trailing input.
        let where_clause = self.parse_where()?;

        let order_by = if self.consume_if(TokenKind::Order) {
            self.consume(TokenKind::By)?;
            Some(self.consume_ident()?)
        } else {
            None
        };

        let limit = if self.consume_if(TokenKind::Limit) {
            match self.current_token() {
                TokenKind::Number(n) if *n >= 0 => {
                    let n = *n as usize;
                    self.advance();
                    Some(n)
                }
                _ => return Err(self.unexpected("non-negative LIMIT")),
            }
        } else {
            None
        };

        Ok(Statement::Select(Select {
            columns,
            table,
            where_clause,
            order_by,
            limit,
        }))
    }

    fn parse_update(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Update)?;
        let table = self.consume_ident()?;
        self.consume(TokenKind::Set)?;

        let mut assignments: Vec<(String, Value)> = Vec::new();
        loop {
            let position = self.current().position;
            let column = self.consume_ident()?;
            if assignments.iter().any(|(c, _)| *c == column) {
                return Err(Error::parse(
                    "column assigned once",
                    TokenKind::Ident(column),
                    position,
                ));
            }
            self.consume(TokenKind::Equal)?;
            let value = self.parse_literal()?;
            assignments.push((column, value));

            if !self.consume_if(TokenKind::Comma) {
                break;
            }
        }

        let where_clause = self.parse_where()?;

        Ok(Statement::Update(Update {
            table,
            assignments,
            where_clause,
        }))
    }

    fn parse_delete(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Delete)?;
        self.consume(TokenKind::From)?;
        let table = self.consume_ident()?;
        let where_clause = self.parse_where()?;

        Ok(Statement::Delete(Delete {
            table,
            where_clause,
        }))
    }

    /// Parses an optional `WHERE cond (AND|OR cond)*` clause. The first
    /// connective fixes the one allowed for the rest of the clause.
    fn parse_where(&mut self) -> Result<Option<WhereClause>> {
        if !self.consume_if(TokenKind::Where) {
            return Ok(None);
        }

        let mut conditions = vec![self.parse_condition()?];
        let mut connective = None;

        loop {
            let next = match self.current_token() {
                TokenKind::And => Connective::And,
                TokenKind::Or => Connective::Or,
                _ => break,
            };
            if connective.is_some_and(|c| c != next) {
                return Err(Error::MixedConnectives {
                    position: self.current().position,
                });
            }
            connective = Some(next);
            self.advance();
            conditions.push(self.parse_condition()?);
        }

        Ok(Some(WhereClause {
            conditions,
            // a single condition has no connective; AND keeps the same meaning
            connective: connective.unwrap_or(Connective::And),
        }))
    }

    fn parse_condition(&mut self) -> Result<Condition> {
        let column = self.consume_ident()?;
        let op = match self.current_token() {
            TokenKind::Equal => ComparisonOp::Eq,
            TokenKind::NotEqual => ComparisonOp::NotEq,
            TokenKind::Less => ComparisonOp::Lt,
            TokenKind::LessEqual => ComparisonOp::LtEq,
            TokenKind::Greater => ComparisonOp::Gt,
            TokenKind::GreaterEqual => ComparisonOp::GtEq,
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.advance();
        let value = self.parse_literal()?;

        Ok(Condition { column, op, value })
    }
}

/// Tokenizes and parses one SQL statement.
pub fn parse_sql(sql: &str) -> Result<Statement> {
    let tokens = crate::tokenizer::Tokenizer::new(sql).tokenize()?;
    Parser::new(tokens).parse()
}
