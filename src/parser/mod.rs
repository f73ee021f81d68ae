//! Recursive-descent parser over the SQL subset described in §6.
//!
//! Produces the AST in [`crate::ast`] from the token stream
//! [`crate::lexer::SqlLexer`] emits. This front end only has to handle
//! complete statements — there is no interactive completion surface in
//! this crate — so it returns a plain `Result<Statement, TranslateError>`
//! rather than the teacher shell's partial-parse/autocomplete machinery.

mod expr;

use crate::ast::{
    DeleteStatement, JoinClause, OrderByItem, SelectItem, SelectStatement, Statement,
};
use crate::error::{Result, TranslateError};
use crate::lexer::{SqlLexer, Token, TokenKind};

/// Parse a complete SQL statement (`SELECT` or `DELETE`).
pub fn parse_statement(sql: &str) -> Result<Statement> {
    let tokens = SqlLexer::tokenize(sql);
    let mut parser = SqlParser::new(tokens);

    let statement = match parser.peek_kind() {
        Some(TokenKind::Select) => Statement::Select(parser.parse_select()?),
        Some(TokenKind::Delete) => Statement::Delete(parser.parse_delete()?),
        _ => return Err(TranslateError::UnsupportedSql),
    };

    parser.skip_token(&TokenKind::Semicolon);
    if !parser.is_at_eof() {
        return Err(TranslateError::Syntax(
            "unexpected input after statement".to_string(),
        ));
    }

    Ok(statement)
}

pub(crate) struct SqlParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl SqlParser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.advance(); // SELECT

        let distinct = self.match_token(&TokenKind::Distinct);
        let items = self.parse_select_list()?;

        self.expect(&TokenKind::From, "FROM")?;

        if self.peek_kind() == Some(&TokenKind::LParen) {
            return Err(TranslateError::UnsupportedSubselect);
        }
        let from_table = self.expect_ident("table name")?;
        while self.match_token(&TokenKind::Comma) {
            // implicit multi-table FROM without a JOIN keyword
            self.expect_ident("table name")?;
            return Err(TranslateError::UnsupportedJoin);
        }
        let from_alias = self.parse_optional_alias();

        let joins = self.parse_joins()?;

        let where_clause = if self.match_token(&TokenKind::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let group_bys = if self.match_token(&TokenKind::GroupBy) {
            self.parse_dotted_column_list()?
        } else {
            Vec::new()
        };

        let order_bys = if self.match_token(&TokenKind::OrderBy) {
            self.parse_order_by_list()?
        } else {
            Vec::new()
        };

        let limit = if self.match_token(&TokenKind::Limit) {
            Some(self.expect_integer("LIMIT value")?)
        } else {
            None
        };

        let offset = if self.match_token(&TokenKind::Offset) {
            Some(self.expect_integer("OFFSET value")?)
        } else {
            None
        };

        Ok(SelectStatement {
            items,
            from_table,
            from_alias,
            where_clause,
            group_bys,
            order_bys,
            offset,
            limit,
            distinct,
            joins,
        })
    }

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.advance(); // DELETE
        self.expect(&TokenKind::From, "FROM")?;
        let table = self.expect_ident("table name")?;
        let where_clause = if self.match_token(&TokenKind::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(DeleteStatement {
            table,
            where_clause,
        })
    }

    fn parse_select_list(&mut self) -> Result<Vec<SelectItem>> {
        let mut items = Vec::new();
        loop {
            if self.peek_kind() == Some(&TokenKind::Star) {
                self.advance();
                items.push(SelectItem::AllColumns);
            } else {
                if self.peek_kind() == Some(&TokenKind::LParen)
                    && self.peek_kind_at(1) == Some(&TokenKind::Select)
                {
                    return Err(TranslateError::UnsupportedSelectExpression);
                }
                let expr = self.parse_expr_no_logic()?;
                let alias = self.parse_optional_alias();
                items.push(SelectItem::Expr { expr, alias });
            }
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn parse_joins(&mut self) -> Result<Option<Vec<JoinClause>>> {
        let mut joins = Vec::new();
        loop {
            let _kind = match self.peek_kind() {
                Some(TokenKind::Inner) | Some(TokenKind::Left) | Some(TokenKind::Right) => {
                    self.advance();
                    if !self.match_token(&TokenKind::Join) {
                        return Err(TranslateError::Syntax("expected JOIN".to_string()));
                    }
                }
                Some(TokenKind::Join) => {
                    self.advance();
                }
                _ => break,
            };
            let table = self.expect_ident("table name")?;
            let alias = self.parse_optional_alias();
            let on = if self.match_token(&TokenKind::On) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            joins.push(JoinClause { table, alias, on });
        }
        if joins.is_empty() {
            Ok(None)
        } else {
            Ok(Some(joins))
        }
    }

    fn parse_optional_alias(&mut self) -> Option<String> {
        if self.match_token(&TokenKind::As) {
            self.expect_ident("alias").ok()
        } else if let Some(TokenKind::Ident(name)) = self.peek_kind() {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            None
        }
    }

    fn parse_dotted_column_list(&mut self) -> Result<Vec<String>> {
        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_dotted_name()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        Ok(columns)
    }

    fn parse_dotted_name(&mut self) -> Result<String> {
        let mut parts = vec![self.expect_ident("column name")?];
        while self.match_token(&TokenKind::Dot) {
            parts.push(self.expect_ident("column name")?);
        }
        Ok(parts.join("."))
    }

    fn parse_order_by_list(&mut self) -> Result<Vec<OrderByItem>> {
        let mut items = Vec::new();
        loop {
            let expr = self.parse_expr_no_logic()?;
            let ascending = if self.match_token(&TokenKind::Desc) {
                false
            } else {
                self.match_token(&TokenKind::Asc);
                true
            };
            items.push(OrderByItem { expr, ascending });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    // ---- token helpers ----

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    pub(crate) fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_token(&mut self, kind: &TokenKind) {
        self.match_token(kind);
    }

    fn expect(&mut self, kind: &TokenKind, label: &str) -> Result<()> {
        if self.match_token(kind) {
            Ok(())
        } else {
            Err(TranslateError::Syntax(format!("expected {}", label)))
        }
    }

    fn expect_ident(&mut self, label: &str) -> Result<String> {
        match self.peek_kind() {
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(TranslateError::Syntax(format!("expected {}", label))),
        }
    }

    fn expect_integer(&mut self, label: &str) -> Result<i64> {
        match self.peek_kind() {
            Some(TokenKind::Number(value)) => {
                let value = value.clone();
                self.advance();
                value
                    .parse::<i64>()
                    .map_err(|_| TranslateError::Syntax(format!("expected integer {}", label)))
            }
            _ => Err(TranslateError::Syntax(format!("expected {}", label))),
        }
    }

    fn is_at_eof(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::EOF) | None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    #[test]
    fn parses_select_star() {
        let stmt = parse_statement("select * from t").unwrap();
        match stmt {
            Statement::Select(select) => {
                assert_eq!(select.items, vec![SelectItem::AllColumns]);
                assert_eq!(select.from_table, "t");
            }
            _ => panic!("expected select statement"),
        }
    }

    #[test]
    fn parses_delete_with_where() {
        let stmt = parse_statement("delete from t where value = 1").unwrap();
        match stmt {
            Statement::Delete(delete) => {
                assert_eq!(delete.table, "t");
                assert!(delete.where_clause.is_some());
            }
            _ => panic!("expected delete statement"),
        }
    }

    #[test]
    fn double_equals_is_rejected() {
        let err = parse_statement("select * from t where value == 1").unwrap_err();
        assert_eq!(err, TranslateError::UnsupportedSql);
    }

    #[test]
    fn multi_table_from_without_join_is_rejected() {
        let err = parse_statement("select * from a, b").unwrap_err();
        assert_eq!(err, TranslateError::UnsupportedJoin);
    }

    #[test]
    fn select_list_subselect_is_rejected() {
        let err = parse_statement("select (select 1) from t").unwrap_err();
        assert_eq!(err, TranslateError::UnsupportedSelectExpression);
    }

    #[test]
    fn from_subselect_is_rejected() {
        let err = parse_statement("select * from (select 1)").unwrap_err();
        assert_eq!(err, TranslateError::UnsupportedSubselect);
    }

    #[test]
    fn parses_group_by_order_by_limit_offset() {
        let stmt = parse_statement(
            "select agent_code, count(*) from orders where agent_code like 'AW_%' group by agent_code order by agent_code desc limit 4 offset 3",
        )
        .unwrap();
        match stmt {
            Statement::Select(select) => {
                assert_eq!(select.group_bys, vec!["agent_code".to_string()]);
                assert_eq!(select.limit, Some(4));
                assert_eq!(select.offset, Some(3));
                assert_eq!(select.order_bys.len(), 1);
                assert!(!select.order_bys[0].ascending);
            }
            _ => panic!("expected select statement"),
        }
    }

    #[test]
    fn parses_nested_column_with_table_alias() {
        let stmt = parse_statement("select c.sub.a as x from t as c").unwrap();
        match stmt {
            Statement::Select(select) => {
                assert_eq!(select.from_alias.as_deref(), Some("c"));
                match &select.items[0] {
                    SelectItem::Expr { expr, alias } => {
                        assert_eq!(alias.as_deref(), Some("x"));
                        assert_eq!(
                            *expr,
                            Expr::Column(vec![
                                "c".to_string(),
                                "sub".to_string(),
                                "a".to_string()
                            ])
                        );
                    }
                    _ => panic!("expected expr item"),
                }
            }
            _ => panic!("expected select statement"),
        }
    }
}
