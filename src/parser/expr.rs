//! Expression grammar, in ascending precedence: OR < AND < prefix NOT <
//! comparison/LIKE/IN/IS NULL < subtraction < primary.

use super::SqlParser;
use crate::ast::{CompareOp, Expr, Literal, LogicalOp};
use crate::error::{Result, TranslateError};
use crate::lexer::TokenKind;

impl SqlParser {
    /// Entry point for a WHERE/ON/HAVING-style boolean expression.
    pub(super) fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    /// Entry point for a non-boolean expression position (a SELECT item or
    /// an ORDER BY key) — the grammar there never admits AND/OR/NOT, so
    /// this starts one level lower to keep those keywords out of scope.
    pub(super) fn parse_expr_no_logic(&mut self) -> Result<Expr> {
        self.parse_additive()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.match_token(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.match_token(&TokenKind::And) {
            let right = self.parse_not()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.match_token(&TokenKind::Not) {
            let inner = self.parse_not()?;
            return Ok(match inner {
                Expr::Parens { inner, .. } => Expr::Parens {
                    inner,
                    negated: true,
                },
                other => Expr::Not(Box::new(other)),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;

        if self.peek_kind() == Some(&TokenKind::DoubleEq) {
            return Err(TranslateError::UnsupportedSql);
        }

        if let Some(op) = self.peek_compare_op() {
            self.advance();
            let right = self.parse_additive()?;
            return Ok(Expr::Comparison {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        if self.match_token(&TokenKind::Not) {
            if self.match_token(&TokenKind::Like) {
                return Err(TranslateError::UnsupportedLike);
            }
            if self.match_token(&TokenKind::In) {
                let items = self.parse_in_list()?;
                return Ok(Expr::InList {
                    left: Box::new(left),
                    items,
                    negated: true,
                });
            }
            return Err(TranslateError::Syntax(
                "expected LIKE or IN after NOT".to_string(),
            ));
        }

        if self.match_token(&TokenKind::Like) {
            let right = self.parse_additive()?;
            return Ok(Expr::Comparison {
                op: CompareOp::Like,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        if self.match_token(&TokenKind::In) {
            let items = self.parse_in_list()?;
            return Ok(Expr::InList {
                left: Box::new(left),
                items,
                negated: false,
            });
        }

        if self.match_token(&TokenKind::Is) {
            let negated = self.match_token(&TokenKind::Not);
            self.expect_keyword(&TokenKind::Null, "NULL")?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        Ok(left)
    }

    fn peek_compare_op(&self) -> Option<CompareOp> {
        match self.peek_kind() {
            Some(TokenKind::Eq) => Some(CompareOp::Eq),
            Some(TokenKind::Ne) => Some(CompareOp::Ne),
            Some(TokenKind::Gt) => Some(CompareOp::Gt),
            Some(TokenKind::Lt) => Some(CompareOp::Lt),
            Some(TokenKind::Ge) => Some(CompareOp::Ge),
            Some(TokenKind::Le) => Some(CompareOp::Le),
            _ => None,
        }
    }

    fn parse_in_list(&mut self) -> Result<Vec<Expr>> {
        self.expect_keyword(&TokenKind::LParen, "(")?;
        let mut items = Vec::new();
        loop {
            items.push(self.parse_additive()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_keyword(&TokenKind::RParen, ")")?;
        Ok(items)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_primary()?;
        while self.match_token(&TokenKind::Minus) {
            let right = self.parse_primary()?;
            left = Expr::Subtract {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek_kind().cloned() {
            Some(TokenKind::LParen) => {
                self.advance();
                if self.peek_kind() == Some(&TokenKind::Select) {
                    return Err(TranslateError::UnsupportedSelectExpression);
                }
                let inner = self.parse_expr()?;
                self.expect_keyword(&TokenKind::RParen, ")")?;
                Ok(Expr::Parens {
                    inner: Box::new(inner),
                    negated: false,
                })
            }
            Some(TokenKind::Case) => self.parse_case(),
            Some(TokenKind::Minus) => {
                self.advance();
                let inner = self.parse_primary()?;
                Ok(Expr::Signed(Box::new(inner)))
            }
            Some(TokenKind::Number(value)) => {
                self.advance();
                Ok(Expr::Literal(parse_numeric_literal(&value)))
            }
            Some(TokenKind::String(value)) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(value)))
            }
            Some(TokenKind::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            Some(TokenKind::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            Some(TokenKind::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            Some(TokenKind::Star) => {
                self.advance();
                Ok(Expr::Column(vec!["*".to_string()]))
            }
            Some(TokenKind::Count) => self.parse_function_call("count"),
            Some(TokenKind::Sum) => self.parse_function_call("sum"),
            Some(TokenKind::Avg) => self.parse_function_call("avg"),
            Some(TokenKind::Min) => self.parse_function_call("min"),
            Some(TokenKind::Max) => self.parse_function_call("max"),
            Some(TokenKind::Ident(_)) => self.parse_ident_led(),
            _ => Err(TranslateError::Syntax(
                "expected an expression".to_string(),
            )),
        }
    }

    /// An identifier at the head of a primary expression is either a
    /// dotted column path or, when followed by `(`, a free-standing
    /// function call such as `regexMatch(...)` or `date(...)`.
    fn parse_ident_led(&mut self) -> Result<Expr> {
        let name = match self.peek_kind() {
            Some(TokenKind::Ident(name)) => name.clone(),
            _ => unreachable!("parse_ident_led called without a leading identifier"),
        };
        self.advance();

        if self.peek_kind() == Some(&TokenKind::LParen) {
            return self.parse_function_call(&name);
        }

        let mut parts = vec![name];
        while self.match_token(&TokenKind::Dot) {
            parts.push(self.expect_ident_name()?);
        }
        Ok(Expr::Column(parts))
    }

    fn parse_function_call(&mut self, name: &str) -> Result<Expr> {
        self.expect_keyword(&TokenKind::LParen, "(")?;
        let mut args = Vec::new();
        if self.peek_kind() == Some(&TokenKind::Star) {
            self.advance();
            args.push(Expr::Column(vec!["*".to_string()]));
        } else if self.peek_kind() != Some(&TokenKind::RParen) {
            loop {
                args.push(self.parse_or()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect_keyword(&TokenKind::RParen, ")")?;
        Ok(Expr::Function {
            name: name.to_string(),
            args,
        })
    }

    fn parse_case(&mut self) -> Result<Expr> {
        self.advance(); // CASE
        let mut branches = Vec::new();
        while self.match_token(&TokenKind::When) {
            let condition = self.parse_or()?;
            self.expect_keyword(&TokenKind::Then, "THEN")?;
            let result = self.parse_additive()?;
            branches.push((condition, result));
        }
        let else_branch = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.parse_additive()?))
        } else {
            None
        };
        self.expect_keyword(&TokenKind::End, "END")?;
        Ok(Expr::Case {
            branches,
            else_branch,
        })
    }

    fn expect_ident_name(&mut self) -> Result<String> {
        match self.peek_kind() {
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(TranslateError::Syntax("expected identifier".to_string())),
        }
    }

    fn expect_keyword(&mut self, kind: &TokenKind, label: &str) -> Result<()> {
        if self.match_token(kind) {
            Ok(())
        } else {
            Err(TranslateError::Syntax(format!("expected {}", label)))
        }
    }
}

fn parse_numeric_literal(raw: &str) -> Literal {
    if raw.contains('.') {
        Literal::Double(raw.parse().unwrap_or(0.0))
    } else {
        match raw.parse::<i64>() {
            Ok(value) => Literal::Long(value),
            Err(_) => Literal::Double(raw.parse().unwrap_or(0.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse_statement;
    use crate::ast::{CompareOp, Expr, Literal, Statement};

    fn where_expr(sql: &str) -> Expr {
        match parse_statement(sql).unwrap() {
            Statement::Select(select) => select.where_clause.unwrap(),
            _ => panic!("expected select statement"),
        }
    }

    #[test]
    fn parses_and_or_precedence() {
        let expr = where_expr("select * from t where a = 1 or b = 2 and c = 3");
        match expr {
            Expr::Logical { op, right, .. } => {
                assert_eq!(op, crate::ast::LogicalOp::Or);
                assert!(matches!(*right, Expr::Logical { .. }));
            }
            _ => panic!("expected logical or"),
        }
    }

    #[test]
    fn parses_not_in_list() {
        let expr = where_expr("select * from t where a not in (1, 2, 3)");
        match expr {
            Expr::InList { negated, items, .. } => {
                assert!(negated);
                assert_eq!(items.len(), 3);
            }
            _ => panic!("expected in-list"),
        }
    }

    #[test]
    fn parses_is_not_null() {
        let expr = where_expr("select * from t where a is not null");
        match expr {
            Expr::IsNull { negated, .. } => assert!(negated),
            _ => panic!("expected is-null"),
        }
    }

    #[test]
    fn not_like_is_rejected() {
        let err = crate::parser::parse_statement("select * from t where a not like 'x'")
            .unwrap_err();
        assert_eq!(err, crate::error::TranslateError::UnsupportedLike);
    }

    #[test]
    fn parses_negated_parenthesized_group() {
        let expr = where_expr("select * from t where not (a = 1 and b = 2)");
        match expr {
            Expr::Parens { negated, .. } => assert!(negated),
            _ => panic!("expected negated parens"),
        }
    }

    #[test]
    fn parses_subtract_in_projection() {
        match parse_statement("select a - b from t").unwrap() {
            Statement::Select(select) => match &select.items[0] {
                crate::ast::SelectItem::Expr { expr, .. } => {
                    assert!(matches!(expr, Expr::Subtract { .. }));
                }
                _ => panic!("expected expr item"),
            },
            _ => panic!("expected select statement"),
        }
    }

    #[test]
    fn parses_function_call_as_primary() {
        let expr = where_expr("select * from t where regexMatch(name, 'A.*') = true");
        match expr {
            Expr::Comparison { left, right, op } => {
                assert_eq!(op, CompareOp::Eq);
                assert!(matches!(*left, Expr::Function { .. }));
                assert_eq!(*right, Expr::Literal(Literal::Boolean(true)));
            }
            _ => panic!("expected comparison"),
        }
    }

    #[test]
    fn parses_case_expression() {
        match parse_statement(
            "select case when a = 1 then 'x' else 'y' end as label from t",
        )
        .unwrap()
        {
            Statement::Select(select) => match &select.items[0] {
                crate::ast::SelectItem::Expr { expr, alias } => {
                    assert_eq!(alias.as_deref(), Some("label"));
                    assert!(matches!(expr, Expr::Case { .. }));
                }
                _ => panic!("expected expr item"),
            },
            _ => panic!("expected select statement"),
        }
    }
}
