//! Abstract syntax tree for the supported SELECT/DELETE subset of SQL.
//!
//! This is the immutable tree the lexer/parser front end produces and the
//! lowering pipeline consumes. Rust has no subtype polymorphism, so the
//! visitor pattern over this tree is just an exhaustive `match` per node
//! variant wherever a lowering component needs to dispatch on shape.

/// A literal value as it appeared in the source text, before type coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Long(i64),
    Double(f64),
    String(String),
    Boolean(bool),
    Null,
}

/// Comparison operators recognized by the WHERE/ON grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Like,
    NotLike,
}

/// AND/OR — the only binary logical connectives the grammar admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// An expression node. `Column` carries its dotted segments in source
/// order; the first segment may be a table alias, which the Select
/// Lowerer strips when resolving against `from_alias`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Column(Vec<String>),
    /// Unary minus applied to a literal, e.g. `-5` or `-3.5`.
    Signed(Box<Expr>),
    Function {
        name: String,
        args: Vec<Expr>,
    },
    Comparison {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    InList {
        left: Box<Expr>,
        items: Vec<Expr>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    /// A parenthesized sub-expression. `negated` is set when the
    /// parenthesized group was itself preceded by `NOT`.
    Parens {
        inner: Box<Expr>,
        negated: bool,
    },
    Case {
        branches: Vec<(Expr, Expr)>,
        else_branch: Option<Box<Expr>>,
    },
    Subtract {
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Dotted-name rendering of a `Column`, used for error messages and
    /// field-type map lookups. Returns `None` for non-column expressions.
    pub fn column_name(&self) -> Option<String> {
        match self {
            Expr::Column(parts) => Some(parts.join(".")),
            _ => None,
        }
    }

    /// Drop the leading table-alias segment, if `alias` matches the first
    /// part of a dotted column. Non-column expressions pass through.
    pub fn strip_table_alias(&self, alias: Option<&str>) -> Expr {
        match (self, alias) {
            (Expr::Column(parts), Some(alias)) if parts.len() > 1 && parts[0] == alias => {
                Expr::Column(parts[1..].to_vec())
            }
            _ => self.clone(),
        }
    }
}

/// A single SELECT item: `*`, or an expression with an optional alias.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    AllColumns,
    Expr { expr: Expr, alias: Option<String> },
}

/// One ORDER BY element.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: Expr,
    pub ascending: bool,
}

/// A join clause. Everything beyond "a join clause is present" is opaque
/// to this crate — resolving it into pipeline stages is the JoinPipeline
/// collaborator's job (`crate::join`).
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub table: String,
    pub alias: Option<String>,
    pub on: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub items: Vec<SelectItem>,
    pub from_table: String,
    pub from_alias: Option<String>,
    pub where_clause: Option<Expr>,
    pub group_bys: Vec<String>,
    pub order_bys: Vec<OrderByItem>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub distinct: bool,
    pub joins: Option<Vec<JoinClause>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Delete(DeleteStatement),
}
