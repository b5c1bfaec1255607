use super::Value;

/// Boolean and scalar expressions used in upsert predicates, conditions and
/// update overrides.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Leaf and fallback expressions
    Value(Value),
    /// A field name or column of the target table.
    Column(String),
    /// The proposed row, `EXCLUDED."col"`.
    Excluded(String),
    Null,
    Raw(String),

    // Operators and logical combinators
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    Comparison {
        left: Box<Expr>,
        op: ComparisonOp,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Is {
        expr: Box<Expr>,
        test: IsTest,
    },
    In {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    pub fn excluded(name: impl Into<String>) -> Self {
        Self::Excluded(name.into())
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Function {
            name: name.into(),
            args,
        }
    }

    #[must_use]
    pub fn compare(self, op: ComparisonOp, right: Expr) -> Self {
        Self::Comparison {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn eq(self, right: Expr) -> Self {
        self.compare(ComparisonOp::Equal, right)
    }

    #[must_use]
    pub fn ne(self, right: Expr) -> Self {
        self.compare(ComparisonOp::NotEqual, right)
    }

    #[must_use]
    pub fn gt(self, right: Expr) -> Self {
        self.compare(ComparisonOp::GreaterThan, right)
    }

    #[must_use]
    pub fn lt(self, right: Expr) -> Self {
        self.compare(ComparisonOp::LessThan, right)
    }

    #[must_use]
    pub fn binary(self, op: BinaryOperator, right: Expr) -> Self {
        Self::BinaryOp {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn and(self, right: Expr) -> Self {
        Self::And(Box::new(self), Box::new(right))
    }

    #[must_use]
    pub fn or(self, right: Expr) -> Self {
        Self::Or(Box::new(self), Box::new(right))
    }

    #[must_use]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    #[must_use]
    pub fn is(self, test: IsTest) -> Self {
        Self::Is {
            expr: Box::new(self),
            test,
        }
    }

    #[must_use]
    pub fn is_in(self, list: Vec<Expr>) -> Self {
        Self::In {
            expr: Box::new(self),
            list,
            negated: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    StringConcat,
}

impl BinaryOperator {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::StringConcat => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    ILike,
    IsDistinctFrom,
}

impl ComparisonOp {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Like => "LIKE",
            Self::ILike => "ILIKE",
            Self::IsDistinctFrom => "IS DISTINCT FROM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsTest {
    Null,
    NotNull,
    True,
    NotTrue,
    False,
    NotFalse,
}

impl IsTest {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Null => "IS NULL",
            Self::NotNull => "IS NOT NULL",
            Self::True => "IS TRUE",
            Self::NotTrue => "IS NOT TRUE",
            Self::False => "IS FALSE",
            Self::NotFalse => "IS NOT FALSE",
        }
    }
}
