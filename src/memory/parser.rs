use sqlparser::ast as sql_ast;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use crate::core::{DbError, Result, Value};
use super::ast::*;

/// Converts SQL text into the in-memory store's statement tree.
///
/// `?` placeholders are numbered in textual order; `?N` and `$N` address a
/// parameter explicitly (1-based).
pub struct SqlParserAdapter {
    dialect: MySqlDialect,
}

impl SqlParserAdapter {
    pub fn new() -> Self {
        Self {
            dialect: MySqlDialect {},
        }
    }

    pub fn parse(&self, sql: &str) -> Result<ParsedStatement> {
        let mut statements = Parser::parse_sql(&self.dialect, sql)
            .map_err(|e| DbError::ParseError(e.to_string()))?;

        if statements.len() != 1 {
            return Err(DbError::UnsupportedOperation(format!(
                "Exactly one statement per call is supported, got {}",
                statements.len()
            )));
        }

        let mut converter = StatementConverter::default();
        let statement = converter.convert_statement(statements.remove(0))?;

        Ok(ParsedStatement {
            statement,
            param_count: converter.param_count,
        })
    }
}

impl Default for SqlParserAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct StatementConverter {
    next_positional: usize,
    param_count: usize,
}

impl StatementConverter {
    fn convert_statement(&mut self, stmt: sql_ast::Statement) -> Result<Statement> {
        match stmt {
            sql_ast::Statement::Query(query) => Ok(Statement::Select(self.convert_query(*query)?)),
            sql_ast::Statement::Insert(insert) => Ok(Statement::Insert(self.convert_insert(insert)?)),
            sql_ast::Statement::Update { table, assignments, selection, .. } => {
                Ok(Statement::Update(self.convert_update(table, assignments, selection)?))
            }
            sql_ast::Statement::Delete(delete) => Ok(Statement::Delete(self.convert_delete(delete)?)),
            other => Err(DbError::UnsupportedOperation(format!(
                "Statement type not supported: {}",
                other
            ))),
        }
    }

    fn convert_query(&mut self, query: sql_ast::Query) -> Result<SelectStmt> {
        let sql_ast::SetExpr::Select(select) = *query.body else {
            return Err(DbError::UnsupportedOperation(
                "Only plain SELECT queries supported".into(),
            ));
        };
        let select = *select;

        let table_name = single_table(select.from)?;
        let projection = convert_projection(select.projection)?;
        let selection = match select.selection {
            Some(expr) => Some(self.convert_expr(expr)?),
            None => None,
        };
        let order_by = self.convert_order_by(query.order_by)?;
        let (limit, offset) = self.convert_limit_clause(query.limit_clause)?;

        Ok(SelectStmt {
            table_name,
            projection,
            selection,
            order_by,
            limit,
            offset,
        })
    }

    fn convert_order_by(&mut self, order_by: Option<sql_ast::OrderBy>) -> Result<Vec<OrderByExpr>> {
        let Some(order_by) = order_by else {
            return Ok(Vec::new());
        };

        match order_by.kind {
            sql_ast::OrderByKind::Expressions(exprs) => {
                let mut keys = Vec::with_capacity(exprs.len());
                for order in exprs {
                    // asc: Some(true) = ASC, Some(false) = DESC, None = ASC
                    let descending = order.options.asc.map(|asc| !asc).unwrap_or(false);
                    keys.push(OrderByExpr {
                        expr: self.convert_expr(order.expr)?,
                        descending,
                    });
                }
                Ok(keys)
            }
            sql_ast::OrderByKind::All(_) => Err(DbError::UnsupportedOperation(
                "ORDER BY ALL not supported".into(),
            )),
        }
    }

    fn convert_limit_clause(
        &mut self,
        clause: Option<sql_ast::LimitClause>,
    ) -> Result<(Option<Expr>, Option<Expr>)> {
        match clause {
            None => Ok((None, None)),
            Some(sql_ast::LimitClause::LimitOffset { limit, offset, .. }) => {
                let limit = match limit {
                    Some(expr) => Some(self.convert_expr(expr)?),
                    None => None,
                };
                let offset = match offset {
                    Some(offset) => Some(self.convert_expr(offset.value)?),
                    None => None,
                };
                Ok((limit, offset))
            }
            // MySQL style: LIMIT offset, limit
            Some(sql_ast::LimitClause::OffsetCommaLimit { offset, limit }) => {
                let offset = self.convert_expr(offset)?;
                let limit = self.convert_expr(limit)?;
                Ok((Some(limit), Some(offset)))
            }
        }
    }

    fn convert_insert(&mut self, insert: sql_ast::Insert) -> Result<InsertStmt> {
        let table_name = clean_identifier(&insert.table.to_string());
        let columns: Vec<String> = insert.columns.into_iter().map(|id| id.value).collect();

        let Some(source) = insert.source else {
            return Err(DbError::UnsupportedOperation("INSERT requires VALUES".into()));
        };
        let sql_ast::SetExpr::Values(values) = *source.body else {
            return Err(DbError::UnsupportedOperation(
                "Only VALUES clause supported".into(),
            ));
        };

        let mut rows = Vec::with_capacity(values.rows.len());
        for row in values.rows {
            // `() VALUES ()` inserts a row of defaults
            if columns.is_empty() && !row.is_empty() {
                return Err(DbError::UnsupportedOperation(
                    "INSERT requires an explicit column list".into(),
                ));
            }
            if row.len() != columns.len() {
                return Err(DbError::ParseError(format!(
                    "INSERT has {} columns but a row with {} values",
                    columns.len(),
                    row.len()
                )));
            }

            let mut converted = Vec::with_capacity(row.len());
            for expr in row {
                converted.push(self.convert_expr(expr)?);
            }
            rows.push(converted);
        }

        Ok(InsertStmt {
            table_name,
            columns,
            rows,
        })
    }

    fn convert_update(
        &mut self,
        table: sql_ast::TableWithJoins,
        assignments: Vec<sql_ast::Assignment>,
        selection: Option<sql_ast::Expr>,
    ) -> Result<UpdateStmt> {
        let table_name = single_table(vec![table])?;

        let mut converted = Vec::with_capacity(assignments.len());
        for assign in assignments {
            let column = match assign.target {
                sql_ast::AssignmentTarget::ColumnName(col_name) => {
                    if col_name.0.len() != 1 {
                        return Err(DbError::UnsupportedOperation(
                            "Qualified column names not supported in UPDATE".into(),
                        ));
                    }
                    clean_identifier(&col_name.0[0].to_string())
                }
                _ => {
                    return Err(DbError::UnsupportedOperation(
                        "Only simple column names supported in UPDATE".into(),
                    ));
                }
            };
            converted.push((column, self.convert_expr(assign.value)?));
        }

        let selection = match selection {
            Some(expr) => Some(self.convert_expr(expr)?),
            None => None,
        };

        Ok(UpdateStmt {
            table_name,
            assignments: converted,
            selection,
        })
    }

    fn convert_delete(&mut self, delete: sql_ast::Delete) -> Result<DeleteStmt> {
        let tables = match delete.from {
            sql_ast::FromTable::WithFromKeyword(tables) => tables,
            sql_ast::FromTable::WithoutKeyword(tables) => tables,
        };
        let table_name = single_table(tables)?;

        let selection = match delete.selection {
            Some(expr) => Some(self.convert_expr(expr)?),
            None => None,
        };

        Ok(DeleteStmt {
            table_name,
            selection,
        })
    }

    fn convert_expr(&mut self, expr: sql_ast::Expr) -> Result<Expr> {
        match expr {
            sql_ast::Expr::Identifier(ident) => Ok(Expr::Column(ident.value)),
            sql_ast::Expr::CompoundIdentifier(idents) => idents
                .last()
                .map(|ident| Expr::Column(ident.value.clone()))
                .ok_or_else(|| DbError::ParseError("Empty compound identifier".into())),
            sql_ast::Expr::Value(value) => self.convert_value(value.value),
            sql_ast::Expr::Nested(inner) => self.convert_expr(*inner),
            sql_ast::Expr::BinaryOp { left, op, right } => {
                let left = self.convert_expr(*left)?;
                let op = convert_binary_op(&op)?;
                let right = self.convert_expr(*right)?;
                Ok(Expr::BinaryOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                })
            }
            sql_ast::Expr::UnaryOp { op, expr } => match op {
                sql_ast::UnaryOperator::Not => Ok(Expr::Not(Box::new(self.convert_expr(*expr)?))),
                sql_ast::UnaryOperator::Plus => self.convert_expr(*expr),
                sql_ast::UnaryOperator::Minus => match self.convert_expr(*expr)? {
                    Expr::Literal(Value::Integer(i)) => Ok(Expr::Literal(Value::Integer(-i))),
                    Expr::Literal(Value::Float(f)) => Ok(Expr::Literal(Value::Float(-f))),
                    other => Err(DbError::UnsupportedOperation(format!(
                        "Unary minus only supported on numeric literals, got {:?}",
                        other
                    ))),
                },
                other => Err(DbError::UnsupportedOperation(format!(
                    "Unsupported unary operator: {}",
                    other
                ))),
            },
            sql_ast::Expr::IsNull(inner) => Ok(Expr::IsNull {
                expr: Box::new(self.convert_expr(*inner)?),
                negated: false,
            }),
            sql_ast::Expr::IsNotNull(inner) => Ok(Expr::IsNull {
                expr: Box::new(self.convert_expr(*inner)?),
                negated: true,
            }),
            sql_ast::Expr::InList { expr, list, negated } => {
                let expr = self.convert_expr(*expr)?;
                let mut items = Vec::with_capacity(list.len());
                for item in list {
                    items.push(self.convert_expr(item)?);
                }
                Ok(Expr::InList {
                    expr: Box::new(expr),
                    list: items,
                    negated,
                })
            }
            sql_ast::Expr::Like { negated, expr, pattern, escape_char, .. } => {
                self.convert_like(*expr, *pattern, negated, escape_char.is_some(), false)
            }
            sql_ast::Expr::ILike { negated, expr, pattern, escape_char, .. } => {
                self.convert_like(*expr, *pattern, negated, escape_char.is_some(), true)
            }
            other => Err(DbError::UnsupportedOperation(format!(
                "Unsupported expression: {}",
                other
            ))),
        }
    }

    fn convert_like(
        &mut self,
        expr: sql_ast::Expr,
        pattern: sql_ast::Expr,
        negated: bool,
        has_escape: bool,
        case_insensitive: bool,
    ) -> Result<Expr> {
        if has_escape {
            return Err(DbError::UnsupportedOperation("LIKE ESCAPE not supported".into()));
        }

        Ok(Expr::Like {
            expr: Box::new(self.convert_expr(expr)?),
            pattern: Box::new(self.convert_expr(pattern)?),
            negated,
            case_insensitive,
        })
    }

    fn convert_value(&mut self, value: sql_ast::Value) -> Result<Expr> {
        let literal = match value {
            sql_ast::Value::Placeholder(token) => return self.bind_placeholder(&token).map(Expr::Param),
            sql_ast::Value::Number(n, _) => {
                if let Ok(i) = n.parse::<i64>() {
                    Value::Integer(i)
                } else if let Ok(f) = n.parse::<f64>() {
                    Value::Float(f)
                } else {
                    return Err(DbError::TypeMismatch(format!("Invalid number: {}", n)));
                }
            }
            sql_ast::Value::SingleQuotedString(s) | sql_ast::Value::DoubleQuotedString(s) => {
                Value::Text(s)
            }
            sql_ast::Value::Boolean(b) => Value::Boolean(b),
            sql_ast::Value::Null => Value::Null,
            other => {
                return Err(DbError::UnsupportedOperation(format!(
                    "Unsupported value: {}",
                    other
                )));
            }
        };
        Ok(Expr::Literal(literal))
    }

    fn bind_placeholder(&mut self, token: &str) -> Result<usize> {
        let index = match token.trim_start_matches(['?', '$']) {
            "" => {
                let index = self.next_positional;
                self.next_positional += 1;
                index
            }
            digits => digits
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(|n| n - 1)
                .ok_or_else(|| DbError::ParseError(format!("Unsupported placeholder '{}'", token)))?,
        };

        self.param_count = self.param_count.max(index + 1);
        Ok(index)
    }
}

fn convert_projection(items: Vec<sql_ast::SelectItem>) -> Result<Projection> {
    if let [sql_ast::SelectItem::Wildcard(_)] = items.as_slice() {
        return Ok(Projection::Wildcard);
    }

    if let [item] = items.as_slice() {
        match item {
            sql_ast::SelectItem::UnnamedExpr(expr) => {
                if let sql_ast::Expr::Function(func) = expr {
                    if is_count(func) {
                        return Ok(Projection::Count(expr.to_string()));
                    }
                }
            }
            sql_ast::SelectItem::ExprWithAlias { expr, alias } => {
                if let sql_ast::Expr::Function(func) = expr {
                    if is_count(func) {
                        return Ok(Projection::Count(alias.value.clone()));
                    }
                }
            }
            _ => {}
        }
    }

    items
        .into_iter()
        .map(|item| match item {
            sql_ast::SelectItem::UnnamedExpr(sql_ast::Expr::Identifier(ident)) => Ok(ident.value),
            other => Err(DbError::UnsupportedOperation(format!(
                "Unsupported projection: {}",
                other
            ))),
        })
        .collect::<Result<Vec<_>>>()
        .map(Projection::Columns)
}

fn is_count(func: &sql_ast::Function) -> bool {
    func.name.to_string().eq_ignore_ascii_case("count")
}

fn single_table(from: Vec<sql_ast::TableWithJoins>) -> Result<String> {
    if from.len() != 1 {
        return Err(DbError::UnsupportedOperation(format!(
            "Exactly one table reference supported, got {}",
            from.len()
        )));
    }

    let Some(table) = from.into_iter().next() else {
        return Err(DbError::ParseError("Missing table reference".into()));
    };

    if !table.joins.is_empty() {
        return Err(DbError::UnsupportedOperation("JOIN not supported".into()));
    }

    match table.relation {
        sql_ast::TableFactor::Table { name, .. } => extract_table_name(&name),
        _ => Err(DbError::UnsupportedOperation(
            "Complex table references not supported".into(),
        )),
    }
}

fn extract_table_name(name: &sql_ast::ObjectName) -> Result<String> {
    name.0
        .last()
        .map(|ident| clean_identifier(&ident.to_string()))
        .ok_or_else(|| DbError::ParseError("Invalid table name".into()))
}

/// Strips identifier quoting and any schema qualifier.
fn clean_identifier(raw: &str) -> String {
    raw.rsplit('.')
        .next()
        .unwrap_or(raw)
        .trim_matches(|c| c == '`' || c == '"')
        .to_string()
}

fn convert_binary_op(op: &sql_ast::BinaryOperator) -> Result<BinaryOp> {
    use sql_ast::BinaryOperator as SqlOp;

    match op {
        SqlOp::Eq => Ok(BinaryOp::Eq),
        SqlOp::NotEq => Ok(BinaryOp::NotEq),
        SqlOp::Lt => Ok(BinaryOp::Lt),
        SqlOp::LtEq => Ok(BinaryOp::LtEq),
        SqlOp::Gt => Ok(BinaryOp::Gt),
        SqlOp::GtEq => Ok(BinaryOp::GtEq),
        SqlOp::And => Ok(BinaryOp::And),
        SqlOp::Or => Ok(BinaryOp::Or),
        _ => Err(DbError::UnsupportedOperation(format!(
            "Unsupported binary operator: {}",
            op
        ))),
    }
}
