//! SQLite rendering of listing specs.
//!
//! Task listings alias the `tasks` table as `t`, user listings alias `users`
//! as `u`. Values are always bound, never inlined.

use super::{Page, QuerySpec, SortDirection, TaskOrder, TaskPredicate, UserOrder, UserPredicate};
use crate::repo::columns::task_status_to_db;
use rusqlite::types::Value;

/// Rendered `WHERE` / `ORDER BY` / `LIMIT` tail plus its bind values.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SqlClause {
    pub filter: String,
    pub order_by: String,
    pub window: String,
    pub binds: Vec<Value>,
}

impl SqlClause {
    /// Appends the clause to a `SELECT ... FROM <table> <alias>` head.
    pub fn complete(&self, select: &str) -> String {
        format!(
            "{select} WHERE 1 = 1{} ORDER BY {}{};",
            self.filter, self.order_by, self.window
        )
    }
}

pub(crate) trait RenderSql {
    fn render(&self) -> SqlClause;
}

impl RenderSql for QuerySpec<TaskPredicate, TaskOrder> {
    fn render(&self) -> SqlClause {
        let mut filter = String::new();
        let mut binds = Vec::new();
        for predicate in &self.predicates {
            match predicate {
                TaskPredicate::AssignedTo(user_id) => {
                    filter.push_str(
                        " AND EXISTS (
                            SELECT 1 FROM task_users tu
                            WHERE tu.task_id = t.id AND tu.user_id = ?
                        )",
                    );
                    binds.push(Value::Integer(*user_id));
                }
                TaskPredicate::Status(status) => {
                    filter.push_str(" AND t.status = ?");
                    binds.push(Value::Text(task_status_to_db(*status).to_string()));
                }
                TaskPredicate::Unassigned => {
                    filter.push_str(
                        " AND NOT EXISTS (SELECT 1 FROM task_users tu WHERE tu.task_id = t.id)",
                    );
                }
            }
        }

        let order_by = self
            .order
            .iter()
            .map(|term| match term {
                TaskOrder::Id(direction) => format!("t.id {}", keyword(*direction)),
                TaskOrder::Deadline(direction) => {
                    format!("t.deadline IS NULL ASC, t.deadline {}", keyword(*direction))
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let window = render_window(self.page, &mut binds);
        SqlClause {
            filter,
            order_by,
            window,
            binds,
        }
    }
}

impl RenderSql for QuerySpec<UserPredicate, UserOrder> {
    fn render(&self) -> SqlClause {
        let mut filter = String::new();
        let mut binds = Vec::new();
        for predicate in &self.predicates {
            match predicate {
                UserPredicate::AssignedTo(task_id) => {
                    filter.push_str(
                        " AND EXISTS (
                            SELECT 1 FROM task_users tu
                            WHERE tu.user_id = u.id AND tu.task_id = ?
                        )",
                    );
                    binds.push(Value::Integer(*task_id));
                }
                UserPredicate::FirstName(name) => {
                    filter.push_str(" AND u.first_name = ?");
                    binds.push(Value::Text(name.clone()));
                }
                UserPredicate::LastName(name) => {
                    filter.push_str(" AND u.last_name = ?");
                    binds.push(Value::Text(name.clone()));
                }
                UserPredicate::Unassigned => {
                    filter.push_str(
                        " AND NOT EXISTS (SELECT 1 FROM task_users tu WHERE tu.user_id = u.id)",
                    );
                }
            }
        }

        let order_by = self
            .order
            .iter()
            .map(|UserOrder::Id(direction)| format!("u.id {}", keyword(*direction)))
            .collect::<Vec<_>>()
            .join(", ");

        let window = render_window(self.page, &mut binds);
        SqlClause {
            filter,
            order_by,
            window,
            binds,
        }
    }
}

fn render_window(page: Page, binds: &mut Vec<Value>) -> String {
    match page {
        Page::Window { size, .. } => {
            binds.push(Value::Integer(i64::from(size)));
            binds.push(Value::Integer(
                i64::try_from(page.offset()).unwrap_or(i64::MAX),
            ));
            " LIMIT ? OFFSET ?".to_string()
        }
        Page::Unbounded => String::new(),
    }
}

fn keyword(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}

#[cfg(test)]
mod tests {
    use super::RenderSql;
    use crate::model::task::TaskStatus;
    use crate::query::{
        build_task_spec, build_user_spec, Page, SortDirection, TaskFilters, UserFilters,
    };
    use rusqlite::types::Value;

    #[test]
    fn task_clause_binds_filters_then_window() {
        let filters = TaskFilters {
            assigned_to: Some(3),
            status: Some(TaskStatus::InProgress),
            unassigned: false,
        };
        let clause =
            build_task_spec(&filters, Page::numbered(Some(2)), true, SortDirection::Desc).render();

        assert_eq!(
            clause.order_by,
            "t.deadline IS NULL ASC, t.deadline DESC, t.id ASC"
        );
        assert_eq!(clause.window, " LIMIT ? OFFSET ?");
        assert_eq!(
            clause.binds,
            vec![
                Value::Integer(3),
                Value::Text("IN_PROGRESS".to_string()),
                Value::Integer(2),
                Value::Integer(2),
            ]
        );
    }

    #[test]
    fn unbounded_clause_has_no_limit() {
        let filters = UserFilters {
            unassigned: true,
            ..UserFilters::default()
        };
        let clause = build_user_spec(&filters, Page::Unbounded).render();

        assert!(clause.window.is_empty());
        assert!(clause.binds.is_empty());
        assert!(clause.filter.contains("NOT EXISTS"));
        assert_eq!(clause.order_by, "u.id ASC");
    }

    #[test]
    fn rendering_is_repeatable() {
        let spec = build_task_spec(
            &TaskFilters::default(),
            Page::numbered(Some(5)),
            false,
            SortDirection::Asc,
        );
        let head = "SELECT t.id FROM tasks t";
        assert_eq!(
            spec.render().complete(head),
            spec.clone().render().complete(head)
        );
    }
}
