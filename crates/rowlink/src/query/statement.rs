//! Built statements.

use std::fmt;

use crate::codec::render_literal;
use crate::value::Value;

/// A statement ready for the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL with `?` placeholders.
    pub sql: String,
    /// Values bound to the placeholders, in order.
    pub params: Vec<Value>,
    /// The SQL with every value rendered inline. Used for logs and as the
    /// result cache key, never executed.
    pub inline: String,
}

impl Statement {
    /// A statement without parameters.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        Self {
            inline: sql.clone(),
            sql,
            params: Vec::new(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inline)
    }
}

/// Builds the placeholder SQL and its inline rendering side by side.
#[derive(Debug, Default)]
pub struct StatementWriter {
    sql: String,
    inline: String,
    params: Vec<Value>,
}

impl StatementWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends SQL text.
    pub fn push(&mut self, text: &str) -> &mut Self {
        self.sql.push_str(text);
        self.inline.push_str(text);
        self
    }

    /// Appends a placeholder bound to `value`.
    pub fn bind(&mut self, value: Value) -> &mut Self {
        self.sql.push('?');
        self.inline.push_str(&render_literal(&value));
        self.params.push(value);
        self
    }

    /// Appends `items` separated by `", "`.
    pub fn push_list<I, F>(&mut self, items: I, mut each: F) -> &mut Self
    where
        I: IntoIterator,
        F: FnMut(&mut Self, I::Item),
    {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            each(&mut *self, item);
        }
        self
    }

    #[must_use]
    pub fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
            inline: self.inline,
        }
    }
}
