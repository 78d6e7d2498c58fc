use std::fmt::{self, Display};

pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Display adapter printing at most `limit` bytes (on a char boundary) of a text.
pub struct Truncated<'a> {
    value: &'a str,
    limit: usize,
}

impl<'a> Truncated<'a> {
    pub fn new(value: &'a str, limit: usize) -> Self {
        Self { value, limit }
    }
}

impl Display for Truncated<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.len() <= self.limit {
            return f.write_str(self.value.trim_end());
        }
        let mut end = self.limit;
        while !self.value.is_char_boundary(end) {
            end -= 1;
        }
        write!(f, "{}...", self.value[..end].trim_end())
    }
}

#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {
        $crate::Truncated::new(::std::convert::AsRef::<str>::as_ref(&$query), 497)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separated() {
        let mut out = String::from("(");
        separated_by(&mut out, ["a", "b", "c"], |out, v| out.push_str(v), ", ");
        out.push(')');
        assert_eq!(out, "(a, b, c)");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "é".repeat(300);
        let printed = Truncated::new(&text, 497).to_string();
        assert!(printed.ends_with("..."));
        assert_eq!(printed.len(), 496 + 3);
        assert_eq!(Truncated::new("short  ", 497).to_string(), "short");
    }
}
