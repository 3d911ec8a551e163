use crate::MacrocellId;

/// One block of product terms in the AND array, as seen by the equation printer.
///
/// A macrocell with a local output enable is represented by two entries: the `.oe` term,
/// followed by the data output with the remaining terms.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Macrocell {
    /// The physical cell these terms belong to.
    pub cell: MacrocellId,
    /// Output name, including a `!` prefix for active-low outputs and a `.d` or `.oe` suffix.
    pub name: String,
    pub or_terms: usize,
    pub oe: bool,
}

impl Macrocell {
    pub fn new(cell: MacrocellId, name: String, or_terms: usize) -> Self {
        Macrocell {
            cell,
            name,
            or_terms,
            oe: false,
        }
    }

    pub fn output_enable(cell: MacrocellId, name: String) -> Self {
        Macrocell {
            cell,
            name,
            or_terms: 1,
            oe: true,
        }
    }

    /// The name as it appears on the left side of an equation.
    pub fn display_name(&self) -> &str {
        let name = self.name.strip_prefix("!!").unwrap_or(&self.name);
        if self.oe {
            name.strip_prefix('!').unwrap_or(name)
        } else {
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use unnamed_entity::EntityId;

    use super::Macrocell;
    use crate::MacrocellId;

    #[test]
    fn display_name() {
        let cell = MacrocellId::from_idx(0);
        assert_eq!(Macrocell::new(cell, "!q.d".into(), 8).display_name(), "!q.d");
        assert_eq!(Macrocell::new(cell, "!!q".into(), 8).display_name(), "q");
        assert_eq!(
            Macrocell::output_enable(cell, "!q.oe".into()).display_name(),
            "q.oe"
        );
        assert_eq!(
            Macrocell::output_enable(cell, "!!!q.oe".into()).display_name(),
            "q.oe"
        );
    }
}
