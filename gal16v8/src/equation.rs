use itertools::Itertools;

/// A single AND term of a sum-of-products equation.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ProductTerm {
    /// No inputs connected.
    True,
    /// Some input connected in both polarities.
    False,
    /// Conjunction of the named signals.  Never empty.
    And(Vec<String>),
}

impl ProductTerm {
    /// True if the term contributes anything to an OR with other terms.
    pub fn is_relevant(&self) -> bool {
        matches!(self, ProductTerm::And(_))
    }
}

impl std::fmt::Display for ProductTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductTerm::True => write!(f, "'b'1"),
            ProductTerm::False => write!(f, "'b'0"),
            ProductTerm::And(signals) => write!(f, "{}", signals.iter().join(" & ")),
        }
    }
}

/// The decoded logic of one macrocell entry.
///
/// Displays as
/// ```text
/// out = a & !b
///     # c;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Equation {
    pub output: String,
    /// The first OR term, kept even when constant.
    pub first: ProductTerm,
    /// Further OR terms.  Constant terms are never stored here.
    pub rest: Vec<ProductTerm>,
}

impl Equation {
    pub fn new(output: impl Into<String>, first: ProductTerm) -> Self {
        Equation {
            output: output.into(),
            first,
            rest: vec![],
        }
    }

    /// Adds an OR term, dropping it if it is constant.
    pub fn or(&mut self, term: ProductTerm) {
        if term.is_relevant() {
            self.rest.push(term);
        }
    }

    pub fn terms(&self) -> impl Iterator<Item = &ProductTerm> {
        std::iter::once(&self.first).chain(&self.rest)
    }
}

impl std::fmt::Display for Equation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.output, self.first)?;
        let width = self.output.chars().count();
        for term in &self.rest {
            write!(f, "\n{:width$} # {term}", "")?;
        }
        write!(f, ";")
    }
}
