use std::collections::BTreeSet;

/// The set of modifiers the user wants to track. Owned by the front end and
/// handed to the engine by reference on every query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    names: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().collect()
    }

    pub fn set(&mut self, name: &str, selected: bool) {
        if selected {
            self.names.insert(name.to_string());
        } else {
            self.names.remove(name);
        }
    }

    /// Flips the selection state of `name` and returns the new state.
    pub fn toggle(&mut self, name: &str) -> bool {
        let selected = !self.is_selected(name);
        self.set(name, selected);
        selected
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}
