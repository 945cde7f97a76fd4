/// One participant of a relationship line.
///
/// A `Person` is created from a single node expression such as `A[十一M-哈士奇]`
/// and is owned by the [`Edge`] that references it. If the same person appears
/// on several markup lines, each occurrence is re-parsed independently; ids
/// are unique per node in the source text but not globally enforced.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Person {
    /// Leading uppercase alphanumeric token of the node expression.
    pub id: String,
    /// Display name, everything before the gender marker.
    pub name: String,
    /// Descriptive text after the marker separator; empty when absent.
    pub title: String,
}

impl Person {
    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }
}

/// One parsed relationship line linking two persons with an optional label.
///
/// The ordered sequence of edges preserves source line order; that order
/// becomes frame order and is the only ordering guarantee in the system.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Edge {
    pub left: Person,
    pub right: Person,
    /// Arrow label, trimmed; empty when the arrow carries no text.
    pub relation: String,
}

impl Edge {
    /// Center-column display text, `"label ->"` or a bare arrow.
    pub fn relation_display(&self) -> String {
        if self.relation.is_empty() {
            "->".to_string()
        } else {
            format!("{} ->", self.relation)
        }
    }
}
